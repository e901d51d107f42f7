//! Module registry and discovery
//!
//! Handles module registration, manifest discovery, and dependency resolution.

pub mod dependencies;
pub mod discovery;
pub mod manifest;

pub use dependencies::{ActivationError, MissingDependency, ModuleDependencies};
pub use discovery::{DiscoveryConvention, ModuleFactory, ModuleRegistry, MANIFEST_FILE};
pub use manifest::{ManifestModule, ModuleManifest};
