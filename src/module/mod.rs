//! Module system for the hospital host
//!
//! Discovers feature modules, keeps only the licensed ones, checks their
//! dependency graph and hands the host a dependency-first activation order.
//!
//! ## Architecture
//!
//! - **Registry**: explicit registrations plus a `module.toml` manifest scan
//! - **Dependencies**: missing-dependency and cycle detection, stable topological order
//! - **Composer**: license filter, validation, ordering and assembly groupings
//! - **Validation**: informational descriptor checks (id format, versions)

pub mod composer;
pub mod registry;
pub mod traits;
pub mod validation;

pub use composer::{ActiveModuleComposer, LayerConvention};
pub use registry::{
    ActivationError, DiscoveryConvention, ManifestModule, MissingDependency, ModuleDependencies,
    ModuleManifest, ModuleRegistry,
};
pub use traits::{
    MenuItem, ModuleDescriptor, ModuleError, ModuleRef, SchemaBuilder, ServiceRegistrar,
};
