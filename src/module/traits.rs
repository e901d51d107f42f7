//! Module system traits and interfaces
//!
//! Defines the descriptor contract every feature module implements and the
//! host-side hooks a module may contribute to.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Shared handle to a module descriptor.
///
/// Descriptors are created once at startup and never mutated, so the whole
/// pipeline (registry, resolver, composer, host) passes them around by `Arc`.
pub type ModuleRef = Arc<dyn ModuleDescriptor>;

/// Menu entry a module contributes to the host navigation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    /// Display title
    pub title: String,
    /// Route the entry navigates to
    pub route: String,
    /// Optional icon name
    #[serde(default)]
    pub icon: Option<String>,
    /// Sort order inside the module's section
    #[serde(default)]
    pub order: i32,
    /// Permission required to see the entry
    #[serde(default)]
    pub required_permission: Option<String>,
}

/// Host-side service container a module registers into
pub trait ServiceRegistrar {
    /// Register `implementation` as the provider for `service`
    fn register_service(&mut self, service: &str, implementation: &str);
}

/// Host-side database model builder a module contributes entities to
pub trait SchemaBuilder {
    /// Add an entity (table) owned by `module_id`
    fn add_entity(&mut self, module_id: &str, entity: &str);
}

/// Contract every feature module implements
///
/// The core only reads identity, version, dependencies and assembly names.
/// The capability hooks exist for the host, which invokes them on the
/// ordered active module list; this crate never calls them itself.
pub trait ModuleDescriptor: Send + Sync {
    /// Globally unique, dotted module id (e.g. `Hospital.MasterData`)
    fn module_id(&self) -> &str;

    /// Semantic version of the module
    fn version(&self) -> &str;

    /// Ids of modules that must be active for this one to activate
    fn dependencies(&self) -> &[String];

    /// Minimum versions for dependencies (informational, not enforced)
    fn minimum_dependency_versions(&self) -> HashMap<String, String> {
        HashMap::new()
    }

    /// Name of the binary that owns this module
    fn assembly(&self) -> &str;

    /// Further binaries shipped by the module (application layer, contracts, ...)
    fn related_assemblies(&self) -> Vec<String> {
        Vec::new()
    }

    /// UI binaries the host should load for this module
    fn ui_assemblies(&self) -> Vec<String> {
        Vec::new()
    }

    /// Register the module's services with the host container
    fn register_services(&self, _services: &mut dyn ServiceRegistrar) {}

    /// Contribute the module's entities to the host database model
    fn configure_schema(&self, _schema: &mut dyn SchemaBuilder) {}

    /// Menu entries the module contributes
    fn menu_items(&self) -> Vec<MenuItem> {
        Vec::new()
    }
}

impl std::fmt::Debug for dyn ModuleDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleDescriptor")
            .field("module_id", &self.module_id())
            .field("version", &self.version())
            .field("dependencies", &self.dependencies())
            .finish()
    }
}

/// Module system errors
#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("Module construction failed: {0}")]
    ConstructionError(String),

    #[error("Module load failed: {0}")]
    LoadError(String),

    #[error("Module not found: {0}")]
    ModuleNotFound(String),

    #[error("Invalid module manifest: {0}")]
    InvalidManifest(String),
}

impl From<toml::de::Error> for ModuleError {
    fn from(e: toml::de::Error) -> Self {
        ModuleError::InvalidManifest(e.to_string())
    }
}

impl From<std::io::Error> for ModuleError {
    fn from(e: std::io::Error) -> Self {
        ModuleError::LoadError(e.to_string())
    }
}
