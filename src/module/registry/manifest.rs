//! Module manifest parsing
//!
//! Handles parsing `module.toml` manifests and turning them into data-only
//! module descriptors.

use crate::module::traits::{
    MenuItem, ModuleDescriptor, ModuleError, SchemaBuilder, ServiceRegistrar,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Module manifest (module.toml structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleManifest {
    /// Module id (dotted namespace, unique)
    pub id: String,
    /// Module version (semantic versioning)
    pub version: String,
    /// Human-readable description
    #[serde(default)]
    pub description: Option<String>,
    /// Required modules, in declaration order
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Minimum versions for dependencies
    #[serde(default)]
    pub minimum_versions: BTreeMap<String, String>,
    /// Binary owning the module; defaults to the manifest directory name
    #[serde(default)]
    pub assembly: String,
    /// Further binaries shipped by the module
    #[serde(default)]
    pub related_assemblies: Vec<String>,
    /// UI binaries
    #[serde(default)]
    pub ui_assemblies: Vec<String>,
    /// Entities the module contributes to the database model
    #[serde(default)]
    pub entities: Vec<String>,
    /// Service -> implementation registrations
    #[serde(default)]
    pub services: BTreeMap<String, String>,
    /// Menu contributions
    #[serde(default)]
    pub menu: Vec<MenuItem>,
}

impl ModuleManifest {
    /// Minimal manifest with an id and a version
    pub fn new(id: impl Into<String>, version: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            assembly: format!("{}.Infrastructure", id),
            id,
            version: version.into(),
            ..Default::default()
        }
    }

    /// Add a dependency (builder style)
    pub fn with_dependency(mut self, dependency: impl Into<String>) -> Self {
        let dependency = dependency.into();
        if !self.dependencies.contains(&dependency) {
            self.dependencies.push(dependency);
        }
        self
    }

    /// Declare a minimum version for a dependency (builder style)
    pub fn with_minimum_version(
        mut self,
        dependency: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        self.minimum_versions.insert(dependency.into(), version.into());
        self
    }

    /// Parse a manifest from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, ModuleError> {
        let mut manifest: ModuleManifest = toml::from_str(contents).map_err(|e| {
            ModuleError::InvalidManifest(format!("Failed to parse manifest TOML: {}", e))
        })?;

        if manifest.id.trim().is_empty() {
            return Err(ModuleError::InvalidManifest(
                "Module id cannot be empty".to_string(),
            ));
        }

        // Dependencies form an ordered set
        let mut seen = Vec::with_capacity(manifest.dependencies.len());
        manifest.dependencies.retain(|dep| {
            if seen.contains(dep) {
                false
            } else {
                seen.push(dep.clone());
                true
            }
        });

        Ok(manifest)
    }

    /// Load manifest from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ModuleError> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ModuleError::LoadError(format!(
                "Failed to read manifest file {:?}: {}",
                path.as_ref(),
                e
            ))
        })?;
        Self::from_toml_str(&contents)
    }
}

/// Descriptor backed entirely by a manifest
#[derive(Debug, Clone)]
pub struct ManifestModule {
    manifest: ModuleManifest,
}

impl ManifestModule {
    pub fn new(mut manifest: ModuleManifest) -> Self {
        if manifest.assembly.is_empty() {
            manifest.assembly = manifest.id.clone();
        }
        Self { manifest }
    }

    pub fn manifest(&self) -> &ModuleManifest {
        &self.manifest
    }
}

impl From<ModuleManifest> for ManifestModule {
    fn from(manifest: ModuleManifest) -> Self {
        Self::new(manifest)
    }
}

impl ModuleDescriptor for ManifestModule {
    fn module_id(&self) -> &str {
        &self.manifest.id
    }

    fn version(&self) -> &str {
        &self.manifest.version
    }

    fn dependencies(&self) -> &[String] {
        &self.manifest.dependencies
    }

    fn minimum_dependency_versions(&self) -> HashMap<String, String> {
        self.manifest
            .minimum_versions
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    fn assembly(&self) -> &str {
        &self.manifest.assembly
    }

    fn related_assemblies(&self) -> Vec<String> {
        self.manifest.related_assemblies.clone()
    }

    fn ui_assemblies(&self) -> Vec<String> {
        self.manifest.ui_assemblies.clone()
    }

    fn register_services(&self, services: &mut dyn ServiceRegistrar) {
        for (service, implementation) in &self.manifest.services {
            services.register_service(service, implementation);
        }
    }

    fn configure_schema(&self, schema: &mut dyn SchemaBuilder) {
        for entity in &self.manifest.entities {
            schema.add_entity(&self.manifest.id, entity);
        }
    }

    fn menu_items(&self) -> Vec<MenuItem> {
        self.manifest.menu.clone()
    }
}
