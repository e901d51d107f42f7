//! Module discovery
//!
//! Modules become known to the host in two ways: compiled-in modules register
//! themselves with the [`ModuleRegistry`], and manifest-only modules are found
//! by scanning the modules directory for entry-point directories carrying a
//! `module.toml`. Discovery runs once; later calls return the cached list.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};
use tracing::{debug, info, warn};

use crate::config::ModuleConfig;
use crate::module::registry::manifest::{ManifestModule, ModuleManifest};
use crate::module::traits::{ModuleDescriptor, ModuleError, ModuleRef};
use crate::module::validation::{ManifestValidator, ValidationResult};

/// Constructor for a compiled-in module
pub type ModuleFactory = Box<dyn Fn() -> Result<ModuleRef, ModuleError> + Send + Sync>;

/// Manifest file name inside a module entry-point directory
pub const MANIFEST_FILE: &str = "module.toml";

struct Registration {
    type_name: String,
    factory: ModuleFactory,
}

/// Naming convention for module entry-point directories
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryConvention {
    /// Required name prefix (e.g. `Hospital.`)
    pub prefix: String,
    /// Required name suffix (e.g. `.Infrastructure`)
    pub suffix: String,
}

impl DiscoveryConvention {
    /// Whether a directory name identifies a module entry point
    pub fn matches(&self, name: &str) -> bool {
        name.len() >= self.prefix.len() + self.suffix.len()
            && name.starts_with(&self.prefix)
            && name.ends_with(&self.suffix)
    }
}

impl Default for DiscoveryConvention {
    fn default() -> Self {
        Self {
            prefix: "Hospital.".to_string(),
            suffix: ".Infrastructure".to_string(),
        }
    }
}

/// Module registry: explicit registrations plus an optional manifest scan
pub struct ModuleRegistry {
    registrations: Vec<Registration>,
    modules_dir: Option<PathBuf>,
    convention: DiscoveryConvention,
    discovered: OnceLock<Vec<ModuleRef>>,
    discovery_lock: Mutex<()>,
}

impl ModuleRegistry {
    /// Create an empty registry without a manifest directory
    pub fn new() -> Self {
        Self {
            registrations: Vec::new(),
            modules_dir: None,
            convention: DiscoveryConvention::default(),
            discovered: OnceLock::new(),
            discovery_lock: Mutex::new(()),
        }
    }

    /// Create a registry scanning the directory named in the module config
    pub fn from_config(config: &ModuleConfig) -> Self {
        let mut registry = Self::new();
        registry.convention = DiscoveryConvention {
            prefix: config.module_prefix.clone(),
            suffix: config.entry_suffix.clone(),
        };
        registry.modules_dir = config.modules_dir.as_ref().map(PathBuf::from);
        registry
    }

    /// Scan `dir` for manifest modules using the given convention
    pub fn with_modules_dir<P: AsRef<Path>>(
        mut self,
        dir: P,
        convention: DiscoveryConvention,
    ) -> Self {
        self.modules_dir = Some(dir.as_ref().to_path_buf());
        self.convention = convention;
        self
    }

    /// Register a compiled-in module constructed through `Default`
    pub fn register<T>(&mut self) -> &mut Self
    where
        T: ModuleDescriptor + Default + 'static,
    {
        let type_name = std::any::type_name::<T>().to_string();
        self.registrations.push(Registration {
            type_name,
            factory: Box::new(|| Ok(Arc::new(T::default()) as ModuleRef)),
        });
        self
    }

    /// Register a fallible module constructor
    pub fn register_factory<F>(&mut self, type_name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> Result<ModuleRef, ModuleError> + Send + Sync + 'static,
    {
        self.registrations.push(Registration {
            type_name: type_name.into(),
            factory: Box::new(factory),
        });
        self
    }

    /// Register an already constructed module
    pub fn register_module(&mut self, module: ModuleRef) -> &mut Self {
        let type_name = module.module_id().to_string();
        self.register_factory(type_name, move || Ok(Arc::clone(&module)))
    }

    /// Discover all modules (memoized)
    ///
    /// The first caller constructs every registered module and scans the
    /// modules directory; concurrent callers wait on the same lock, later
    /// callers read the cached list without locking.
    pub fn discover_modules(&self) -> &[ModuleRef] {
        if let Some(modules) = self.discovered.get() {
            return modules;
        }

        let _guard = self
            .discovery_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        self.discovered.get_or_init(|| self.run_discovery())
    }

    /// Ids of every discovered module
    pub fn module_ids(&self) -> Vec<String> {
        self.discover_modules()
            .iter()
            .map(|m| m.module_id().to_string())
            .collect()
    }

    /// Drop the cached discovery result
    pub fn invalidate(&mut self) {
        self.discovered.take();
    }

    fn run_discovery(&self) -> Vec<ModuleRef> {
        info!(
            "Discovering modules ({} registered, manifest dir: {:?})",
            self.registrations.len(),
            self.modules_dir
        );

        let mut candidates = Vec::new();

        for registration in &self.registrations {
            match (registration.factory)() {
                Ok(module) => {
                    debug!(
                        "Constructed module {} from {}",
                        module.module_id(),
                        registration.type_name
                    );
                    candidates.push(module);
                }
                Err(e) => {
                    warn!("Skipping module type {}: {}", registration.type_name, e);
                }
            }
        }

        if let Some(dir) = &self.modules_dir {
            candidates.extend(self.scan_modules_dir(dir));
        }

        let validator = ManifestValidator::new();
        let mut seen = HashSet::new();
        let mut modules = Vec::with_capacity(candidates.len());

        for module in candidates {
            if !seen.insert(module.module_id().to_string()) {
                warn!(
                    "Duplicate module id {} ignored (first registration wins)",
                    module.module_id()
                );
                continue;
            }
            if let ValidationResult::Invalid(errors) = validator.validate(module.as_ref()) {
                // Informational only
                debug!("Module {} has descriptor issues: {:?}", module.module_id(), errors);
            }
            modules.push(module);
        }

        info!("Discovered {} modules", modules.len());
        modules
    }

    /// Load every manifest module below `dir` that matches the convention
    fn scan_modules_dir(&self, dir: &Path) -> Vec<ModuleRef> {
        if !dir.exists() {
            debug!("Modules directory {:?} does not exist, nothing to scan", dir);
            return Vec::new();
        }

        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Failed to read modules directory {:?}: {}", dir, e);
                return Vec::new();
            }
        };

        let mut module_dirs: Vec<PathBuf> = entries
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry.path()),
                Err(e) => {
                    warn!("Failed to read directory entry in {:?}: {}", dir, e);
                    None
                }
            })
            .filter(|path| path.is_dir())
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .map_or(false, |name| self.convention.matches(name))
            })
            .collect();

        // read_dir order is platform dependent
        module_dirs.sort();

        let mut modules = Vec::new();
        for path in module_dirs {
            match Self::load_manifest_module(&path) {
                Ok(module) => {
                    debug!("Loaded manifest module {} from {:?}", module.module_id(), path);
                    modules.push(module);
                }
                Err(e) => {
                    warn!("Skipping module directory {:?}: {}", path, e);
                }
            }
        }

        modules
    }

    fn load_manifest_module(dir: &Path) -> Result<ModuleRef, ModuleError> {
        let manifest_path = dir.join(MANIFEST_FILE);
        if !manifest_path.exists() {
            return Err(ModuleError::ModuleNotFound(format!(
                "no {} in {:?}",
                MANIFEST_FILE, dir
            )));
        }

        let mut manifest = ModuleManifest::from_file(&manifest_path)?;
        if manifest.assembly.is_empty() {
            if let Some(name) = dir.file_name().and_then(|n| n.to_str()) {
                manifest.assembly = name.to_string();
            }
        }

        Ok(Arc::new(ManifestModule::new(manifest)))
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}
