//! Active module composition
//!
//! Intersects the discovered modules with the licensed module ids, validates
//! and orders the result, and publishes it to the host together with the
//! assembly groupings used for service and schema bootstrap.

use std::path::Path;
use std::sync::{Arc, Mutex, OnceLock};
use tracing::{debug, error, info};

use crate::config::{HostConfig, ModuleConfig};
use crate::license::{LicenseInfo, LicenseService};
use crate::module::registry::{ActivationError, ModuleDependencies, ModuleRegistry};
use crate::module::traits::ModuleRef;
use crate::module::validation::check_minimum_versions;

/// Assembly naming convention for the host layers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerConvention {
    /// Suffix of application-layer assemblies
    pub application_suffix: String,
    /// Suffix of infrastructure-layer assemblies
    pub infrastructure_suffix: String,
}

impl Default for LayerConvention {
    fn default() -> Self {
        Self {
            application_suffix: ".Application".to_string(),
            infrastructure_suffix: ".Infrastructure".to_string(),
        }
    }
}

impl From<&ModuleConfig> for LayerConvention {
    fn from(config: &ModuleConfig) -> Self {
        Self {
            application_suffix: config.application_suffix.clone(),
            infrastructure_suffix: config.infrastructure_suffix.clone(),
        }
    }
}

/// Composes and caches the ordered, licensed module set
pub struct ActiveModuleComposer {
    registry: Arc<ModuleRegistry>,
    license: Arc<LicenseService>,
    layers: LayerConvention,
    active: OnceLock<Vec<ModuleRef>>,
    compose_lock: Mutex<()>,
}

impl ActiveModuleComposer {
    pub fn new(registry: Arc<ModuleRegistry>, license: Arc<LicenseService>) -> Self {
        Self {
            registry,
            license,
            layers: LayerConvention::default(),
            active: OnceLock::new(),
            compose_lock: Mutex::new(()),
        }
    }

    /// Override the layer naming convention
    pub fn with_layers(mut self, layers: LayerConvention) -> Self {
        self.layers = layers;
        self
    }

    /// Wire registry, license service and composer from host configuration
    ///
    /// The development license (when enabled) grants every discovered module.
    pub fn bootstrap(config: &HostConfig, app_root: &Path, registry: ModuleRegistry) -> Self {
        let known_modules = registry.module_ids();
        let license = LicenseService::from_config(config.license.clone(), app_root)
            .with_known_modules(known_modules);

        Self::new(Arc::new(registry), Arc::new(license))
            .with_layers(LayerConvention::from(&config.modules))
    }

    pub fn registry(&self) -> &Arc<ModuleRegistry> {
        &self.registry
    }

    pub fn license_service(&self) -> &Arc<LicenseService> {
        &self.license
    }

    /// Ordered active modules (memoized)
    ///
    /// A dependency or cycle error is returned to the caller and not cached;
    /// the host is expected to abort startup on it.
    pub fn get_active_modules(&self) -> Result<&[ModuleRef], ActivationError> {
        if let Some(active) = self.active.get() {
            return Ok(active.as_slice());
        }

        let _guard = self
            .compose_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(active) = self.active.get() {
            return Ok(active.as_slice());
        }

        let active = self.compose()?;
        Ok(self.active.get_or_init(|| active).as_slice())
    }

    fn compose(&self) -> Result<Vec<ModuleRef>, ActivationError> {
        let discovered = self.registry.discover_modules();

        let licensed: Vec<ModuleRef> = discovered
            .iter()
            .filter(|module| {
                let licensed = self.license.is_module_licensed(module.module_id());
                if !licensed {
                    debug!("Module {} is not licensed, excluding", module.module_id());
                }
                licensed
            })
            .cloned()
            .collect();

        if let Err(e) = ModuleDependencies::validate(&licensed) {
            error!("Module activation failed: {}", e);
            return Err(e);
        }

        let active = ModuleDependencies::sort(&licensed);
        check_minimum_versions(&active);

        info!(
            "Activated {} of {} discovered modules: {:?}",
            active.len(),
            discovered.len(),
            active.iter().map(|m| m.module_id()).collect::<Vec<_>>()
        );
        Ok(active)
    }

    /// Whether `module_id` is in the active set (false if activation fails)
    pub fn is_module_active(&self, module_id: &str) -> bool {
        self.get_active_modules().map_or(false, |active| {
            active
                .iter()
                .any(|m| m.module_id().eq_ignore_ascii_case(module_id))
        })
    }

    /// Whether the license grants `module_id`
    pub fn is_module_licensed(&self, module_id: &str) -> bool {
        self.license.is_module_licensed(module_id)
    }

    /// License summary
    pub fn license_info(&self) -> LicenseInfo {
        self.license.license_info()
    }

    /// Application-layer assemblies of the active modules
    pub fn application_assemblies(&self) -> Result<Vec<String>, ActivationError> {
        let suffix = self.layers.application_suffix.clone();
        self.assemblies_with_suffix(&suffix)
    }

    /// Infrastructure-layer assemblies of the active modules
    pub fn infrastructure_assemblies(&self) -> Result<Vec<String>, ActivationError> {
        let suffix = self.layers.infrastructure_suffix.clone();
        self.assemblies_with_suffix(&suffix)
    }

    /// UI assemblies declared by the active modules, de-duplicated
    pub fn ui_assemblies(&self) -> Result<Vec<String>, ActivationError> {
        let active = self.get_active_modules()?;
        Ok(dedup(active.iter().flat_map(|m| m.ui_assemblies())))
    }

    fn assemblies_with_suffix(&self, suffix: &str) -> Result<Vec<String>, ActivationError> {
        let active = self.get_active_modules()?;
        let all = active.iter().flat_map(|module| {
            std::iter::once(module.assembly().to_string()).chain(module.related_assemblies())
        });
        Ok(dedup(all.filter(|name| name.ends_with(suffix))))
    }

    /// Drop the cached active set; the next request recomposes it
    pub fn invalidate(&mut self) {
        self.active.take();
    }
}

/// Order-preserving de-duplication
fn dedup(names: impl Iterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for name in names {
        if !out.contains(&name) {
            out.push(name);
        }
    }
    out
}
