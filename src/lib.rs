//! Hospital module host: module loader and licensing gate
//!
//! This crate decides which feature modules of the hospital application run.
//! It discovers module descriptors, intersects them with the modules granted
//! by a signed license file, rejects missing dependencies and cycles, and
//! returns the active modules in dependency-first order.
//!
//! ## Layout
//!
//! 1. [`module`]: descriptors, registry, dependency resolution, composer
//! 2. [`license`]: license document, signatures, validation, license service
//! 3. [`config`]: host configuration with `HMS_*` environment overrides
//! 4. [`utils`]: logging setup, environment and time helpers
//!
//! ## Startup
//!
//! ```no_run
//! use std::path::Path;
//! use hms_modules::{ActiveModuleComposer, HostConfig, ModuleRegistry};
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut config = HostConfig::from_file(Path::new("host.toml"))?;
//! config.apply_env_overrides();
//! config.validate()?;
//!
//! let registry = ModuleRegistry::from_config(&config.modules);
//! let composer = ActiveModuleComposer::bootstrap(&config, Path::new("."), registry);
//! for module in composer.get_active_modules()? {
//!     println!("{} {}", module.module_id(), module.version());
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod license;
pub mod module;
pub mod utils;

pub use config::{HostConfig, LicenseConfig, LoggingConfig, ModuleConfig};
pub use license::{LicenseInfo, LicensePayload, LicenseService, LicenseValidator};
pub use module::{
    ActivationError, ActiveModuleComposer, ModuleDependencies, ModuleDescriptor, ModuleError,
    ModuleRef, ModuleRegistry,
};
