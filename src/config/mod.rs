//! Configuration management for the module host
//!
//! Handles configuration loading (JSON or TOML), environment overrides and
//! validation for module discovery, licensing and logging.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::utils::env::{env_bool, env_opt};

/// Environment variable overriding the license file path
pub const ENV_LICENSE_PATH: &str = "HMS_LICENSE_PATH";
/// Environment variable enabling the development license fallback
pub const ENV_ALLOW_UNLICENSED: &str = "HMS_ALLOW_UNLICENSED";
/// Environment variable carrying the hex-encoded license public key
pub const ENV_LICENSE_PUBLIC_KEY: &str = "HMS_LICENSE_PUBLIC_KEY";

/// Upper bound for the development license validity window (ten years)
pub const MAX_DEVELOPMENT_VALIDITY_DAYS: i64 = 3650;

/// Module discovery configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleConfig {
    /// Directory scanned for manifest modules (None = registrations only)
    #[serde(default)]
    pub modules_dir: Option<String>,

    /// Name prefix of module entry-point directories
    #[serde(default = "default_module_prefix")]
    pub module_prefix: String,

    /// Name suffix of module entry-point directories
    #[serde(default = "default_infrastructure_suffix")]
    pub entry_suffix: String,

    /// Assembly suffix marking the application layer
    #[serde(default = "default_application_suffix")]
    pub application_suffix: String,

    /// Assembly suffix marking the infrastructure layer
    #[serde(default = "default_infrastructure_suffix")]
    pub infrastructure_suffix: String,
}

fn default_module_prefix() -> String {
    "Hospital.".to_string()
}

fn default_application_suffix() -> String {
    ".Application".to_string()
}

fn default_infrastructure_suffix() -> String {
    ".Infrastructure".to_string()
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            modules_dir: None,
            module_prefix: default_module_prefix(),
            entry_suffix: default_infrastructure_suffix(),
            application_suffix: default_application_suffix(),
            infrastructure_suffix: default_infrastructure_suffix(),
        }
    }
}

/// License configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseConfig {
    /// License file path, relative paths resolve against the application root
    #[serde(default = "default_license_path")]
    pub path: String,

    /// Allow running without a license file (development only)
    #[serde(default)]
    pub allow_unlicensed: bool,

    /// Hex-encoded compressed secp256k1 public key used to verify licenses
    #[serde(default)]
    pub public_key: Option<String>,

    /// Days before expiry at which the license counts as expiring
    #[serde(default = "default_warning_days")]
    pub warning_days: i64,

    /// Validity window of the synthesized development license
    #[serde(default = "default_development_validity_days")]
    pub development_validity_days: i64,
}

fn default_license_path() -> String {
    "license.json".to_string()
}

fn default_warning_days() -> i64 {
    30
}

fn default_development_validity_days() -> i64 {
    365
}

impl Default for LicenseConfig {
    fn default() -> Self {
        Self {
            path: default_license_path(),
            allow_unlicensed: false,
            public_key: None,
            warning_days: default_warning_days(),
            development_validity_days: default_development_validity_days(),
        }
    }
}

impl LicenseConfig {
    /// License file location for a given application root
    pub fn resolve_path(&self, app_root: &Path) -> PathBuf {
        let path = Path::new(&self.path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            app_root.join(path)
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log filter (e.g. "info", "hms_modules=debug"); RUST_LOG wins when set
    #[serde(default)]
    pub filter: Option<String>,

    /// Emit JSON lines (requires the `json-logging` feature)
    #[serde(default)]
    pub json_format: bool,
}

/// Host configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostConfig {
    /// Module discovery configuration
    #[serde(default)]
    pub modules: ModuleConfig,

    /// License configuration
    #[serde(default)]
    pub license: LicenseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: Option<LoggingConfig>,
}

impl HostConfig {
    /// Load configuration from JSON file
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let config: HostConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse JSON config {:?}", path))?;
        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_toml_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let config: HostConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config {:?}", path))?;
        Ok(config)
    }

    /// Load configuration, picking the format from the file extension
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_file(path),
            _ => Self::from_json_file(path),
        }
    }

    /// Save configuration to JSON file
    pub fn to_json_file(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file {:?}", path))?;
        Ok(())
    }

    /// Apply `HMS_*` environment overrides
    pub fn apply_env_overrides(&mut self) {
        if let Some(path) = env_opt(ENV_LICENSE_PATH) {
            self.license.path = path;
        }
        if let Some(key) = env_opt(ENV_LICENSE_PUBLIC_KEY) {
            self.license.public_key = Some(key);
        }
        if env_bool(ENV_ALLOW_UNLICENSED) {
            warn!(
                "{} is set: unlicensed development mode enabled from the environment",
                ENV_ALLOW_UNLICENSED
            );
            self.license.allow_unlicensed = true;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.license.path.trim().is_empty() {
            anyhow::bail!("license.path must not be empty");
        }
        if self.license.warning_days < 0 {
            anyhow::bail!(
                "license.warning_days must not be negative, got {}",
                self.license.warning_days
            );
        }
        if !(1..=MAX_DEVELOPMENT_VALIDITY_DAYS).contains(&self.license.development_validity_days) {
            anyhow::bail!(
                "license.development_validity_days must be between 1 and {}, got {}",
                MAX_DEVELOPMENT_VALIDITY_DAYS,
                self.license.development_validity_days
            );
        }
        if let Some(key) = &self.license.public_key {
            crate::license::signing::parse_public_key(key)
                .map_err(|e| anyhow::anyhow!("license.public_key is invalid: {}", e))?;
        }
        if self.modules.application_suffix.is_empty()
            || self.modules.infrastructure_suffix.is_empty()
        {
            anyhow::bail!("module layer suffixes must not be empty");
        }
        Ok(())
    }
}
