//! License service
//!
//! Loads the license file once, validates it and answers license queries
//! from the cached result. A malformed, unreadable or rejected license is
//! treated exactly like a missing one: nothing is licensed.

use chrono::Duration;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use tracing::{info, warn};

use crate::config::LicenseConfig;
use crate::license::payload::{LicenseInfo, LicensePayload};
use crate::license::validator::{LicenseValidation, LicenseValidator};
use crate::utils::time::utc_now;

/// Signature marker of the synthesized development license
///
/// Never a valid base64 ECDSA signature, so such a license can not pass the
/// validator if it is ever written to disk.
pub const DEVELOPMENT_SIGNATURE: &str = "UNSIGNED-DEVELOPMENT-LICENSE";

/// Fallback validity window when the configured one does not fit a date
const DEFAULT_DEVELOPMENT_VALIDITY_DAYS: i64 = 365;

/// Result of the one-time license load
#[derive(Debug, Clone)]
struct LoadedLicense {
    payload: Option<LicensePayload>,
    development: bool,
    error: Option<String>,
}

impl LoadedLicense {
    fn none(error: impl Into<String>) -> Self {
        Self {
            payload: None,
            development: false,
            error: Some(error.into()),
        }
    }
}

/// License service
pub struct LicenseService {
    config: LicenseConfig,
    license_path: PathBuf,
    validator: LicenseValidator,
    known_modules: Vec<String>,
    loaded: OnceLock<LoadedLicense>,
    load_lock: Mutex<()>,
}

impl LicenseService {
    /// Create a service reading `config.path` relative to `app_root`
    pub fn new(config: LicenseConfig, app_root: &Path, validator: LicenseValidator) -> Self {
        let license_path = config.resolve_path(app_root);
        Self {
            config,
            license_path,
            validator,
            known_modules: Vec::new(),
            loaded: OnceLock::new(),
            load_lock: Mutex::new(()),
        }
    }

    /// Create a service whose validator trusts `config.public_key`
    ///
    /// A missing or unparseable key leaves the validator without a key, so
    /// every license file is rejected.
    pub fn from_config(config: LicenseConfig, app_root: &Path) -> Self {
        let validator = match config.public_key.as_deref() {
            Some(hex_key) => LicenseValidator::from_hex(hex_key).unwrap_or_else(|e| {
                warn!("License public key is invalid, all licenses will be rejected: {}", e);
                LicenseValidator::without_key()
            }),
            None => {
                warn!("No license public key configured, all licenses will be rejected");
                LicenseValidator::without_key()
            }
        };
        Self::new(config, app_root, validator)
    }

    /// Module ids granted by the development license
    pub fn with_known_modules(mut self, module_ids: Vec<String>) -> Self {
        self.known_modules = module_ids;
        self
    }

    /// Path of the license file
    pub fn license_path(&self) -> &Path {
        &self.license_path
    }

    fn loaded(&self) -> &LoadedLicense {
        if let Some(loaded) = self.loaded.get() {
            return loaded;
        }

        let _guard = self
            .load_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        self.loaded.get_or_init(|| self.load())
    }

    fn load(&self) -> LoadedLicense {
        let contents = match std::fs::read_to_string(&self.license_path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                if self.config.allow_unlicensed {
                    return self.development_license();
                }
                warn!("No license file at {:?}; no modules are licensed", self.license_path);
                return LoadedLicense::none(format!(
                    "License file not found: {}",
                    self.license_path.display()
                ));
            }
            Err(e) => {
                warn!("Failed to read license file {:?}: {}", self.license_path, e);
                return LoadedLicense::none(format!("Failed to read license file: {}", e));
            }
        };

        let payload = match LicensePayload::from_json(&contents) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("License file {:?} is malformed: {}", self.license_path, e);
                return LoadedLicense::none(format!("License file is malformed: {}", e));
            }
        };

        match self.validator.validate(&payload) {
            LicenseValidation::Valid => {
                info!(
                    "License loaded for {} ({} modules, expires: {:?})",
                    payload.customer,
                    payload.modules.len(),
                    payload.expires
                );
                LoadedLicense {
                    payload: Some(payload),
                    development: false,
                    error: None,
                }
            }
            LicenseValidation::Invalid(reason) => {
                warn!("License file {:?} rejected: {}", self.license_path, reason);
                LoadedLicense::none(reason.to_string())
            }
        }
    }

    fn development_license(&self) -> LoadedLicense {
        if self.known_modules.is_empty() {
            warn!(
                "allow_unlicensed is enabled but no modules are known; \
                 no development license is granted"
            );
            return LoadedLicense::none("No known modules to grant in development mode");
        }

        let now = utc_now();
        let validity_days = self.config.development_validity_days;
        let expires = Duration::try_days(validity_days)
            .and_then(|validity| now.checked_add_signed(validity))
            .or_else(|| {
                warn!(
                    "development_validity_days = {} is out of range, using {} days",
                    validity_days, DEFAULT_DEVELOPMENT_VALIDITY_DAYS
                );
                Duration::try_days(DEFAULT_DEVELOPMENT_VALIDITY_DAYS)
                    .and_then(|validity| now.checked_add_signed(validity))
            });

        warn!(
            "UNLICENSED DEVELOPMENT MODE: no license file at {:?} and allow_unlicensed is enabled; \
             granting all {} known modules until {:?}. Never enable this in production.",
            self.license_path,
            self.known_modules.len(),
            expires
        );

        let mut payload = LicensePayload::new(
            "Development",
            now,
            expires,
            u32::MAX,
            self.known_modules.clone(),
        );
        payload.license_type = Some("Development".to_string());
        payload.signature = DEVELOPMENT_SIGNATURE.to_string();

        LoadedLicense {
            payload: Some(payload),
            development: true,
            error: None,
        }
    }

    /// The loaded license, if any
    pub fn license(&self) -> Option<&LicensePayload> {
        self.loaded().payload.as_ref()
    }

    /// Whether a license (validated or development) is loaded
    pub fn is_license_valid(&self) -> bool {
        self.license().is_some()
    }

    /// Whether the loaded license is the synthesized development license
    pub fn is_development_license(&self) -> bool {
        self.loaded().development
    }

    /// Whether the loaded license grants `module_id` (case-insensitive)
    pub fn is_module_licensed(&self, module_id: &str) -> bool {
        self.license()
            .map_or(false, |license| license.covers_module(module_id))
    }

    /// Licensed module ids (empty without a license)
    pub fn licensed_modules(&self) -> Vec<String> {
        self.license()
            .map(|license| license.modules.clone())
            .unwrap_or_default()
    }

    /// Days until expiry; None for perpetual licenses or without a license
    pub fn days_until_expiration(&self) -> Option<i64> {
        self.license()
            .and_then(LicenseValidator::days_until_expiration)
    }

    /// True iff 0 <= days until expiry <= `warning_days`
    pub fn is_approaching_expiration(&self, warning_days: i64) -> bool {
        matches!(self.days_until_expiration(), Some(days) if days >= 0 && days <= warning_days)
    }

    /// [`Self::is_approaching_expiration`] with the configured warning window
    pub fn is_approaching_expiration_default(&self) -> bool {
        self.is_approaching_expiration(self.config.warning_days)
    }

    /// License summary for the host
    pub fn license_info(&self) -> LicenseInfo {
        let loaded = self.loaded();
        match &loaded.payload {
            Some(license) => LicenseInfo {
                is_valid: true,
                is_development: loaded.development,
                customer: Some(license.customer.clone()),
                organization_id: license.organization_id.clone(),
                license_type: license.license_type.clone(),
                issued: Some(license.issued),
                expires: license.expires,
                max_users: license.max_users,
                licensed_modules: license.modules.clone(),
                days_until_expiration: LicenseValidator::days_until_expiration(license),
                error_message: None,
            },
            None => LicenseInfo::unlicensed(
                loaded
                    .error
                    .clone()
                    .unwrap_or_else(|| "No license loaded".to_string()),
            ),
        }
    }

    /// Forget the cached license; the next query reloads the file
    pub fn invalidate(&mut self) {
        self.loaded.take();
    }
}
