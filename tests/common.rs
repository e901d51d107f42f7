//! Shared fixtures for the module host integration tests
//!
//! Builds an isolated application root with a modules directory, a license
//! signing key pair and helpers for writing manifests and license files.

#![allow(dead_code)]

use chrono::Duration;
use secp256k1::{PublicKey, SecretKey};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use hms_modules::config::{HostConfig, LicenseConfig, ModuleConfig};
use hms_modules::license::signing::public_key_hex;
use hms_modules::license::{generate_keypair, sign_license_in_place, LicensePayload};
use hms_modules::module::{ActiveModuleComposer, ModuleDescriptor, ModuleRegistry};
use hms_modules::utils::utc_now;

/// Isolated application root
pub struct HostFixture {
    /// Temporary directory holding everything below
    pub temp_dir: TempDir,
    /// Modules directory scanned for manifests
    pub modules_dir: PathBuf,
    /// License signing key
    pub secret_key: SecretKey,
    /// Key the host trusts
    pub public_key: PublicKey,
}

impl HostFixture {
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let temp_dir = TempDir::new()?;
        let modules_dir = temp_dir.path().join("modules");
        std::fs::create_dir_all(&modules_dir)?;
        let (secret_key, public_key) = generate_keypair();

        Ok(Self {
            temp_dir,
            modules_dir,
            secret_key,
            public_key,
        })
    }

    pub fn app_root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn license_path(&self) -> PathBuf {
        self.app_root().join("license.json")
    }

    /// Write `<modules>/<id>.Infrastructure/module.toml`
    pub fn write_manifest(
        &self,
        id: &str,
        version: &str,
        dependencies: &[&str],
    ) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let deps = dependencies
            .iter()
            .map(|d| format!("\"{}\"", d))
            .collect::<Vec<_>>()
            .join(", ");
        let contents = format!(
            "id = \"{id}\"\nversion = \"{version}\"\ndependencies = [{deps}]\n\
             related_assemblies = [\"{id}.Application\"]\n"
        );
        self.write_raw_manifest(&format!("{}.Infrastructure", id), &contents)
    }

    /// Write arbitrary manifest text into `<modules>/<dir_name>/module.toml`
    pub fn write_raw_manifest(
        &self,
        dir_name: &str,
        contents: &str,
    ) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let dir = self.modules_dir.join(dir_name);
        std::fs::create_dir_all(&dir)?;
        let path = dir.join("module.toml");
        std::fs::write(&path, contents)?;
        Ok(path)
    }

    /// Unsigned payload issued yesterday
    pub fn payload(&self, modules: &[&str], expires_in_days: Option<i64>) -> LicensePayload {
        let now = utc_now();
        LicensePayload::new(
            "General Hospital",
            now - Duration::days(1),
            expires_in_days.map(|days| now + Duration::days(days)),
            100,
            modules.iter().map(|m| m.to_string()).collect(),
        )
    }

    /// Sign and write a license granting `modules`
    pub fn write_license(
        &self,
        modules: &[&str],
        expires_in_days: Option<i64>,
    ) -> Result<LicensePayload, Box<dyn std::error::Error>> {
        let mut payload = self.payload(modules, expires_in_days);
        sign_license_in_place(&mut payload, &self.secret_key)?;
        self.write_payload(&payload)?;
        Ok(payload)
    }

    pub fn write_payload(
        &self,
        payload: &LicensePayload,
    ) -> Result<(), Box<dyn std::error::Error>> {
        std::fs::write(self.license_path(), payload.to_json_pretty()?)?;
        Ok(())
    }

    /// Host configuration trusting the fixture key and scanning the fixture modules
    pub fn config(&self, allow_unlicensed: bool) -> HostConfig {
        HostConfig {
            modules: ModuleConfig {
                modules_dir: Some(self.modules_dir.to_string_lossy().into_owned()),
                ..Default::default()
            },
            license: LicenseConfig {
                public_key: Some(public_key_hex(&self.public_key)),
                allow_unlicensed,
                ..Default::default()
            },
            logging: None,
        }
    }

    pub fn composer(&self, config: &HostConfig) -> ActiveModuleComposer {
        let registry = ModuleRegistry::from_config(&config.modules);
        ActiveModuleComposer::bootstrap(config, self.app_root(), registry)
    }
}

/// Compiled-in module used for explicit registrations
#[derive(Debug, Clone)]
pub struct TestModule {
    pub id: String,
    pub version: String,
    pub dependencies: Vec<String>,
    pub assembly: String,
}

impl TestModule {
    pub fn new(id: &str, dependencies: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            version: "1.0.0".to_string(),
            dependencies: dependencies.iter().map(|d| d.to_string()).collect(),
            assembly: format!("{}.Infrastructure", id),
        }
    }
}

impl ModuleDescriptor for TestModule {
    fn module_id(&self) -> &str {
        &self.id
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    fn assembly(&self) -> &str {
        &self.assembly
    }
}

pub fn active_ids(composer: &ActiveModuleComposer) -> Vec<String> {
    composer
        .get_active_modules()
        .map(|modules| modules.iter().map(|m| m.module_id().to_string()).collect())
        .unwrap_or_default()
}
