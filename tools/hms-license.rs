//! License tooling for the hospital module host
//!
//! Generates signing keys, issues and verifies license files and prints the
//! module activation order a host would compute for a given configuration.
//!
//! Usage:
//!   hms-license keygen --out-dir keys/
//!   hms-license sign --secret-key-file keys/license.key --customer "General Hospital" \
//!       --modules Hospital.Core,Hospital.Patients --max-users 50 --expires 2027-12-31
//!   hms-license verify license.json --public-key <hex>
//!   hms-license inspect license.json
//!   hms-license modules --config host.toml --app-root .

use anyhow::{bail, Context};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use hms_modules::config::HostConfig;
use hms_modules::license::{
    generate_keypair, parse_secret_key, sign_license_in_place, LicensePayload, LicenseValidator,
};
use hms_modules::license::signing::{public_key_hex, secret_key_hex};
use hms_modules::module::{ActiveModuleComposer, ModuleRegistry};
use hms_modules::utils::{init_logging, utc_now};

#[derive(Parser, Debug)]
#[command(name = "hms-license", version, about = "License tooling for the hospital module host")]
struct Cli {
    /// Log filter (RUST_LOG takes precedence)
    #[arg(long, global = true, default_value = "warn")]
    log: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a signing key pair
    Keygen {
        /// Directory receiving license.key and license.pub
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },

    /// Issue a signed license file
    Sign {
        /// File holding the hex-encoded secret key
        #[arg(long)]
        secret_key_file: PathBuf,

        #[arg(long)]
        customer: String,

        /// Comma-separated module ids
        #[arg(long, value_delimiter = ',', required = true)]
        modules: Vec<String>,

        #[arg(long, default_value_t = 10)]
        max_users: u32,

        /// Expiry as YYYY-MM-DD or RFC 3339 (omit for a perpetual license)
        #[arg(long)]
        expires: Option<String>,

        #[arg(long)]
        organization_id: Option<String>,

        #[arg(long)]
        license_type: Option<String>,

        /// Output file
        #[arg(long, short, default_value = "license.json")]
        output: PathBuf,
    },

    /// Validate a license file against a public key
    Verify {
        license: PathBuf,

        /// Hex-encoded public key
        #[arg(long, env = "HMS_LICENSE_PUBLIC_KEY")]
        public_key: String,
    },

    /// Print the contents of a license file without validating it
    Inspect { license: PathBuf },

    /// Print the active module order for a host configuration
    Modules {
        /// Host configuration file (JSON or TOML)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Application root the license and module paths resolve against
        #[arg(long, default_value = ".")]
        app_root: PathBuf,

        /// Override the configured modules directory
        #[arg(long)]
        modules_dir: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(Some(&cli.log));

    match cli.command {
        Command::Keygen { out_dir } => keygen(&out_dir),
        Command::Sign {
            secret_key_file,
            customer,
            modules,
            max_users,
            expires,
            organization_id,
            license_type,
            output,
        } => {
            let expires = expires.as_deref().map(parse_date).transpose()?;
            let mut payload = LicensePayload::new(customer, utc_now(), expires, max_users, modules);
            payload.organization_id = organization_id;
            payload.license_type = license_type;
            sign(&secret_key_file, payload, &output)
        }
        Command::Verify {
            license,
            public_key,
        } => verify(&license, &public_key),
        Command::Inspect { license } => inspect(&license),
        Command::Modules {
            config,
            app_root,
            modules_dir,
        } => modules(config.as_deref(), &app_root, modules_dir),
    }
}

fn keygen(out_dir: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create {:?}", out_dir))?;

    let (secret, public) = generate_keypair();
    let secret_path = out_dir.join("license.key");
    let public_path = out_dir.join("license.pub");

    std::fs::write(&secret_path, secret_key_hex(&secret))
        .with_context(|| format!("Failed to write {:?}", secret_path))?;
    std::fs::write(&public_path, public_key_hex(&public))
        .with_context(|| format!("Failed to write {:?}", public_path))?;

    info!("Wrote key pair to {:?}", out_dir);
    println!("secret key: {}", secret_path.display());
    println!("public key: {}", public_key_hex(&public));
    Ok(())
}

fn sign(secret_key_file: &Path, mut payload: LicensePayload, output: &Path) -> anyhow::Result<()> {
    let secret_hex = std::fs::read_to_string(secret_key_file)
        .with_context(|| format!("Failed to read {:?}", secret_key_file))?;
    let secret = parse_secret_key(&secret_hex)?;

    if payload.customer.trim().is_empty() {
        bail!("customer must not be empty");
    }
    if payload.max_users == 0 {
        bail!("max users must be positive");
    }

    sign_license_in_place(&mut payload, &secret)?;
    std::fs::write(output, payload.to_json_pretty()?)
        .with_context(|| format!("Failed to write {:?}", output))?;

    println!(
        "Issued license for {} ({} modules) to {}",
        payload.customer,
        payload.modules.len(),
        output.display()
    );
    Ok(())
}

fn verify(license: &Path, public_key: &str) -> anyhow::Result<()> {
    let payload = LicensePayload::from_file(license)
        .with_context(|| format!("Failed to load license {:?}", license))?;
    let validator = LicenseValidator::from_hex(public_key)?;

    let result = validator.validate(&payload);
    match result.error() {
        None => {
            println!("VALID: {}", payload.customer);
            match LicenseValidator::days_until_expiration(&payload) {
                Some(days) => println!("expires in {} days", days),
                None => println!("perpetual"),
            }
            Ok(())
        }
        Some(reason) => bail!("INVALID: {}", reason),
    }
}

fn inspect(license: &Path) -> anyhow::Result<()> {
    let payload = LicensePayload::from_file(license)
        .with_context(|| format!("Failed to load license {:?}", license))?;

    println!("customer:        {}", payload.customer);
    println!("organization id: {}", payload.organization_id.as_deref().unwrap_or("-"));
    println!("license type:    {}", payload.license_type.as_deref().unwrap_or("-"));
    println!("issued:          {}", payload.issued.to_rfc3339());
    match payload.expires {
        Some(expires) => println!("expires:         {}", expires.to_rfc3339()),
        None => println!("expires:         never"),
    }
    println!("max users:       {}", payload.max_users);
    println!("modules:");
    for module in &payload.modules {
        println!("  {}", module);
    }
    Ok(())
}

fn modules(
    config: Option<&Path>,
    app_root: &Path,
    modules_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut config = match config {
        Some(path) => HostConfig::from_file(path)?,
        None => HostConfig::default(),
    };
    config.apply_env_overrides();
    if let Some(dir) = modules_dir {
        config.modules.modules_dir = Some(dir.to_string_lossy().into_owned());
    }
    let resolved_dir = config
        .modules
        .modules_dir
        .as_deref()
        .map(Path::new)
        .filter(|dir| dir.is_relative())
        .map(|dir| app_root.join(dir).to_string_lossy().into_owned());
    if resolved_dir.is_some() {
        config.modules.modules_dir = resolved_dir;
    }
    config.validate()?;
    debug!("Effective configuration: {:?}", config);

    let registry = ModuleRegistry::from_config(&config.modules);
    let composer = ActiveModuleComposer::bootstrap(&config, app_root, registry);

    let info = composer.license_info();
    match (&info.customer, &info.error_message) {
        (Some(customer), _) if info.is_development => {
            println!("license: {} (development)", customer)
        }
        (Some(customer), _) => println!("license: {}", customer),
        (None, Some(error)) => println!("license: none ({})", error),
        (None, None) => println!("license: none"),
    }

    let active = composer.get_active_modules()?;
    println!("active modules ({}):", active.len());
    for (position, module) in active.iter().enumerate() {
        println!("  {}. {} {}", position + 1, module.module_id(), module.version());
    }
    for assembly in composer.application_assemblies()? {
        println!("application: {}", assembly);
    }
    for assembly in composer.infrastructure_assemblies()? {
        println!("infrastructure: {}", assembly);
    }
    Ok(())
}

fn parse_date(value: &str) -> anyhow::Result<DateTime<Utc>> {
    if let Ok(date_time) = DateTime::parse_from_rfc3339(value) {
        return Ok(date_time.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("Invalid date {:?}, expected YYYY-MM-DD or RFC 3339", value))?;
    match date.and_hms_opt(23, 59, 59) {
        Some(end_of_day) => Ok(end_of_day.and_utc()),
        None => bail!("Invalid date {:?}", value),
    }
}
