//! License document model
//!
//! The license file is a JSON document whose `signature` covers the
//! canonical serialization of every other field: camelCase names, compact
//! formatting, fixed field order, nulls included.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Parsed license document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicensePayload {
    /// Licensed customer
    pub customer: String,
    /// Issue date
    pub issued: DateTime<Utc>,
    /// Expiry date (None = perpetual)
    #[serde(default)]
    pub expires: Option<DateTime<Utc>>,
    /// Maximum concurrent users
    pub max_users: u32,
    /// Licensed module ids
    pub modules: Vec<String>,
    /// Customer organization id
    #[serde(default)]
    pub organization_id: Option<String>,
    /// License type (e.g. "Enterprise", "Trial")
    #[serde(default)]
    pub license_type: Option<String>,
    /// Base64 signature over the canonical form of all other fields
    #[serde(default)]
    pub signature: String,
}

/// Signed region of a license, in canonical field order
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignedFields<'a> {
    customer: &'a str,
    issued: &'a DateTime<Utc>,
    expires: &'a Option<DateTime<Utc>>,
    max_users: u32,
    modules: &'a [String],
    organization_id: &'a Option<String>,
    license_type: &'a Option<String>,
}

impl LicensePayload {
    /// Unsigned payload
    pub fn new(
        customer: impl Into<String>,
        issued: DateTime<Utc>,
        expires: Option<DateTime<Utc>>,
        max_users: u32,
        modules: Vec<String>,
    ) -> Self {
        Self {
            customer: customer.into(),
            issued,
            expires,
            max_users,
            modules,
            organization_id: None,
            license_type: None,
            signature: String::new(),
        }
    }

    /// Canonical bytes covered by the signature
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&SignedFields {
            customer: &self.customer,
            issued: &self.issued,
            expires: &self.expires,
            max_users: self.max_users,
            modules: &self.modules,
            organization_id: &self.organization_id,
            license_type: &self.license_type,
        })
    }

    /// Parse a license document from JSON text
    pub fn from_json(contents: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(contents)
    }

    /// Read and parse a license file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Ok(Self::from_json(&contents)?)
    }

    /// Pretty JSON for writing a license file
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Whether the license names `module_id` (case-insensitive)
    pub fn covers_module(&self, module_id: &str) -> bool {
        self.modules
            .iter()
            .any(|m| m.eq_ignore_ascii_case(module_id))
    }
}

/// Read-only license summary for the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseInfo {
    /// A validated (or development) license is loaded
    pub is_valid: bool,
    /// License was synthesized for unlicensed development mode
    pub is_development: bool,
    pub customer: Option<String>,
    pub organization_id: Option<String>,
    pub license_type: Option<String>,
    pub issued: Option<DateTime<Utc>>,
    pub expires: Option<DateTime<Utc>>,
    pub max_users: u32,
    pub licensed_modules: Vec<String>,
    /// Days until expiry; negative once expired, None when perpetual
    pub days_until_expiration: Option<i64>,
    /// Why no license is loaded
    pub error_message: Option<String>,
}

impl LicenseInfo {
    /// Summary for "no license loaded"
    pub fn unlicensed(error_message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            is_development: false,
            customer: None,
            organization_id: None,
            license_type: None,
            issued: None,
            expires: None,
            max_users: 0,
            licensed_modules: Vec::new(),
            days_until_expiration: None,
            error_message: Some(error_message.into()),
        }
    }
}
