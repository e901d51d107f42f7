//! License validation
//!
//! Checks run in a fixed order and stop at the first failure:
//! expiry, signature, then required fields.

use chrono::{DateTime, Utc};
use secp256k1::PublicKey;
use thiserror::Error;
use tracing::debug;

use crate::license::payload::LicensePayload;
use crate::license::signing::{parse_public_key, verify_license_signature, SigningError};
use crate::utils::time::{days_between, utc_now};

/// Reason a license was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LicenseRejection {
    #[error("License expired on {0}")]
    Expired(DateTime<Utc>),

    #[error("License signature is invalid")]
    InvalidSignature,

    #[error("License has no customer name")]
    MissingCustomer,

    #[error("License does not list any modules")]
    NoModules,

    #[error("License max users must be positive")]
    InvalidMaxUsers,
}

/// Outcome of validating a license payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LicenseValidation {
    Valid,
    Invalid(LicenseRejection),
}

impl LicenseValidation {
    pub fn is_valid(&self) -> bool {
        matches!(self, LicenseValidation::Valid)
    }

    /// Human-readable reason, None when valid
    pub fn error(&self) -> Option<String> {
        match self {
            LicenseValidation::Valid => None,
            LicenseValidation::Invalid(reason) => Some(reason.to_string()),
        }
    }
}

/// License validator holding the trusted public key
///
/// A validator without a key rejects every signature.
#[derive(Debug, Clone, Default)]
pub struct LicenseValidator {
    public_key: Option<PublicKey>,
}

impl LicenseValidator {
    pub fn new(public_key: PublicKey) -> Self {
        Self {
            public_key: Some(public_key),
        }
    }

    /// Validator from a hex-encoded public key
    pub fn from_hex(hex_key: &str) -> Result<Self, SigningError> {
        Ok(Self::new(parse_public_key(hex_key)?))
    }

    /// Validator that trusts no key
    pub fn without_key() -> Self {
        Self { public_key: None }
    }

    /// Validate against the current UTC time
    pub fn validate(&self, payload: &LicensePayload) -> LicenseValidation {
        self.validate_at(payload, utc_now())
    }

    /// Validate against an explicit point in time
    pub fn validate_at(&self, payload: &LicensePayload, now: DateTime<Utc>) -> LicenseValidation {
        let result = self.check(payload, now);
        if let Err(reason) = &result {
            debug!("License for {:?} rejected: {}", payload.customer, reason);
        }
        match result {
            Ok(()) => LicenseValidation::Valid,
            Err(reason) => LicenseValidation::Invalid(reason),
        }
    }

    fn check(&self, payload: &LicensePayload, now: DateTime<Utc>) -> Result<(), LicenseRejection> {
        if let Some(expires) = payload.expires {
            if expires < now {
                return Err(LicenseRejection::Expired(expires));
            }
        }

        let signature_ok = self
            .public_key
            .as_ref()
            .map_or(false, |key| verify_license_signature(payload, key));
        if !signature_ok {
            return Err(LicenseRejection::InvalidSignature);
        }

        if payload.customer.trim().is_empty() {
            return Err(LicenseRejection::MissingCustomer);
        }
        if payload.modules.is_empty() {
            return Err(LicenseRejection::NoModules);
        }
        if payload.max_users == 0 {
            return Err(LicenseRejection::InvalidMaxUsers);
        }

        Ok(())
    }

    /// Days until expiry relative to now (None for perpetual licenses)
    pub fn days_until_expiration(payload: &LicensePayload) -> Option<i64> {
        Self::days_until_expiration_at(payload, utc_now())
    }

    /// Days until expiry relative to `now`; negative once expired
    pub fn days_until_expiration_at(payload: &LicensePayload, now: DateTime<Utc>) -> Option<i64> {
        payload.expires.map(|expires| days_between(now, expires))
    }
}
