//! Licensing gate
//!
//! Parses and verifies the signed license document and answers which
//! modules the customer may run.
//!
//! ## Flow
//!
//! - [`payload`]: license document model and its canonical signed form
//! - [`signing`]: secp256k1 signatures over the canonical form
//! - [`validator`]: expiry, signature and required-field checks
//! - [`service`]: one-time load, caching and license queries

pub mod payload;
pub mod service;
pub mod signing;
pub mod validator;

pub use payload::{LicenseInfo, LicensePayload};
pub use service::{LicenseService, DEVELOPMENT_SIGNATURE};
pub use signing::{
    generate_keypair, parse_public_key, parse_secret_key, sign_license, sign_license_in_place,
    verify_license_signature, SigningError,
};
pub use validator::{LicenseRejection, LicenseValidation, LicenseValidator};
