//! Module validation framework
//!
//! Informational descriptor checks: id format, semantic versions and
//! declared minimum dependency versions.

pub mod manifest_validator;

pub use manifest_validator::{
    check_minimum_versions, compare_versions, parse_version, ManifestValidator, ValidationResult,
};
