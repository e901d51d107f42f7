//! Descriptor validation framework
//!
//! Informational checks on module identity, version strings and declared
//! minimum dependency versions. Results are logged; nothing here blocks
//! discovery or activation.

use std::cmp::Ordering;
use tracing::{debug, warn};

use crate::module::traits::{ModuleDescriptor, ModuleRef};

/// Validation result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    /// Descriptor is valid
    Valid,
    /// Descriptor is invalid with specific errors
    Invalid(Vec<String>),
}

/// Descriptor validator
pub struct ManifestValidator {
    /// Maximum module id length
    max_id_len: usize,
}

impl ManifestValidator {
    /// Create a new validator
    pub fn new() -> Self {
        Self { max_id_len: 128 }
    }

    /// Validate a module descriptor
    pub fn validate(&self, module: &dyn ModuleDescriptor) -> ValidationResult {
        let mut errors = Vec::new();
        let id = module.module_id();

        if !self.is_valid_id(id) {
            errors.push(format!(
                "Invalid module id: {} (expected dotted alphanumeric segments)",
                id
            ));
        }

        if module.version().is_empty() {
            errors.push("Module version cannot be empty".to_string());
        } else if parse_version(module.version()).is_none() {
            errors.push(format!(
                "Invalid version format: {} (expected semantic versioning)",
                module.version()
            ));
        }

        if module.assembly().is_empty() {
            errors.push("Module assembly cannot be empty".to_string());
        }

        for dep in module.dependencies() {
            if dep == id {
                errors.push(format!("Module {} depends on itself", id));
            } else if !self.is_valid_id(dep) {
                errors.push(format!("Invalid dependency id: {}", dep));
            }
        }

        for (dep, minimum) in module.minimum_dependency_versions() {
            if !module.dependencies().contains(&dep) {
                errors.push(format!(
                    "Minimum version declared for {} which is not a dependency",
                    dep
                ));
            }
            if parse_version(&minimum).is_none() {
                errors.push(format!(
                    "Invalid minimum version format: {} (for dependency: {})",
                    minimum, dep
                ));
            }
        }

        if errors.is_empty() {
            debug!("Descriptor validation passed for module: {}", id);
            ValidationResult::Valid
        } else {
            warn!("Descriptor validation failed for module {}: {:?}", id, errors);
            ValidationResult::Invalid(errors)
        }
    }

    /// Module id format: dotted segments of alphanumerics, dashes, underscores
    #[inline]
    fn is_valid_id(&self, id: &str) -> bool {
        if id.is_empty() || id.len() > self.max_id_len {
            return false;
        }

        id.split('.').all(|segment| {
            segment.chars().next().map_or(false, |c| c.is_alphanumeric())
                && segment
                    .chars()
                    .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
        })
    }
}

impl Default for ManifestValidator {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse `major.minor[.patch][-prerelease][+build]` into numeric parts
///
/// Prerelease and build metadata are accepted but ignored for ordering.
pub fn parse_version(version: &str) -> Option<(u64, u64, u64)> {
    let base = version.split('+').next()?;
    let core = base.split('-').next()?;

    let nums: Vec<&str> = core.split('.').collect();
    if nums.len() < 2 || nums.len() > 3 {
        return None;
    }

    let mut parts = [0u64; 3];
    for (slot, n) in parts.iter_mut().zip(&nums) {
        if n.is_empty() || !n.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        *slot = n.parse().ok()?;
    }

    Some((parts[0], parts[1], parts[2]))
}

/// Compare two version strings; `None` if either is malformed
pub fn compare_versions(a: &str, b: &str) -> Option<Ordering> {
    Some(parse_version(a)?.cmp(&parse_version(b)?))
}

/// Log every dependency whose version is below the declared minimum
///
/// Returns the violations as `(module, dependency, found, minimum)` so the
/// host can surface them; activation is not affected.
pub fn check_minimum_versions(modules: &[ModuleRef]) -> Vec<(String, String, String, String)> {
    let mut violations = Vec::new();

    for module in modules {
        for (dep, minimum) in module.minimum_dependency_versions() {
            let Some(found) = modules.iter().find(|m| m.module_id() == dep) else {
                continue;
            };

            if compare_versions(found.version(), &minimum) == Some(Ordering::Less) {
                warn!(
                    "Module {} expects {} >= {}, found {}",
                    module.module_id(),
                    dep,
                    minimum,
                    found.version()
                );
                violations.push((
                    module.module_id().to_string(),
                    dep,
                    found.version().to_string(),
                    minimum,
                ));
            }
        }
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::registry::manifest::{ManifestModule, ModuleManifest};
    use std::sync::Arc;

    #[test]
    fn test_parse_version() {
        assert_eq!(parse_version("1.2.3"), Some((1, 2, 3)));
        assert_eq!(parse_version("1.2"), Some((1, 2, 0)));
        assert_eq!(parse_version("2.0.0-beta.1+build5"), Some((2, 0, 0)));
        assert_eq!(parse_version("1"), None);
        assert_eq!(parse_version("1.x.0"), None);
        assert_eq!(parse_version(""), None);
    }

    #[test]
    fn test_compare_versions() {
        assert_eq!(compare_versions("1.10.0", "1.9.9"), Some(Ordering::Greater));
        assert_eq!(compare_versions("1.0", "1.0.0"), Some(Ordering::Equal));
        assert_eq!(compare_versions("bad", "1.0.0"), None);
    }

    #[test]
    fn test_valid_descriptor() {
        let module = ManifestModule::new(
            ModuleManifest::new("Hospital.Patients", "1.0.0")
                .with_dependency("Hospital.Core")
                .with_minimum_version("Hospital.Core", "1.1.0"),
        );
        assert_eq!(ManifestValidator::new().validate(&module), ValidationResult::Valid);
    }

    #[test]
    fn test_invalid_descriptor_collects_errors() {
        let module = ManifestModule::new(
            ModuleManifest::new("Hospital..Bad", "one")
                .with_dependency("Hospital..Bad")
                .with_minimum_version("Other", "x"),
        );
        match ManifestValidator::new().validate(&module) {
            ValidationResult::Invalid(errors) => assert_eq!(errors.len(), 5),
            ValidationResult::Valid => panic!("expected invalid descriptor"),
        }
    }

    #[test]
    fn test_minimum_version_violations_are_reported() {
        let core: ModuleRef = Arc::new(ManifestModule::new(ModuleManifest::new(
            "Hospital.Core",
            "1.0.0",
        )));
        let patients: ModuleRef = Arc::new(ManifestModule::new(
            ModuleManifest::new("Hospital.Patients", "1.0.0")
                .with_dependency("Hospital.Core")
                .with_minimum_version("Hospital.Core", "2.0.0"),
        ));

        let violations = check_minimum_versions(&[core, patients]);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].1, "Hospital.Core");
        assert_eq!(violations[0].3, "2.0.0");
    }
}
