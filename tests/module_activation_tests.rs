//! Module activation tests
//!
//! End-to-end: manifests on disk, a signed license file and the composer.

mod common;

use common::*;
use hms_modules::module::{ActivationError, ModuleError, ModuleRef, ModuleRegistry};
use hms_modules::ActiveModuleComposer;
use std::sync::Arc;

#[test]
fn test_unlicensed_module_is_excluded() {
    let fixture = HostFixture::new().unwrap();
    fixture.write_manifest("Hospital.Core", "1.0.0", &[]).unwrap();
    fixture.write_manifest("Hospital.Patients", "1.2.0", &["Hospital.Core"]).unwrap();
    fixture.write_manifest("Hospital.Billing", "0.9.0", &[]).unwrap();
    fixture
        .write_license(&["Hospital.Core", "Hospital.Patients"], Some(120))
        .unwrap();

    let composer = fixture.composer(&fixture.config(false));

    assert_eq!(active_ids(&composer), vec!["Hospital.Core", "Hospital.Patients"]);
    assert!(composer.is_module_active("Hospital.Patients"));
    assert!(!composer.is_module_active("Hospital.Billing"));
    assert!(!composer.is_module_licensed("Hospital.Billing"));
    assert_eq!(composer.registry().discover_modules().len(), 3);
}

#[test]
fn test_dependency_on_unlicensed_module_fails_activation() {
    let fixture = HostFixture::new().unwrap();
    fixture.write_manifest("Hospital.Core", "1.0.0", &[]).unwrap();
    fixture.write_manifest("Hospital.Lab", "1.0.0", &["Hospital.Core"]).unwrap();
    fixture.write_license(&["Hospital.Lab"], None).unwrap();

    let composer = fixture.composer(&fixture.config(false));
    let err = composer.get_active_modules().unwrap_err();

    match &err {
        ActivationError::MissingDependency(missing) => {
            assert_eq!(missing.len(), 1);
            assert_eq!(missing[0].module, "Hospital.Lab");
            assert_eq!(missing[0].missing, vec!["Hospital.Core"]);
        }
        other => panic!("expected missing dependency, got {:?}", other),
    }
    let message = err.to_string();
    assert!(message.contains("Hospital.Lab"));
    assert!(message.contains("Hospital.Core"));
}

#[test]
fn test_every_module_with_missing_dependencies_is_reported() {
    let fixture = HostFixture::new().unwrap();
    fixture.write_manifest("Hospital.Lab", "1.0.0", &["Hospital.Core"]).unwrap();
    fixture
        .write_manifest("Hospital.Pharmacy", "1.0.0", &["Hospital.Core", "Hospital.Inventory"])
        .unwrap();
    fixture
        .write_license(&["Hospital.Lab", "Hospital.Pharmacy"], None)
        .unwrap();

    let composer = fixture.composer(&fixture.config(false));
    let Err(ActivationError::MissingDependency(missing)) = composer.get_active_modules() else {
        panic!("expected missing dependencies");
    };

    let modules: Vec<&str> = missing.iter().map(|m| m.module.as_str()).collect();
    assert_eq!(modules, vec!["Hospital.Lab", "Hospital.Pharmacy"]);
    assert_eq!(missing[1].missing, vec!["Hospital.Core", "Hospital.Inventory"]);
}

#[test]
fn test_licensed_cycle_fails_activation() {
    let fixture = HostFixture::new().unwrap();
    fixture.write_manifest("Hospital.X", "1.0.0", &["Hospital.Y"]).unwrap();
    fixture.write_manifest("Hospital.Y", "1.0.0", &["Hospital.X"]).unwrap();
    fixture.write_license(&["Hospital.X", "Hospital.Y"], None).unwrap();

    let composer = fixture.composer(&fixture.config(false));
    let err = composer.get_active_modules().unwrap_err();

    assert_eq!(
        err,
        ActivationError::CircularDependency {
            cycle: vec!["Hospital.X".to_string(), "Hospital.Y".to_string()],
        }
    );
    assert_eq!(
        err.to_string(),
        "Circular module dependency: Hospital.X -> Hospital.Y -> Hospital.X"
    );
    assert!(composer.infrastructure_assemblies().is_err());
}

#[test]
fn test_cycle_outside_license_is_irrelevant() {
    let fixture = HostFixture::new().unwrap();
    fixture.write_manifest("Hospital.Core", "1.0.0", &[]).unwrap();
    fixture.write_manifest("Hospital.X", "1.0.0", &["Hospital.Y"]).unwrap();
    fixture.write_manifest("Hospital.Y", "1.0.0", &["Hospital.X"]).unwrap();
    fixture.write_license(&["Hospital.Core"], None).unwrap();

    let composer = fixture.composer(&fixture.config(false));
    assert_eq!(active_ids(&composer), vec!["Hospital.Core"]);
}

#[test]
fn test_no_license_activates_nothing() {
    let fixture = HostFixture::new().unwrap();
    fixture.write_manifest("Hospital.Core", "1.0.0", &[]).unwrap();

    let composer = fixture.composer(&fixture.config(false));

    assert!(composer.get_active_modules().unwrap().is_empty());
    assert!(composer.application_assemblies().unwrap().is_empty());
    let info = composer.license_info();
    assert!(!info.is_valid);
    assert!(info.error_message.is_some());
}

#[test]
fn test_development_mode_activates_all_discovered_modules() {
    let fixture = HostFixture::new().unwrap();
    fixture.write_manifest("Hospital.Patients", "1.0.0", &["Hospital.Core"]).unwrap();
    fixture.write_manifest("Hospital.Core", "1.0.0", &[]).unwrap();

    let composer = fixture.composer(&fixture.config(true));

    assert_eq!(active_ids(&composer), vec!["Hospital.Core", "Hospital.Patients"]);
    let info = composer.license_info();
    assert!(info.is_valid);
    assert!(info.is_development);
    assert_eq!(info.licensed_modules.len(), 2);
}

#[test]
fn test_development_mode_ignored_when_license_file_is_invalid() {
    let fixture = HostFixture::new().unwrap();
    fixture.write_manifest("Hospital.Core", "1.0.0", &[]).unwrap();
    std::fs::write(fixture.license_path(), "not a license").unwrap();

    let composer = fixture.composer(&fixture.config(true));

    assert!(composer.get_active_modules().unwrap().is_empty());
    assert!(!composer.license_info().is_development);
}

#[test]
fn test_license_matching_is_case_insensitive() {
    let fixture = HostFixture::new().unwrap();
    fixture.write_manifest("Hospital.Core", "1.0.0", &[]).unwrap();
    fixture.write_license(&["HOSPITAL.CORE"], None).unwrap();

    let composer = fixture.composer(&fixture.config(false));
    assert_eq!(active_ids(&composer), vec!["Hospital.Core"]);
}

#[test]
fn test_assembly_groupings_follow_activation_order() {
    let fixture = HostFixture::new().unwrap();
    fixture.write_manifest("Hospital.Patients", "1.0.0", &["Hospital.Core"]).unwrap();
    fixture.write_manifest("Hospital.Core", "1.0.0", &[]).unwrap();
    fixture
        .write_license(&["Hospital.Core", "Hospital.Patients"], None)
        .unwrap();

    let composer = fixture.composer(&fixture.config(false));

    assert_eq!(
        composer.application_assemblies().unwrap(),
        vec!["Hospital.Core.Application", "Hospital.Patients.Application"]
    );
    assert_eq!(
        composer.infrastructure_assemblies().unwrap(),
        vec!["Hospital.Core.Infrastructure", "Hospital.Patients.Infrastructure"]
    );
}

#[test]
fn test_directories_outside_convention_and_bad_manifests_are_skipped() {
    let fixture = HostFixture::new().unwrap();
    fixture.write_manifest("Hospital.Core", "1.0.0", &[]).unwrap();
    fixture
        .write_raw_manifest(
            "Vendor.Reports.Infrastructure",
            "id = \"Vendor.Reports\"\nversion = \"1.0.0\"\n",
        )
        .unwrap();
    fixture
        .write_raw_manifest("Hospital.Broken.Infrastructure", "id = \nversion = ")
        .unwrap();
    std::fs::create_dir_all(fixture.modules_dir.join("Hospital.Empty.Infrastructure")).unwrap();

    let composer = fixture.composer(&fixture.config(true));
    assert_eq!(
        composer.registry().module_ids(),
        vec!["Hospital.Core".to_string()]
    );
}

#[test]
fn test_registered_modules_precede_manifests_and_win_duplicates() {
    let fixture = HostFixture::new().unwrap();
    fixture.write_manifest("Hospital.Core", "2.0.0", &[]).unwrap();
    fixture.write_manifest("Hospital.Lab", "1.0.0", &["Hospital.Core"]).unwrap();
    fixture.write_license(&["Hospital.Core", "Hospital.Lab"], None).unwrap();

    let config = fixture.config(false);
    let mut registry = ModuleRegistry::from_config(&config.modules);
    registry.register_module(Arc::new(TestModule::new("Hospital.Core", &[])));
    registry.register_factory("BrokenModule", || -> Result<ModuleRef, ModuleError> {
        Err(ModuleError::ConstructionError("database unavailable".to_string()))
    });

    let composer = ActiveModuleComposer::bootstrap(&config, fixture.app_root(), registry);
    let active = composer.get_active_modules().unwrap();

    let ids: Vec<&str> = active.iter().map(|m| m.module_id()).collect();
    assert_eq!(ids, vec!["Hospital.Core", "Hospital.Lab"]);
    assert_eq!(active[0].version(), "1.0.0");
}

#[test]
fn test_invalidate_recomposes_from_caches() {
    let fixture = HostFixture::new().unwrap();
    fixture.write_manifest("Hospital.Core", "1.0.0", &[]).unwrap();
    fixture.write_license(&["Hospital.Core"], None).unwrap();

    let mut composer = fixture.composer(&fixture.config(false));
    let before = active_ids(&composer);

    composer.invalidate();
    assert_eq!(active_ids(&composer), before);
}
