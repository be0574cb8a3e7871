//! Discovery tests
//!
//! Bootstrap of plugin roots, partial-failure scans, idempotent rescans and
//! modules configured by name.

use super::test_utils::*;

use std::collections::HashMap;

use typefinder::module::registry::README_FILE_NAME;
use typefinder::module::{ModuleState, TypeDeclaration};
use typefinder::{Capability, HostRuntime, Module, ModuleError, ModuleRuntime, TypeRef};

const SERVICE_A: &str = r#"
[[types]]
name = "ServiceA"
implements = ["IHandler"]
"#;

#[test]
fn test_first_scan_bootstraps_root() {
    let fixture = ModuleTestFixture::new().unwrap();
    let finder = fixture.finder(fixture.config(), HostRuntime::new());

    let report = finder.load_matching_modules();
    assert!(report.loaded.is_empty());
    assert_eq!(report.bootstrapped, vec![fixture.root.clone()]);
    assert!(fixture.root.join(ENTRY_POINT).is_dir());
    assert!(fixture.root.join(README_FILE_NAME).is_file());

    // Convention directory now exists, so the next scan loads normally
    fixture.write_module(&fixture.root, "pluginA.module", "pluginA", "1.0.0", &[], SERVICE_A);
    let report = finder.load_matching_modules();
    assert!(report.bootstrapped.is_empty());
    assert_eq!(report.loaded_names(), vec!["pluginA, Version=1.0.0"]);
}

#[test]
fn test_bootstrap_moves_on_to_next_root() {
    let first = ModuleTestFixture::new().unwrap();
    let second = ModuleTestFixture::bootstrapped().unwrap();
    second.write_module(&second.root, "pluginA.module", "pluginA", "1.0.0", &[], SERVICE_A);

    let mut config = first.config();
    config.root_directories.push(second.root.clone());
    let finder = first.finder(config, HostRuntime::new());

    let report = finder.load_matching_modules();
    assert_eq!(report.bootstrapped, vec![first.root.clone()]);
    assert_eq!(report.loaded.len(), 1);
}

#[test]
fn test_corrupt_file_is_skipped_with_one_warning() {
    let fixture = ModuleTestFixture::bootstrapped().unwrap();
    fixture.write_module(&fixture.root, "pluginA.module", "pluginA", "1.0.0", &[], SERVICE_A);
    fixture.write_corrupt(&fixture.root, "pluginB.module");

    let runtime = HostRuntime::new().with_resident_module(
        Module::builder("host.contracts", "1.0.0")
            .with_type(TypeDeclaration::interface("IHandler"))
            .build(),
    );
    let finder = fixture.finder(fixture.config(), runtime);

    let (report, logs) = with_captured_logs(|| finder.load_matching_modules());

    assert_eq!(report.loaded_names(), vec!["pluginA, Version=1.0.0"]);
    assert_eq!(report.failures().count(), 1);
    assert!(finder.registry().contains("pluginA, Version=1.0.0"));
    assert_eq!(finder.registry().len(), 2);
    assert_eq!(logs.count_lines(&["WARN", "pluginB.module"]), 1);

    let found = finder
        .find_classes_of_type(&Capability::of(TypeRef::new("IHandler")), true)
        .unwrap();
    let names: Vec<_> = found.iter().map(|d| d.name().to_string()).collect();
    assert_eq!(names, vec!["ServiceA"]);
}

#[test]
fn test_rescans_are_idempotent() {
    let fixture = ModuleTestFixture::bootstrapped().unwrap();
    fixture.write_module(&fixture.root, "pluginA.module", "pluginA", "1.0.0", &[], SERVICE_A);
    // Same identity in a second directory
    fixture.write_module(fixture.root.join("copies"), "pluginA.module", "pluginA", "1.0.0", &[], SERVICE_A);
    fixture.write_module(fixture.root.join(ENTRY_POINT), "pluginC.module", "pluginC", "2.1.0", &[], "");

    let finder = fixture.finder(fixture.config(), HostRuntime::new());
    let first = finder.load_matching_modules();
    assert_eq!(first.loaded.len(), 2);

    for _ in 0..3 {
        let again = finder.load_matching_modules();
        assert!(again.loaded.is_empty());
        assert!(again
            .discovered
            .iter()
            .all(|d| d.state == ModuleState::AlreadyLoaded));
    }
    assert_eq!(finder.registry().len(), 2);
}

#[test]
fn test_skip_pattern_wins_over_restrict() {
    let fixture = ModuleTestFixture::bootstrapped().unwrap();
    fixture.write_module(&fixture.root, "legacy.module", "legacy.handlers", "1.0.0", &[], SERVICE_A);
    fixture.write_module(&fixture.root, "plugin.module", "plugin.handlers", "1.0.0", &[], SERVICE_A);

    let mut config = fixture.config();
    config.skip_pattern = "^LEGACY".to_string();
    config.restrict_pattern = "^legacy|^plugin".to_string();
    let finder = fixture.finder(config, HostRuntime::new());

    let report = finder.load_matching_modules();
    assert_eq!(report.loaded_names(), vec!["plugin.handlers, Version=1.0.0"]);
    let rejected: Vec<_> = report
        .discovered
        .iter()
        .filter(|d| d.state == ModuleState::Rejected)
        .collect();
    assert_eq!(rejected.len(), 1);
    assert!(rejected[0].path.ends_with("legacy.module"));
}

#[test]
fn test_restrict_pattern_limits_loading() {
    let fixture = ModuleTestFixture::bootstrapped().unwrap();
    fixture.write_module(&fixture.root, "a.module", "acme.billing", "1.0.0", &[], "");
    fixture.write_module(&fixture.root, "b.module", "other.billing", "1.0.0", &[], "");

    let mut config = fixture.config();
    config.restrict_pattern = "^acme\\.".to_string();
    let finder = fixture.finder(config, HostRuntime::new());

    finder.load_matching_modules();
    let names: Vec<_> = finder
        .modules()
        .unwrap()
        .iter()
        .map(|m| m.name().to_string())
        .collect();
    assert_eq!(names, vec!["acme.billing"]);
}

#[test]
fn test_build_output_directory_is_excluded() {
    let fixture = ModuleTestFixture::bootstrapped().unwrap();
    fixture.write_module(fixture.root.join("Bin"), "built.module", "built", "1.0.0", &[], "");
    fixture.write_module(fixture.root.join("addons"), "addon.module", "addon", "1.0.0", &[], "");
    fixture.write_module(fixture.root.join("addons").join("nested"), "deep.module", "deep", "1.0.0", &[], "");
    std::fs::write(fixture.root.join("notes.txt"), "not a module").unwrap();

    let finder = fixture.finder(fixture.config(), HostRuntime::new());
    let report = finder.load_matching_modules();

    assert_eq!(report.loaded_names(), vec!["addon, Version=1.0.0"]);
    assert_eq!(report.discovered.len(), 1);
}

#[test]
fn test_configured_module_not_on_disk_is_loaded_by_name() {
    let fixture = ModuleTestFixture::bootstrapped().unwrap();
    let runtime = HostRuntime::new().with_catalog_module(
        Module::builder("extras", "3.0.0")
            .with_type(TypeDeclaration::interface("IHandler"))
            .with_type(TypeDeclaration::class("ExtraHandler").implementing(TypeRef::new("IHandler")))
            .build(),
    );

    let mut config = fixture.config();
    config.module_names = vec!["extras".to_string()];
    let finder = fixture.finder(config, runtime);

    let report = finder.load_matching_modules();
    assert!(report.discovered.is_empty());

    let modules = finder.modules().unwrap();
    assert_eq!(modules.len(), 1);
    assert_eq!(modules[0].full_name(), "extras, Version=3.0.0");
    assert!(finder.registry().contains("extras, Version=3.0.0"));

    let found = finder
        .find_classes_of_type(&Capability::of(TypeRef::new("IHandler")), true)
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name(), "ExtraHandler");

    // Resolved once, then served from the registry
    assert_eq!(finder.modules().unwrap().len(), 1);
    assert_eq!(finder.registry().len(), 1);
}

#[test]
fn test_configured_module_probed_from_directory() {
    let fixture = ModuleTestFixture::bootstrapped().unwrap();
    let elsewhere = fixture.temp_dir.path().join("elsewhere");
    fixture.write_module(&elsewhere, "extras.module", "extras", "1.2.0", &[], SERVICE_A);

    let mut config = fixture.config();
    config.module_names = vec!["extras".to_string()];
    let finder = fixture.finder(config, HostRuntime::new().with_probe_directory(&elsewhere));

    let modules = finder.modules().unwrap();
    assert_eq!(modules[0].path(), Some(elsewhere.join("extras.module").as_path()));
}

#[test]
fn test_configured_module_missing_everywhere() {
    let fixture = ModuleTestFixture::bootstrapped().unwrap();
    let mut config = fixture.config();
    config.module_names = vec!["ghost".to_string()];
    let finder = fixture.finder(config, HostRuntime::new());

    let err = finder.modules().unwrap_err();
    assert!(matches!(err, ModuleError::ModuleNotFound(ref name) if name == "ghost"));
}

#[test]
fn test_deeply_nested_type_reference_is_skipped() {
    let fixture = ModuleTestFixture::bootstrapped().unwrap();
    let levels = 200_000;
    let nested = format!("{}B{}", "A<".repeat(levels), ">".repeat(levels));
    let deep = fixture.write_module(
        &fixture.root,
        "aaDeep.module",
        "deep",
        "1.0.0",
        &[],
        &format!("[[types]]\nname = \"Deep\"\nimplements = [\"{}\"]\n", nested),
    );
    fixture.write_module(&fixture.root, "pluginA.module", "pluginA", "1.0.0", &[], SERVICE_A);

    let err = HostRuntime::new().load_file(&deep).unwrap_err();
    assert!(err.is_load_failure());

    let finder = fixture.finder(fixture.config(), HostRuntime::new());
    let (report, logs) = with_captured_logs(|| finder.load_matching_modules());

    assert_eq!(report.loaded_names(), vec!["pluginA, Version=1.0.0"]);
    let failed: Vec<_> = report.failures().collect();
    assert_eq!(failed.len(), 1);
    assert!(failed[0].path.ends_with("aaDeep.module"));
    assert_eq!(logs.count_lines(&["WARN", "aaDeep.module"]), 1);
    assert!(!finder.registry().contains("deep, Version=1.0.0"));
}

#[test]
fn test_concurrent_scans_load_each_identity_once() {
    let fixture = ModuleTestFixture::bootstrapped().unwrap();
    let root = &fixture.root;
    for (dir, name) in [
        (root.clone(), "pluginA"),
        (root.join("copies"), "pluginA"),
        (root.join("copies"), "pluginC"),
        (root.join("more"), "pluginB"),
        (root.join(ENTRY_POINT), "pluginB"),
        (root.join("extra"), "pluginC"),
        (root.join("extra"), "pluginA"),
    ] {
        fixture.write_module(dir, &format!("{}.module", name), name, "1.0.0", &[], SERVICE_A);
    }
    let finder = fixture.finder(fixture.config(), HostRuntime::new());

    let reports: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| finder.scan(&[root])))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let mut loaded: HashMap<String, usize> = HashMap::new();
    for discovered in reports.iter().flat_map(|r| r.discovered.iter()) {
        assert!(!matches!(discovered.state, ModuleState::Failed(_)));
        if discovered.state == ModuleState::Loaded {
            let identity = discovered.identity.as_ref().unwrap().full_name();
            *loaded.entry(identity).or_default() += 1;
        }
    }

    assert_eq!(finder.registry().len(), 3);
    assert_eq!(loaded.len(), 3);
    assert!(loaded.values().all(|count| *count == 1), "{loaded:?}");
    let total: usize = reports.iter().map(|r| r.loaded.len()).sum();
    assert_eq!(total, 3);
}
