//! Capability query tests
//!
//! Open-generic matching, concrete filtering and introspection failures over
//! modules discovered on disk.

use super::test_utils::*;

use typefinder::{Capability, CapabilityQuery, HostRuntime, ModuleError, TypeFinder};

const PLUGIN_TYPES: &str = r#"
[[types]]
name = "ServiceA"
implements = ["Handler<i32>"]

[[types]]
name = "ServiceB"
implements = ["Handler<String>"]

[[types]]
name = "ServiceC"
base = "HandlerBase<Order>"

[[types]]
name = "AbstractService"
abstract = true
implements = ["IHandler"]

[[types]]
name = "IPluginHandler"
kind = "interface"
implements = ["IHandler"]

[[types]]
name = "Unrelated"
"#;

fn scanned_finder(fixture: &ModuleTestFixture, strict: bool) -> TypeFinder {
    fixture.write_module(&fixture.root, "contracts.module", "contracts", "1.0.0", &[], CONTRACT_TYPES);
    fixture.write_module(
        &fixture.root,
        "pluginA.module",
        "pluginA",
        "1.0.0",
        &[("contracts", "^1.0")],
        PLUGIN_TYPES,
    );
    let mut config = fixture.config();
    config.strict_introspection = strict;
    let finder = fixture.finder(config, HostRuntime::new());
    finder.load_matching_modules();
    finder
}

fn names(finder: &TypeFinder, capability: &str, only_concrete: bool) -> Vec<String> {
    finder
        .find_classes_of_type(&Capability::parse(capability).unwrap(), only_concrete)
        .unwrap()
        .iter()
        .map(|d| d.name().to_string())
        .collect()
}

#[test]
fn test_open_generic_matches_regardless_of_argument() {
    let fixture = ModuleTestFixture::bootstrapped().unwrap();
    let finder = scanned_finder(&fixture, true);

    assert_eq!(
        names(&finder, "Handler<>", true),
        vec!["ServiceA", "ServiceB", "ServiceC"]
    );
    assert_eq!(names(&finder, "Handler<i32>", true), vec!["ServiceA"]);
    assert_eq!(names(&finder, "Handler<Order>", true), vec!["ServiceC"]);
}

#[test]
fn test_only_concrete_classes() {
    let fixture = ModuleTestFixture::bootstrapped().unwrap();
    let finder = scanned_finder(&fixture, true);

    assert_eq!(names(&finder, "IHandler", true), vec!["ServiceC"]);
    assert_eq!(
        names(&finder, "IHandler", false),
        vec!["HandlerBase", "ServiceC", "AbstractService"]
    );
}

#[test]
fn test_descriptors_carry_module_and_capabilities() {
    let fixture = ModuleTestFixture::bootstrapped().unwrap();
    let finder = scanned_finder(&fixture, true);

    let found = finder
        .find_classes_of_type(&Capability::parse("IHandler").unwrap(), true)
        .unwrap();
    let service = &found[0];
    assert_eq!(service.module.full_name(), "pluginA, Version=1.0.0");
    assert!(service.is_concrete_class());
    let capabilities: Vec<_> = service.capabilities.iter().map(|c| c.to_string()).collect();
    assert_eq!(capabilities, vec!["HandlerBase<Order>", "Handler<Order>", "IHandler"]);
}

#[test]
fn test_zero_matches_is_empty() {
    let fixture = ModuleTestFixture::bootstrapped().unwrap();
    let finder = scanned_finder(&fixture, true);

    assert!(names(&finder, "IRepository", true).is_empty());
    assert!(names(&finder, "Repository<,>", false).is_empty());
}

#[test]
fn test_missing_dependency_fails_strict_query() {
    let fixture = ModuleTestFixture::bootstrapped().unwrap();
    fixture.write_module(&fixture.root, "a.module", "pluginA", "1.0.0", &[], PLUGIN_TYPES);
    fixture.write_module(
        &fixture.root,
        "b.module",
        "pluginB",
        "1.0.0",
        &[("contracts", "^2.0")],
        "[[types]]\nname = \"Orphan\"\nimplements = [\"IHandler\"]\n",
    );
    fixture.write_module(
        &fixture.root,
        "c.module",
        "pluginC",
        "1.0.0",
        &[("storage", "1.0")],
        "",
    );
    let finder = fixture.finder(fixture.config(), HostRuntime::new());
    finder.load_matching_modules();

    let err = finder
        .find_classes_of_type(&Capability::parse("IHandler").unwrap(), true)
        .unwrap_err();
    match err {
        ModuleError::Introspection(message) => {
            let lines: Vec<_> = message.lines().collect();
            assert_eq!(lines.len(), 2);
            assert!(lines[0].contains("pluginB"));
            assert!(lines[1].contains("storage"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_lenient_query_excludes_only_failing_modules() {
    let fixture = ModuleTestFixture::bootstrapped().unwrap();
    fixture.write_module(
        &fixture.root,
        "orphan.module",
        "orphan",
        "1.0.0",
        &[("missing", "*")],
        "[[types]]\nname = \"Orphan\"\nimplements = [\"IHandler\"]\n",
    );
    let finder = scanned_finder(&fixture, false);

    let (found, logs) = with_captured_logs(|| names(&finder, "IHandler", true));
    assert_eq!(found, vec!["ServiceC"]);
    assert_eq!(logs.count_lines(&["WARN", "orphan"]), 1);

    let raw = finder
        .query(&CapabilityQuery::concrete(Capability::parse("IHandler").unwrap()))
        .unwrap();
    assert!(!raw.is_complete());
    assert_eq!(raw.failures[0].module.name, "orphan");
}
