//! Module dependency checking
//!
//! A module's types can only be introspected when every module it depends on
//! is part of the same module set, at a satisfying version.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::module::traits::{Module, ModuleIdentity};

/// Per-module dependency problems for a module set
#[derive(Debug, Clone, Default)]
pub struct DependencyReport {
    /// Modules with unmet dependencies, and a message per unmet dependency
    pub unresolved: Vec<(ModuleIdentity, Vec<String>)>,
}

impl DependencyReport {
    pub fn is_satisfied(&self) -> bool {
        self.unresolved.is_empty()
    }
}

/// Dependency checker
pub struct ModuleDependencies;

impl ModuleDependencies {
    /// Check every module in the set against the others
    pub fn check(modules: &[Arc<Module>]) -> DependencyReport {
        let available = Self::index(modules);
        let unresolved = modules
            .iter()
            .filter_map(|module| {
                let problems = Self::unmet(module, &available);
                (!problems.is_empty()).then(|| (module.identity().clone(), problems))
            })
            .collect();
        DependencyReport { unresolved }
    }

    /// Short name -> versions present in the set
    fn index(modules: &[Arc<Module>]) -> HashMap<&str, Vec<&str>> {
        let mut available: HashMap<&str, Vec<&str>> = HashMap::new();
        for module in modules {
            available
                .entry(module.name())
                .or_default()
                .push(module.identity().version.as_str());
        }
        available
    }

    /// Unmet dependencies of one module, as human-readable messages
    fn unmet(module: &Module, available: &HashMap<&str, Vec<&str>>) -> Vec<String> {
        let mut problems = Vec::new();
        for (name, requirement) in module.dependencies() {
            match available.get(name.as_str()) {
                None => problems.push(format!(
                    "{} requires {} {} which is not loaded",
                    module.full_name(),
                    name,
                    requirement
                )),
                Some(versions) => {
                    if !versions.iter().any(|v| satisfies(v, requirement)) {
                        problems.push(format!(
                            "{} requires {} {} but found {}",
                            module.full_name(),
                            name,
                            requirement,
                            versions.join(", ")
                        ));
                    }
                }
            }
        }
        if !problems.is_empty() {
            debug!("Unmet dependencies for {}: {:?}", module.full_name(), problems);
        }
        problems
    }
}

/// Whether `version` satisfies `requirement`
///
/// Supports `*`, `==v`, `>=v`, `<=v`, `^v` (same major, at least v), `~v`
/// (same major.minor, at least v). A bare version is a minimum.
pub fn satisfies(version: &str, requirement: &str) -> bool {
    let requirement = requirement.trim();
    if requirement == "*" || requirement.is_empty() {
        return true;
    }
    let Some(found) = parse_version(version) else {
        return false;
    };

    let (op, wanted) = split_operator(requirement);
    let Some(wanted) = parse_version(wanted) else {
        return false;
    };

    match op {
        "==" | "=" => found == wanted,
        "<=" => found <= wanted,
        "^" => found.0 == wanted.0 && found >= wanted,
        "~" => found.0 == wanted.0 && found.1 == wanted.1 && found >= wanted,
        _ => found >= wanted,
    }
}

fn split_operator(requirement: &str) -> (&str, &str) {
    for op in ["==", ">=", "<=", "=", "^", "~"] {
        if let Some(rest) = requirement.strip_prefix(op) {
            return (op, rest.trim());
        }
    }
    ("", requirement)
}

/// major.minor[.patch], prerelease and build metadata ignored
fn parse_version(version: &str) -> Option<(u64, u64, u64)> {
    let core = version.trim().split(['+', '-']).next()?;
    let mut parts = core.split('.').map(|p| p.parse::<u64>().ok());
    let major = parts.next()??;
    let minor = parts.next().unwrap_or(Some(0))?;
    let patch = parts.next().unwrap_or(Some(0))?;
    if parts.next().is_some() {
        return None;
    }
    Some((major, minor, patch))
}
