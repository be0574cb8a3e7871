//! Manifest validation framework
//!
//! Validates module manifests for structure and consistency before a module
//! is admitted to the registry.

use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

use crate::module::registry::manifest::ModuleManifest;
use crate::module::types::{TypeDeclaration, TypeKind};

/// Validation result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    /// Manifest is valid
    Valid,
    /// Manifest is invalid with specific errors
    Invalid(Vec<String>),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }
}

/// Manifest validator
pub struct ManifestValidator {
    /// Maximum module name length
    max_name_length: usize,
    /// Maximum number of type declarations per module
    max_types: usize,
}

impl ManifestValidator {
    /// Create a new manifest validator
    pub fn new() -> Self {
        Self {
            max_name_length: 128,
            max_types: 10_000,
        }
    }

    /// Validate a module manifest
    pub fn validate(&self, manifest: &ModuleManifest) -> ValidationResult {
        let mut errors = Vec::new();
        let header = &manifest.module;

        if header.name.is_empty() {
            errors.push("Module name cannot be empty".to_string());
        } else if !self.is_valid_name(&header.name) {
            errors.push(format!(
                "Invalid module name: {} (must be alphanumeric with dots/dashes/underscores)",
                header.name
            ));
        }

        if header.version.is_empty() {
            errors.push("Module version cannot be empty".to_string());
        } else if !is_valid_version(&header.version) {
            errors.push(format!(
                "Invalid version format: {} (expected semantic versioning)",
                header.version
            ));
        }

        if let Err(dep_errors) = self.validate_dependencies(&header.dependencies) {
            errors.extend(dep_errors);
        }

        if manifest.types.len() > self.max_types {
            errors.push(format!(
                "Too many type declarations: {} (max {})",
                manifest.types.len(),
                self.max_types
            ));
        }

        if let Err(type_errors) = self.validate_types(&manifest.types) {
            errors.extend(type_errors);
        }

        if errors.is_empty() {
            debug!("Manifest validation passed for module: {}", header.name);
            ValidationResult::Valid
        } else {
            warn!(
                "Manifest validation failed for module {}: {:?}",
                header.name, errors
            );
            ValidationResult::Invalid(errors)
        }
    }

    /// Validate module name format
    #[inline]
    fn is_valid_name(&self, name: &str) -> bool {
        if name.is_empty() || name.len() > self.max_name_length {
            return false;
        }

        // Must start with alphanumeric
        if !name.chars().next().map_or(false, |c| c.is_alphanumeric()) {
            return false;
        }

        name.chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.')
    }

    /// Validate dependencies
    fn validate_dependencies(
        &self,
        dependencies: &BTreeMap<String, String>,
    ) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        for (dep_name, dep_version) in dependencies {
            if !self.is_valid_name(dep_name) {
                errors.push(format!("Invalid dependency name: {}", dep_name));
            }

            if !is_valid_version_or_range(dep_version) {
                errors.push(format!(
                    "Invalid dependency version format: {} (for dependency: {})",
                    dep_version, dep_name
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate type declarations
    fn validate_types(&self, types: &[TypeDeclaration]) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        let mut seen = HashSet::new();

        for decl in types {
            if !is_valid_type_name(&decl.name) {
                errors.push(format!("Invalid type name: {:?}", decl.name));
                continue;
            }

            if !seen.insert(decl.template_key()) {
                errors.push(format!("Duplicate type declaration: {}", decl.self_ref()));
            }

            let mut params = HashSet::new();
            for param in &decl.type_params {
                if !is_valid_type_name(param) || !params.insert(param.as_str()) {
                    errors.push(format!(
                        "Invalid or duplicate type parameter {:?} on {}",
                        param, decl.name
                    ));
                }
            }

            if decl.kind == TypeKind::Interface {
                if decl.base.is_some() {
                    errors.push(format!(
                        "Interface {} cannot declare a base class",
                        decl.name
                    ));
                }
                if decl.is_abstract {
                    debug!("Interface {} marked abstract (redundant)", decl.name);
                }
            }

            if decl.base.as_ref().map_or(false, |b| b.name() == decl.name)
                || decl.implements.iter().any(|i| i.name() == decl.name && i.arity() == decl.type_params.len())
            {
                errors.push(format!("Type {} cannot inherit from itself", decl.name));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl Default for ManifestValidator {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate type or parameter name
fn is_valid_type_name(name: &str) -> bool {
    !name.is_empty()
        && name.chars().next().map_or(false, |c| c.is_alphabetic() || c == '_')
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '.' || c == ':')
}

/// Validate version format (semantic versioning)
///
/// Accepts: major.minor[.patch][-prerelease][+build]
pub(crate) fn is_valid_version(version: &str) -> bool {
    if version.is_empty() {
        return false;
    }

    let base = version.split('+').next().unwrap_or(version);
    let version_part = base.split('-').next().unwrap_or(base);

    let nums: Vec<&str> = version_part.split('.').collect();
    if nums.len() < 2 || nums.len() > 3 {
        return false;
    }

    nums.iter().all(|n| {
        !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()) && n.parse::<u32>().is_ok()
    })
}

/// Validate version or version range (>=, <=, ==, ^, ~)
pub(crate) fn is_valid_version_or_range(version: &str) -> bool {
    let version = version.trim();
    if version == "*" {
        return true;
    }
    let version_part = version.trim_start_matches(|c: char| {
        c == '>' || c == '=' || c == '^' || c == '~' || c == '<'
    });
    is_valid_version(version_part.trim())
}
