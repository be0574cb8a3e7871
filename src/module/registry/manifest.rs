//! Module file parsing
//!
//! A module file is a TOML document with a `[module]` header and a list of
//! `[[types]]` declarations. The header alone is enough to learn a module's
//! identity, so the loader can decide whether to load a file without
//! validating its type declarations.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::module::traits::{Module, ModuleError, ModuleIdentity, ModuleSource};
use crate::module::types::TypeDeclaration;

/// Largest module file accepted (bytes)
pub const MAX_MODULE_FILE_SIZE: u64 = 4 * 1024 * 1024;

/// `[module]` header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleHeader {
    /// Module name
    pub name: String,
    /// Module version (semantic versioning)
    pub version: String,
    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Required modules (name -> version or range)
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
}

impl ModuleHeader {
    pub fn identity(&self) -> ModuleIdentity {
        ModuleIdentity::new(self.name.clone(), self.version.clone())
    }
}

/// Complete module file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleManifest {
    pub module: ModuleHeader,
    #[serde(default)]
    pub types: Vec<TypeDeclaration>,
}

#[derive(Deserialize)]
struct HeaderOnly {
    module: ModuleHeader,
}

impl ModuleManifest {
    /// Load and parse a complete module file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ModuleError> {
        let path = path.as_ref();
        let contents = read_module_text(path)?;
        let manifest = Self::parse(&contents).map_err(|reason| ModuleError::InvalidModule {
            path: path.to_path_buf(),
            reason,
        })?;
        check_header(path, &manifest.module)?;
        Ok(manifest)
    }

    /// Read only the module identity from a file
    pub fn read_identity<P: AsRef<Path>>(path: P) -> Result<ModuleIdentity, ModuleError> {
        let path = path.as_ref();
        let contents = read_module_text(path)?;
        let header: HeaderOnly =
            toml::from_str(&contents).map_err(|e| ModuleError::InvalidModule {
                path: path.to_path_buf(),
                reason: describe_toml_error(&contents, &e),
            })?;
        check_header(path, &header.module)?;
        Ok(header.module.identity())
    }

    /// Parse module file contents
    pub fn parse(contents: &str) -> Result<Self, String> {
        toml::from_str(contents).map_err(|e| describe_toml_error(contents, &e))
    }

    /// Serialize back to module file syntax
    pub fn to_toml_string(&self) -> Result<String, ModuleError> {
        toml::to_string_pretty(self)
            .map_err(|e| ModuleError::InvalidManifest(format!("Failed to serialize module: {}", e)))
    }

    pub fn identity(&self) -> ModuleIdentity {
        self.module.identity()
    }

    /// Convert into a loaded module
    pub fn into_module(self, source: ModuleSource) -> Module {
        let ModuleManifest { module, types } = self;
        let mut builder = Module::builder(module.name, module.version)
            .source(source)
            .with_types(types);
        if let Some(description) = module.description {
            builder = builder.description(description);
        }
        for (name, requirement) in module.dependencies {
            builder = builder.depends_on(name, requirement);
        }
        builder.build()
    }
}

impl From<&Module> for ModuleManifest {
    fn from(module: &Module) -> Self {
        Self {
            module: ModuleHeader {
                name: module.name().to_string(),
                version: module.identity().version.clone(),
                description: module.description().map(str::to_string),
                dependencies: module.dependencies().clone(),
            },
            types: module.types().to_vec(),
        }
    }
}

/// Parse error without the offending source line, which may be arbitrarily long
fn describe_toml_error(contents: &str, error: &toml::de::Error) -> String {
    match error.span() {
        Some(span) => format!(
            "Failed to parse module TOML at line {}: {}",
            contents.get(..span.start).unwrap_or(contents).lines().count().max(1),
            error.message()
        ),
        None => format!("Failed to parse module TOML: {}", error.message()),
    }
}

fn read_module_text(path: &Path) -> Result<String, ModuleError> {
    let invalid = |reason: String| ModuleError::InvalidModule {
        path: path.to_path_buf(),
        reason,
    };

    let metadata = std::fs::metadata(path)?;
    if metadata.len() > MAX_MODULE_FILE_SIZE {
        return Err(invalid(format!(
            "Module file too large ({} bytes, max {})",
            metadata.len(),
            MAX_MODULE_FILE_SIZE
        )));
    }

    let bytes = std::fs::read(path)?;
    String::from_utf8(bytes).map_err(|_| invalid("Not a module file (binary content)".to_string()))
}

fn check_header(path: &Path, header: &ModuleHeader) -> Result<(), ModuleError> {
    if header.name.trim().is_empty() {
        return Err(ModuleError::InvalidModule {
            path: path.to_path_buf(),
            reason: "Module name cannot be empty".to_string(),
        });
    }
    if header.version.trim().is_empty() {
        return Err(ModuleError::InvalidModule {
            path: path.to_path_buf(),
            reason: "Module version cannot be empty".to_string(),
        });
    }
    Ok(())
}
