//! Module system core types and errors
//!
//! Defines module identity, the loaded-module record, per-file load states and
//! the error type shared by discovery, loading and capability queries.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::module::types::TypeDeclaration;

/// Module identity (short name plus version)
///
/// Two modules are the same module iff their full names are equal, no matter
/// which file or directory they were found in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModuleIdentity {
    /// Short module name
    pub name: String,
    /// Module version
    pub version: String,
}

impl ModuleIdentity {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// Fully qualified name, the key used for naming policies and deduplication
    pub fn full_name(&self) -> String {
        format!("{}, Version={}", self.name, self.version)
    }
}

impl fmt::Display for ModuleIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, Version={}", self.name, self.version)
    }
}

/// Where a module came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModuleSource {
    /// Compiled into the host process
    Resident,
    /// Loaded from a module file
    File(PathBuf),
}

/// Outcome of evaluating one candidate module file during a scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModuleState {
    /// Loaded and registered by this scan
    Loaded,
    /// Identity already known to the process, nothing loaded
    AlreadyLoaded,
    /// Rejected by the naming policy
    Rejected,
    /// File could not be loaded (not a valid module)
    Failed(String),
}

/// A loaded module: identity, origin, declared dependencies and type declarations
#[derive(Debug, Clone)]
pub struct Module {
    identity: ModuleIdentity,
    source: ModuleSource,
    description: Option<String>,
    dependencies: BTreeMap<String, String>,
    types: Vec<TypeDeclaration>,
}

impl Module {
    /// Start building a module (used by hosts to declare resident modules)
    pub fn builder(name: impl Into<String>, version: impl Into<String>) -> ModuleBuilder {
        ModuleBuilder {
            module: Module {
                identity: ModuleIdentity::new(name, version),
                source: ModuleSource::Resident,
                description: None,
                dependencies: BTreeMap::new(),
                types: Vec::new(),
            },
        }
    }

    pub fn identity(&self) -> &ModuleIdentity {
        &self.identity
    }

    pub fn name(&self) -> &str {
        &self.identity.name
    }

    pub fn full_name(&self) -> String {
        self.identity.full_name()
    }

    pub fn source(&self) -> &ModuleSource {
        &self.source
    }

    /// Path of the backing module file, if the module was loaded from disk
    pub fn path(&self) -> Option<&Path> {
        match &self.source {
            ModuleSource::File(path) => Some(path),
            ModuleSource::Resident => None,
        }
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Required modules (short name -> version requirement)
    pub fn dependencies(&self) -> &BTreeMap<String, String> {
        &self.dependencies
    }

    /// Type declarations in declaration order
    pub fn types(&self) -> &[TypeDeclaration] {
        &self.types
    }
}

/// Builder for [`Module`]
#[derive(Debug, Clone)]
pub struct ModuleBuilder {
    module: Module,
}

impl ModuleBuilder {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.module.description = Some(description.into());
        self
    }

    pub fn source(mut self, source: ModuleSource) -> Self {
        self.module.source = source;
        self
    }

    pub fn depends_on(mut self, name: impl Into<String>, requirement: impl Into<String>) -> Self {
        self.module
            .dependencies
            .insert(name.into(), requirement.into());
        self
    }

    pub fn with_type(mut self, declaration: TypeDeclaration) -> Self {
        self.module.types.push(declaration);
        self
    }

    pub fn with_types<I: IntoIterator<Item = TypeDeclaration>>(mut self, declarations: I) -> Self {
        self.module.types.extend(declarations);
        self
    }

    pub fn build(self) -> Module {
        self.module
    }
}

/// Module system errors
#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("Invalid naming pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid module file {path:?}: {reason}")]
    InvalidModule { path: PathBuf, reason: String },

    #[error("Invalid module manifest: {0}")]
    InvalidManifest(String),

    #[error("Invalid type reference {input:?}: {reason}")]
    InvalidTypeReference { input: String, reason: String },

    #[error("Module not found: {0}")]
    ModuleNotFound(String),

    #[error("Type introspection failed:\n{0}")]
    Introspection(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ModuleError {
    /// Errors that only disqualify a single module file and never abort a scan
    pub fn is_load_failure(&self) -> bool {
        matches!(
            self,
            ModuleError::InvalidModule { .. }
                | ModuleError::InvalidManifest(_)
                | ModuleError::InvalidTypeReference { .. }
                | ModuleError::Io(_)
        )
    }

    /// Errors caused by invalid configuration, fatal to discovery
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            ModuleError::InvalidPattern { .. } | ModuleError::InvalidConfig(_)
        )
    }
}
