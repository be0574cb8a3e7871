//! Host runtime services
//!
//! The runtime knows which modules are compiled into the host, how to read a
//! module file, and how to resolve a module by name. [`HostRuntime`] is the
//! default implementation; hosts declare their resident modules at startup.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::module::registry::manifest::ModuleManifest;
use crate::module::traits::{Module, ModuleError, ModuleIdentity, ModuleSource};
use crate::module::validation::{ManifestValidator, ValidationResult};

/// Process-level module services used by discovery and queries
pub trait ModuleRuntime: Send + Sync {
    /// Name of the host's main module
    fn entry_point(&self) -> &str;

    /// Modules compiled into the host process
    fn resident_modules(&self) -> Vec<Arc<Module>>;

    /// Read a module file's identity without loading its types
    fn read_identity(&self, path: &Path) -> Result<ModuleIdentity, ModuleError>;

    /// Fully load a module file
    fn load_file(&self, path: &Path) -> Result<Module, ModuleError>;

    /// Resolve a module by short or full name
    fn load_by_name(&self, name: &str) -> Result<Module, ModuleError>;
}

/// Default runtime: resident modules, a catalog of named modules, probe directories
pub struct HostRuntime {
    entry_point: String,
    resident: Vec<Arc<Module>>,
    catalog: Vec<Module>,
    probe_directories: Vec<PathBuf>,
    file_extension: String,
}

impl HostRuntime {
    /// Runtime whose entry point is the current executable's name
    pub fn new() -> Self {
        Self {
            entry_point: default_entry_point(),
            resident: Vec::new(),
            catalog: Vec::new(),
            probe_directories: Vec::new(),
            file_extension: "module".to_string(),
        }
    }

    pub fn with_entry_point(mut self, entry_point: impl Into<String>) -> Self {
        self.entry_point = entry_point.into();
        self
    }

    /// Declare a module compiled into the host
    pub fn with_resident_module(mut self, module: Module) -> Self {
        self.resident.push(Arc::new(module));
        self
    }

    /// Make a module resolvable by name without it being resident
    pub fn with_catalog_module(mut self, module: Module) -> Self {
        self.catalog.push(module);
        self
    }

    /// Directory searched for `<name>.<ext>` when resolving by name
    pub fn with_probe_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.probe_directories.push(directory.into());
        self
    }

    /// Extension used when probing for named modules (default `module`)
    pub fn with_file_extension(mut self, extension: impl Into<String>) -> Self {
        self.file_extension = extension.into().trim_start_matches('.').to_string();
        self
    }

    fn probe(&self, name: &str) -> Option<PathBuf> {
        self.probe_directories
            .iter()
            .map(|dir| dir.join(format!("{}.{}", name, self.file_extension)))
            .find(|candidate| candidate.is_file())
    }
}

impl Default for HostRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleRuntime for HostRuntime {
    fn entry_point(&self) -> &str {
        &self.entry_point
    }

    fn resident_modules(&self) -> Vec<Arc<Module>> {
        self.resident.clone()
    }

    fn read_identity(&self, path: &Path) -> Result<ModuleIdentity, ModuleError> {
        ModuleManifest::read_identity(path)
    }

    fn load_file(&self, path: &Path) -> Result<Module, ModuleError> {
        let manifest = ModuleManifest::from_file(path)?;
        if let ValidationResult::Invalid(errors) = ManifestValidator::new().validate(&manifest) {
            return Err(ModuleError::InvalidModule {
                path: path.to_path_buf(),
                reason: errors.join("; "),
            });
        }
        Ok(manifest.into_module(ModuleSource::File(path.to_path_buf())))
    }

    fn load_by_name(&self, name: &str) -> Result<Module, ModuleError> {
        if let Some(module) = self
            .catalog
            .iter()
            .find(|m| m.name() == name || m.full_name() == name)
        {
            debug!("Resolved module {} from host catalog", name);
            return Ok(module.clone());
        }

        if let Some(path) = self.probe(name) {
            debug!("Resolved module {} by probing {:?}", name, path);
            return self.load_file(&path);
        }

        Err(ModuleError::ModuleNotFound(name.to_string()))
    }
}

fn default_entry_point() -> String {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string())
}
