//! Module loader implementation
//!
//! Loads a single module file into the registry: cheap identity read, dedup
//! and naming-policy checks, then the full load. Idempotent per identity.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};

use crate::module::registry::ModuleRegistry;
use crate::module::runtime::ModuleRuntime;
use crate::module::traits::{Module, ModuleError, ModuleIdentity, ModuleState};
use crate::module::validation::PatternFilter;

/// Result of a load attempt that did not fail
#[derive(Debug, Clone)]
pub enum LoadOutcome {
    /// Newly loaded and registered
    Loaded(Arc<Module>),
    /// Identity already known, nothing loaded
    AlreadyLoaded(ModuleIdentity),
    /// Identity rejected by the naming policy
    Rejected(ModuleIdentity),
}

impl LoadOutcome {
    pub fn identity(&self) -> &ModuleIdentity {
        match self {
            LoadOutcome::Loaded(module) => module.identity(),
            LoadOutcome::AlreadyLoaded(identity) | LoadOutcome::Rejected(identity) => identity,
        }
    }

    pub fn state(&self) -> ModuleState {
        match self {
            LoadOutcome::Loaded(_) => ModuleState::Loaded,
            LoadOutcome::AlreadyLoaded(_) => ModuleState::AlreadyLoaded,
            LoadOutcome::Rejected(_) => ModuleState::Rejected,
        }
    }

    pub fn module(&self) -> Option<&Arc<Module>> {
        match self {
            LoadOutcome::Loaded(module) => Some(module),
            _ => None,
        }
    }
}

/// Module loader for loading module files into the registry
pub struct ModuleLoader {
    runtime: Arc<dyn ModuleRuntime>,
    registry: Arc<ModuleRegistry>,
    filter: Arc<PatternFilter>,
    /// Short name -> file each module was loaded from
    loaded_files: Mutex<HashMap<String, PathBuf>>,
}

impl ModuleLoader {
    pub fn new(
        runtime: Arc<dyn ModuleRuntime>,
        registry: Arc<ModuleRegistry>,
        filter: Arc<PatternFilter>,
    ) -> Self {
        Self {
            runtime,
            registry,
            filter,
            loaded_files: Mutex::new(HashMap::new()),
        }
    }

    /// Load one module file
    ///
    /// `known` holds full names the caller already considers loaded. Files that
    /// are not valid modules return a load failure (`is_load_failure()`); the
    /// caller decides whether to skip them.
    pub fn load(&self, path: &Path, known: &HashSet<String>) -> Result<LoadOutcome, ModuleError> {
        let identity = self.runtime.read_identity(path)?;
        let full_name = identity.full_name();

        // Held for the whole attempt so concurrent loads of the same name serialize
        let mut loaded_files = self
            .loaded_files
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(previous) = loaded_files.get(&identity.name) {
            debug!(
                "Module {} already loaded from {:?}, skipping {:?}",
                identity.name, previous, path
            );
            return Ok(LoadOutcome::AlreadyLoaded(identity));
        }

        if !self.filter.is_eligible(&full_name) {
            debug!("Module {} rejected by naming policy", full_name);
            return Ok(LoadOutcome::Rejected(identity));
        }

        if known.contains(&full_name) || self.registry.contains(&full_name) {
            debug!("Module {} already resident", full_name);
            return Ok(LoadOutcome::AlreadyLoaded(identity));
        }

        let module = Arc::new(self.runtime.load_file(path)?);
        if !self.registry.register(Arc::clone(&module)) {
            return Ok(LoadOutcome::AlreadyLoaded(module.identity().clone()));
        }
        loaded_files.insert(module.name().to_string(), path.to_path_buf());

        info!(
            "Loaded module {} ({} types) from {:?}",
            module.full_name(),
            module.types().len(),
            path
        );
        Ok(LoadOutcome::Loaded(module))
    }

    /// Files loaded by this loader, by short module name
    pub fn loaded_files(&self) -> HashMap<String, PathBuf> {
        self.loaded_files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn registry(&self) -> &Arc<ModuleRegistry> {
        &self.registry
    }

    pub fn filter(&self) -> &Arc<PatternFilter> {
        &self.filter
    }
}
