//! Process-wide module registry
//!
//! Identity-keyed table of loaded modules. Registration is idempotent:
//! registering an identity that is already present is a no-op. Iteration
//! follows registration order.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

use crate::module::traits::Module;

/// Registry of loaded modules, shared by handle between discovery and queries
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    inner: RwLock<RegistryInner>,
}

#[derive(Debug, Default)]
struct RegistryInner {
    /// Modules in registration order
    modules: Vec<Arc<Module>>,
    /// Full name -> index into `modules`
    by_identity: HashMap<String, usize>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module; returns `false` (and changes nothing) if its identity is already present
    pub fn register(&self, module: Arc<Module>) -> bool {
        let key = module.full_name();
        let mut inner = self.write();
        if inner.by_identity.contains_key(&key) {
            debug!("Module {} already registered", key);
            return false;
        }
        let index = inner.modules.len();
        inner.modules.push(module);
        inner.by_identity.insert(key, index);
        true
    }

    /// All modules in registration order
    pub fn all(&self) -> Vec<Arc<Module>> {
        self.read().modules.clone()
    }

    /// Full names of all registered modules, in registration order
    pub fn identities(&self) -> Vec<String> {
        self.read().modules.iter().map(|m| m.full_name()).collect()
    }

    /// Look up by full name
    pub fn get(&self, full_name: &str) -> Option<Arc<Module>> {
        let inner = self.read();
        inner
            .by_identity
            .get(full_name)
            .map(|&index| Arc::clone(&inner.modules[index]))
    }

    /// First registered module with this short name
    pub fn find_by_name(&self, name: &str) -> Option<Arc<Module>> {
        self.read()
            .modules
            .iter()
            .find(|m| m.name() == name)
            .cloned()
    }

    pub fn contains(&self, full_name: &str) -> bool {
        self.read().by_identity.contains_key(full_name)
    }

    pub fn len(&self) -> usize {
        self.read().modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Push and insert happen after all checks; a poisoned table is still consistent.
    fn read(&self) -> RwLockReadGuard<'_, RegistryInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}
