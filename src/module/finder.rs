//! Type finder facade
//!
//! Wires the naming policy, registry, loader, scanner and indexer together
//! from a [`TypeFinderConfig`]. Hosts typically build one `TypeFinder` at
//! startup, run [`TypeFinder::load_matching_modules`] once, then query it for
//! implementations of their service capabilities.

use std::collections::HashSet;
use std::path::{Component, Path};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::TypeFinderConfig;
use crate::module::filesystem::{FileProvider, LocalFileProvider};
use crate::module::indexer::{QueryResult, TypeIndexer};
use crate::module::loader::ModuleLoader;
use crate::module::registry::{DirectoryScanner, ModuleRegistry, ScanReport};
use crate::module::runtime::ModuleRuntime;
use crate::module::traits::{Module, ModuleError};
use crate::module::types::{Capability, CapabilityQuery, TypeDescriptor};
use crate::module::validation::PatternFilter;

/// Module discovery and capability queries
pub struct TypeFinder {
    config: TypeFinderConfig,
    runtime: Arc<dyn ModuleRuntime>,
    registry: Arc<ModuleRegistry>,
    filter: Arc<PatternFilter>,
    scanner: DirectoryScanner,
}

impl TypeFinder {
    /// Create a finder over the local filesystem with a fresh registry
    pub fn new(config: TypeFinderConfig, runtime: Arc<dyn ModuleRuntime>) -> Result<Self, ModuleError> {
        Self::with_parts(
            config,
            runtime,
            Arc::new(LocalFileProvider),
            Arc::new(ModuleRegistry::new()),
        )
    }

    /// Create a finder from explicit collaborators
    ///
    /// Fails with a configuration error if either naming pattern is invalid or
    /// the runtime's entry point is not a single directory name.
    /// The runtime's resident modules are registered immediately.
    pub fn with_parts(
        config: TypeFinderConfig,
        runtime: Arc<dyn ModuleRuntime>,
        files: Arc<dyn FileProvider>,
        registry: Arc<ModuleRegistry>,
    ) -> Result<Self, ModuleError> {
        config.validate()?;
        check_entry_point(runtime.entry_point())?;
        let filter = Arc::new(PatternFilter::from_config(&config)?);

        for module in runtime.resident_modules() {
            registry.register(module);
        }

        let loader = Arc::new(ModuleLoader::new(
            Arc::clone(&runtime),
            Arc::clone(&registry),
            Arc::clone(&filter),
        ));
        let scanner = DirectoryScanner::new(files, loader, runtime.entry_point())
            .with_file_pattern(config.module_file_pattern.clone())
            .with_excluded_directories(config.excluded_directories.clone());

        Ok(Self {
            config,
            runtime,
            registry,
            filter,
            scanner,
        })
    }

    /// Scan the configured root directories
    pub fn load_matching_modules(&self) -> ScanReport {
        self.scanner.scan(&self.config.root_directories)
    }

    /// Scan arbitrary root directories
    pub fn scan<P: AsRef<Path>>(&self, roots: &[P]) -> ScanReport {
        self.scanner.scan(roots)
    }

    /// Modules taking part in queries
    ///
    /// Registered modules accepted by the naming policy (when
    /// `load_resident_modules` is set), then every configured module name,
    /// deduplicated by full name. Configured names bypass the naming policy;
    /// names not yet registered are resolved through the runtime and
    /// registered.
    pub fn modules(&self) -> Result<Vec<Arc<Module>>, ModuleError> {
        let mut seen = HashSet::new();
        let mut modules = Vec::new();

        if self.config.load_resident_modules {
            for module in self.registry.all() {
                let full_name = module.full_name();
                if !self.filter.is_eligible(&full_name) {
                    continue;
                }
                if seen.insert(full_name) {
                    modules.push(module);
                }
            }
        }

        for name in &self.config.module_names {
            let module = self.resolve_named(name.trim())?;
            if seen.insert(module.full_name()) {
                modules.push(module);
            }
        }

        debug!("{} modules available for queries", modules.len());
        Ok(modules)
    }

    /// Run a query over [`modules`](Self::modules), returning matches and failures
    pub fn query(&self, query: &CapabilityQuery) -> Result<QueryResult, ModuleError> {
        let modules = self.modules()?;
        Ok(TypeIndexer::find(query, &modules))
    }

    /// Types implementing `capability`
    ///
    /// Interfaces are never returned; `only_concrete_classes` also drops
    /// abstract classes. With `strict_introspection` any module that cannot be
    /// introspected fails the query, otherwise its types are left out.
    pub fn find_classes_of_type(
        &self,
        capability: &Capability,
        only_concrete_classes: bool,
    ) -> Result<Vec<TypeDescriptor>, ModuleError> {
        let modules = self.modules()?;
        self.find_classes_of_type_in(capability, &modules, only_concrete_classes)
    }

    /// Like [`find_classes_of_type`](Self::find_classes_of_type) over an explicit module set
    pub fn find_classes_of_type_in(
        &self,
        capability: &Capability,
        modules: &[Arc<Module>],
        only_concrete_classes: bool,
    ) -> Result<Vec<TypeDescriptor>, ModuleError> {
        let query = CapabilityQuery::new(capability.clone(), only_concrete_classes);
        let result = TypeIndexer::find(&query, modules);
        if self.config.strict_introspection {
            result.into_strict()
        } else {
            Ok(result.into_lenient())
        }
    }

    pub fn config(&self) -> &TypeFinderConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ModuleRegistry> {
        &self.registry
    }

    pub fn filter(&self) -> &PatternFilter {
        &self.filter
    }

    pub fn entry_point(&self) -> &str {
        self.scanner.entry_point()
    }

    fn resolve_named(&self, name: &str) -> Result<Arc<Module>, ModuleError> {
        if let Some(module) = self
            .registry
            .get(name)
            .or_else(|| self.registry.find_by_name(name))
        {
            return Ok(module);
        }

        let module = Arc::new(self.runtime.load_by_name(name)?);
        if self.registry.register(Arc::clone(&module)) {
            info!("Loaded configured module {}", module.full_name());
            return Ok(module);
        }
        Ok(self
            .registry
            .get(&module.full_name())
            .unwrap_or(module))
    }
}

/// The entry point names the `<root>/<entry_point>` convention directory
fn check_entry_point(entry_point: &str) -> Result<(), ModuleError> {
    let mut components = Path::new(entry_point).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) if !entry_point.trim().is_empty() => Ok(()),
        _ => Err(ModuleError::InvalidConfig(format!(
            "entry point {:?} must be a single directory name",
            entry_point
        ))),
    }
}
