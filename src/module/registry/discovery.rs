//! Module discovery
//!
//! Scans root directories (and their immediate subdirectories) for module
//! files and hands each candidate to the [`ModuleLoader`].
//!
//! A root is only scanned once the plugin convention directory
//! `<root>/<entry point>` exists. On first run the scanner creates it, drops a
//! `readme.text` marker into the root and moves on to the next root.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::module::filesystem::FileProvider;
use crate::module::loader::ModuleLoader;
use crate::module::registry::ModuleRegistry;
use crate::module::traits::{Module, ModuleIdentity, ModuleState};

/// Marker file written into a freshly bootstrapped root
pub const README_FILE_NAME: &str = "readme.text";

/// Default glob for module files
pub const DEFAULT_MODULE_FILE_PATTERN: &str = "*.module";

const README_CONTENTS: &str = "This directory contains modules. The host loads every module file found \
here and in the immediate subdirectories of this directory.\n";

/// One candidate module file and what happened to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredModule {
    /// Module file path
    pub path: PathBuf,
    /// Identity, if the file header could be read
    pub identity: Option<ModuleIdentity>,
    pub state: ModuleState,
}

/// Result of scanning a set of root directories
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    /// Modules loaded by this scan, in load order
    pub loaded: Vec<Arc<Module>>,
    /// Every candidate file, in scan order
    pub discovered: Vec<DiscoveredModule>,
    /// Roots that were bootstrapped instead of scanned
    pub bootstrapped: Vec<PathBuf>,
}

impl ScanReport {
    /// Candidate files that could not be loaded
    pub fn failures(&self) -> impl Iterator<Item = &DiscoveredModule> {
        self.discovered
            .iter()
            .filter(|d| matches!(d.state, ModuleState::Failed(_)))
    }

    pub fn loaded_names(&self) -> Vec<String> {
        self.loaded.iter().map(|m| m.full_name()).collect()
    }
}

/// Directory scanner
pub struct DirectoryScanner {
    files: Arc<dyn FileProvider>,
    loader: Arc<ModuleLoader>,
    registry: Arc<ModuleRegistry>,
    entry_point: String,
    file_pattern: String,
    excluded_directories: Vec<String>,
}

impl DirectoryScanner {
    /// Create a scanner; `entry_point` names the plugin convention directory
    pub fn new(
        files: Arc<dyn FileProvider>,
        loader: Arc<ModuleLoader>,
        entry_point: impl Into<String>,
    ) -> Self {
        let registry = Arc::clone(loader.registry());
        Self {
            files,
            loader,
            registry,
            entry_point: entry_point.into(),
            file_pattern: DEFAULT_MODULE_FILE_PATTERN.to_string(),
            excluded_directories: vec!["bin".to_string()],
        }
    }

    pub fn with_file_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.file_pattern = pattern.into();
        self
    }

    /// Subdirectory names never scanned (compared case-insensitively)
    pub fn with_excluded_directories<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_directories = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    /// Scan root directories, loading every eligible module found
    ///
    /// Never fails: unreadable directories and invalid module files are
    /// logged and skipped.
    pub fn scan<P: AsRef<Path>>(&self, roots: &[P]) -> ScanReport {
        let mut report = ScanReport::default();

        for root in roots {
            let root = root.as_ref();
            if root.to_string_lossy().trim().is_empty() {
                continue;
            }

            let known: HashSet<String> = self.registry.identities().into_iter().collect();

            let convention = root.join(&self.entry_point);
            if !self.files.directory_exists(&convention) {
                self.bootstrap(root, &convention, &mut report);
                continue;
            }

            info!("Discovering modules in {:?}", root);
            self.scan_directory(root, &known, &mut report);

            let subdirectories = match self.files.get_directories(root) {
                Ok(subdirectories) => subdirectories,
                Err(e) => {
                    warn!("Failed to list subdirectories of {:?}: {}", root, e);
                    continue;
                }
            };

            for subdirectory in subdirectories {
                if self.is_excluded(&subdirectory) {
                    debug!("Skipping excluded directory {:?}", subdirectory);
                    continue;
                }
                self.scan_directory(&subdirectory, &known, &mut report);
            }
        }

        info!(
            "Module scan complete: {} loaded, {} candidates, {} failed",
            report.loaded.len(),
            report.discovered.len(),
            report.failures().count()
        );
        report
    }

    fn scan_directory(&self, directory: &Path, known: &HashSet<String>, report: &mut ScanReport) {
        let files = match self.files.get_files(directory, &self.file_pattern) {
            Ok(files) => files,
            Err(e) => {
                warn!("Failed to read module directory {:?}: {}", directory, e);
                return;
            }
        };

        for path in files {
            match self.loader.load(&path, known) {
                Ok(outcome) => {
                    if let Some(module) = outcome.module() {
                        report.loaded.push(Arc::clone(module));
                    }
                    report.discovered.push(DiscoveredModule {
                        identity: Some(outcome.identity().clone()),
                        state: outcome.state(),
                        path,
                    });
                }
                Err(e) => {
                    warn!("Skipping module file {:?}: {}", path, e);
                    report.discovered.push(DiscoveredModule {
                        path,
                        identity: None,
                        state: ModuleState::Failed(e.to_string()),
                    });
                }
            }
        }
    }

    fn bootstrap(&self, root: &Path, convention: &Path, report: &mut ScanReport) {
        info!(
            "Plugin directory {:?} does not exist, creating it and skipping {:?}",
            convention, root
        );

        if let Err(e) = self.files.create_directory(convention) {
            warn!("Failed to create plugin directory {:?}: {}", convention, e);
            return;
        }

        let readme = root.join(README_FILE_NAME);
        if let Err(e) = self.files.write_all_text(&readme, README_CONTENTS) {
            warn!("Failed to write {:?}: {}", readme, e);
        }
        report.bootstrapped.push(root.to_path_buf());
    }

    fn is_excluded(&self, directory: &Path) -> bool {
        directory
            .file_name()
            .map(|name| name.to_string_lossy())
            .map_or(false, |name| {
                self.excluded_directories
                    .iter()
                    .any(|excluded| excluded.eq_ignore_ascii_case(&name))
            })
    }
}
