//! Module registry and discovery
//!
//! Handles module discovery, manifest parsing, dependency checks and the
//! process-wide table of loaded modules.

pub mod dependencies;
pub mod discovery;
pub mod manifest;
pub mod module_registry;

pub use dependencies::{DependencyReport, ModuleDependencies};
pub use discovery::{DirectoryScanner, DiscoveredModule, ScanReport, README_FILE_NAME};
pub use manifest::{ModuleHeader, ModuleManifest};
pub use module_registry::ModuleRegistry;
