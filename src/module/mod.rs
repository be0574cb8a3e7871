//! Module system for typefinder
//!
//! Discovers module files on disk, loads the ones accepted by the naming
//! policy into a shared registry, and answers capability queries over the
//! loaded type declarations.
//!
//! ## Architecture
//!
//! - **Naming policy**: skip/restrict regexes evaluated against module full names
//! - **Registry**: identity-keyed, insertion-ordered, idempotent
//! - **Loader**: cheap identity read, dedup and policy checks, then full load
//! - **Discovery**: root directories plus one level of subdirectories
//! - **Indexer**: transitive, generic-aware capability matching

pub mod filesystem;
pub mod finder;
pub mod indexer;
pub mod loader;
pub mod registry;
pub mod runtime;
pub mod traits;
pub mod types;
pub mod validation;

pub use filesystem::{FileProvider, LocalFileProvider};
pub use finder::TypeFinder;
pub use indexer::{IntrospectionFailure, QueryResult, TypeIndexer};
pub use loader::{LoadOutcome, ModuleLoader};
pub use registry::{DirectoryScanner, DiscoveredModule, ModuleManifest, ModuleRegistry, ScanReport};
pub use runtime::{HostRuntime, ModuleRuntime};
pub use traits::{Module, ModuleBuilder, ModuleError, ModuleIdentity, ModuleSource, ModuleState};
pub use types::{
    Capability, CapabilityQuery, TemplateKey, TypeDeclaration, TypeDescriptor, TypeKind, TypeRef,
};
pub use validation::PatternFilter;
