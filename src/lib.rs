//! typefinder - dynamic module discovery and capability queries
//!
//! A host points typefinder at one or more plugin directories. Module files
//! found there are filtered by a naming policy, loaded into a shared
//! registry, and their declared types can then be queried by capability:
//! "which concrete classes implement `IHandler`" or "which implement any
//! `Handler<>`".
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use typefinder::{Capability, HostRuntime, TypeFinder, TypeFinderConfig};
//!
//! # fn main() -> Result<(), typefinder::ModuleError> {
//! let config = TypeFinderConfig {
//!     root_directories: vec!["./plugins".into()],
//!     ..TypeFinderConfig::default()
//! };
//! let finder = TypeFinder::new(config, Arc::new(HostRuntime::new()))?;
//! finder.load_matching_modules();
//!
//! for handler in finder.find_classes_of_type(&Capability::parse("Handler<>")?, true)? {
//!     println!("{} ({})", handler.type_ref, handler.module);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod module;
pub mod utils;

pub use config::{LoggingConfig, TypeFinderConfig};
pub use module::{
    Capability, CapabilityQuery, HostRuntime, Module, ModuleError, ModuleIdentity, ModuleRegistry,
    ModuleRuntime, QueryResult, ScanReport, TypeDescriptor, TypeFinder, TypeRef,
};
