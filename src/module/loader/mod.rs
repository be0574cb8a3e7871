//! Module loading
//!
//! Loads module files into the registry, one file at a time.

pub mod loader;

pub use loader::{LoadOutcome, ModuleLoader};
