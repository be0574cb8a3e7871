//! Module validation
//!
//! Naming-policy filtering and manifest validation.

pub mod manifest_validator;
pub mod pattern_filter;

pub use manifest_validator::{ManifestValidator, ValidationResult};
pub use pattern_filter::{PatternFilter, DEFAULT_RESTRICT_PATTERN, DEFAULT_SKIP_PATTERN};
