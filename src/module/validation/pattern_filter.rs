//! Naming policy for module eligibility
//!
//! A module is eligible iff its full name does NOT match the skip pattern and
//! DOES match the restrict pattern. Both are case-insensitive regular
//! expressions; the skip pattern always wins.

use regex::{Regex, RegexBuilder};

use crate::config::TypeFinderConfig;
use crate::module::traits::ModuleError;

/// Module name prefixes that never contain host capabilities
pub const DEFAULT_SKIP_PATTERN: &str = "^std\\b|^core\\b|^alloc\\b|^proc_macro|^test\\b|^tokio|^futures|^serde|^tracing|^log\\b|^regex|^toml|^thiserror|^anyhow|^clap|^libc\\b|^rand\\b|^hyper|^http\\b|^bytes\\b|^mio\\b|^once_cell|^lazy_static|^parking_lot|^crossbeam|^rayon|^chrono|^uuid";

/// Default restrict pattern (everything)
pub const DEFAULT_RESTRICT_PATTERN: &str = ".*";

/// Compiled skip/restrict naming policy
#[derive(Debug, Clone)]
pub struct PatternFilter {
    /// `None` when the skip pattern is empty (nothing skipped)
    skip: Option<Regex>,
    restrict: Regex,
}

impl PatternFilter {
    /// Compile a naming policy
    ///
    /// An invalid pattern is a configuration error and fails immediately.
    pub fn new(skip: &str, restrict: &str) -> Result<Self, ModuleError> {
        let skip = if skip.trim().is_empty() {
            None
        } else {
            Some(compile(skip)?)
        };
        let restrict = if restrict.trim().is_empty() {
            compile(DEFAULT_RESTRICT_PATTERN)?
        } else {
            compile(restrict)?
        };
        Ok(Self { skip, restrict })
    }

    /// Policy built from the default patterns
    pub fn with_defaults() -> Result<Self, ModuleError> {
        Self::new(DEFAULT_SKIP_PATTERN, DEFAULT_RESTRICT_PATTERN)
    }

    pub fn from_config(config: &TypeFinderConfig) -> Result<Self, ModuleError> {
        Self::new(&config.skip_pattern, &config.restrict_pattern)
    }

    /// Whether a module with this full name may be loaded or queried
    pub fn is_eligible(&self, module_name: &str) -> bool {
        if self.is_skipped(module_name) {
            return false;
        }
        self.restrict.is_match(module_name)
    }

    /// Whether the name hits the skip (deny) pattern
    pub fn is_skipped(&self, module_name: &str) -> bool {
        self.skip
            .as_ref()
            .map_or(false, |skip| skip.is_match(module_name))
    }

    pub fn skip_pattern(&self) -> Option<&str> {
        self.skip.as_ref().map(Regex::as_str)
    }

    pub fn restrict_pattern(&self) -> &str {
        self.restrict.as_str()
    }
}

fn compile(pattern: &str) -> Result<Regex, ModuleError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|source| ModuleError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })
}
