//! Configuration management for typefinder
//!
//! Handles configuration loading (TOML or JSON), defaults and validation.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::module::traits::ModuleError;
use crate::module::validation::{PatternFilter, DEFAULT_RESTRICT_PATTERN, DEFAULT_SKIP_PATTERN};

/// Discovery and query configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeFinderConfig {
    /// Root directories scanned for module files
    #[serde(default)]
    pub root_directories: Vec<PathBuf>,

    /// Modules loaded by name regardless of the scan
    #[serde(default)]
    pub module_names: Vec<String>,

    /// Regex of module full names never loaded (case-insensitive, wins over restrict)
    #[serde(default = "default_skip_pattern")]
    pub skip_pattern: String,

    /// Regex a module full name must match to be loaded (case-insensitive)
    #[serde(default = "default_restrict_pattern")]
    pub restrict_pattern: String,

    /// Include modules compiled into the host in queries
    #[serde(default = "default_true")]
    pub load_resident_modules: bool,

    /// Glob selecting module files inside scanned directories
    #[serde(default = "default_module_file_pattern")]
    pub module_file_pattern: String,

    /// Subdirectory names never scanned (case-insensitive)
    #[serde(default = "default_excluded_directories")]
    pub excluded_directories: Vec<String>,

    /// Fail queries when any module cannot be introspected
    #[serde(default = "default_true")]
    pub strict_introspection: bool,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log filter (e.g. "info", "typefinder=debug"); RUST_LOG takes precedence
    #[serde(default)]
    pub filter: Option<String>,

    /// Emit JSON lines (requires the `json-logging` feature)
    #[serde(default)]
    pub json_format: bool,
}

fn default_true() -> bool {
    true
}

fn default_skip_pattern() -> String {
    DEFAULT_SKIP_PATTERN.to_string()
}

fn default_restrict_pattern() -> String {
    DEFAULT_RESTRICT_PATTERN.to_string()
}

fn default_module_file_pattern() -> String {
    "*.module".to_string()
}

fn default_excluded_directories() -> Vec<String> {
    vec!["bin".to_string()]
}

impl Default for TypeFinderConfig {
    fn default() -> Self {
        Self {
            root_directories: Vec::new(),
            module_names: Vec::new(),
            skip_pattern: default_skip_pattern(),
            restrict_pattern: default_restrict_pattern(),
            load_resident_modules: true,
            module_file_pattern: default_module_file_pattern(),
            excluded_directories: default_excluded_directories(),
            strict_introspection: true,
            logging: LoggingConfig::default(),
        }
    }
}

impl TypeFinderConfig {
    /// Load configuration from TOML file
    pub fn from_toml_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: TypeFinderConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from JSON file
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: TypeFinderConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Load from a `.json` file, anything else is read as TOML
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let is_json = path
            .extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_file(path)
        } else {
            Self::from_toml_file(path)
        }
    }

    /// Save configuration to JSON file
    pub fn to_json_file(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check that both naming patterns compile and the file pattern is usable
    pub fn validate(&self) -> Result<(), ModuleError> {
        PatternFilter::from_config(self)?;
        if self.module_file_pattern.trim().is_empty() {
            return Err(ModuleError::InvalidConfig(
                "module_file_pattern must not be empty".to_string(),
            ));
        }
        if let Some(name) = self.module_names.iter().find(|n| n.trim().is_empty()) {
            return Err(ModuleError::InvalidConfig(format!(
                "module_names contains a blank entry: {:?}",
                name
            )));
        }
        Ok(())
    }
}
