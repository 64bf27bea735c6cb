//! Runtime settings for hep-featurespec
//!
//! Settings control where the branch registry reads its data from and how
//! the command-line tool logs. They are separate from task configs, which
//! describe *what* to extract and are meant to be shared between runs.
//!
//! # Main Types
//!
//! - [`Settings`] - Top-level settings file (`settings.toml`)
//! - [`RegistrySettings`] - Branch index / derived-feature sources
//! - [`LoggingSettings`] - Log filter and optional log file
//!
//! # Environment
//!
//! [`RegistrySettings::with_env_overrides`] lets a deployment point at a
//! different index without a settings file:
//!
//! - `HEP_FEATURESPEC_BRANCH_INDEX` - path to a branch index JSON file
//! - `HEP_FEATURESPEC_DERIVED_FEATURES` - path to a derived-feature catalog

use crate::error::{FeatureSpecError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for the settings directory
pub const APP_ID: &str = "hep-featurespec";

/// Settings filename
pub const SETTINGS_FILE: &str = "settings.toml";

/// Environment variable overriding the branch index path
pub const BRANCH_INDEX_ENV: &str = "HEP_FEATURESPEC_BRANCH_INDEX";

/// Environment variable overriding the derived-feature catalog path
pub const DERIVED_FEATURES_ENV: &str = "HEP_FEATURESPEC_DERIVED_FEATURES";

/// Default tracing filter directive
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Get the path to the settings file
pub fn settings_path() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_ID).join(SETTINGS_FILE))
}

/// Top-level settings
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Settings {
    #[serde(default)]
    pub registry: RegistrySettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Settings {
    /// Load settings from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            FeatureSpecError::Config(format!("Failed to read settings {:?}: {}", path, e))
        })?;

        toml::from_str(&content).map_err(|e| {
            FeatureSpecError::Config(format!("Failed to parse settings {:?}: {}", path, e))
        })
    }

    /// Load settings from the default location, returning defaults on any error.
    ///
    /// Environment overrides are applied in both cases.
    pub fn load_or_default() -> Self {
        let mut settings = match settings_path() {
            Some(path) if path.exists() => Self::load(&path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load settings, using defaults: {}", e);
                Self::default()
            }),
            _ => Self::default(),
        };
        settings.registry = settings.registry.with_env_overrides();
        settings
    }

    /// Save settings as TOML
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                FeatureSpecError::Config(format!("Failed to create settings directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| FeatureSpecError::Config(format!("Failed to serialize settings: {}", e)))?;

        std::fs::write(path, content).map_err(|e| {
            FeatureSpecError::Config(format!("Failed to write settings {:?}: {}", path, e))
        })
    }
}

/// Sources for the branch registry.
///
/// `None` selects the resource packaged with the crate.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct RegistrySettings {
    /// Branch index JSON file
    #[serde(default)]
    pub index_path: Option<PathBuf>,

    /// Derived-feature catalog JSON file
    #[serde(default)]
    pub derived_features_path: Option<PathBuf>,
}

impl RegistrySettings {
    /// Apply `HEP_FEATURESPEC_*` environment overrides
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(path) = std::env::var_os(BRANCH_INDEX_ENV).filter(|v| !v.is_empty()) {
            self.index_path = Some(PathBuf::from(path));
        }
        if let Some(path) = std::env::var_os(DERIVED_FEATURES_ENV).filter(|v| !v.is_empty()) {
            self.derived_features_path = Some(PathBuf::from(path));
        }
        self
    }

    /// Human-readable description of the index source
    pub fn index_source(&self) -> String {
        match &self.index_path {
            Some(path) => format!("{:?}", path),
            None => "packaged resource".to_string(),
        }
    }
}

/// Logging configuration for the command-line tool
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub filter: String,

    /// Also write logs to this file
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            log_file: None,
        }
    }
}
