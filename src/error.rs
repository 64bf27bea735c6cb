//! Error handling for hep-featurespec
//!
//! This module defines the crate error type and a Result alias for use
//! throughout the library. Construction-time invariant violations are hard
//! failures; the bulk loaders in [`crate::config`] decide which of them to
//! skip and which to propagate.

use crate::types::BranchKind;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for hep-featurespec operations
#[derive(Error, Debug)]
pub enum FeatureSpecError {
    /// Name absent from the registry and not a derived feature
    #[error("Invalid branch name: {0}")]
    BranchNotFound(String),

    /// Branch exists but has the wrong kind for the requested selector/filter
    #[error("Branch {branch} is {actual}, expected {expected}")]
    BranchTypeMismatch {
        branch: String,
        expected: BranchKind,
        actual: BranchKind,
    },

    /// A filter with neither bound set
    #[error("Filter on {branch} must specify at least one of min_value or max_value")]
    EmptyRange { branch: String },

    /// NaN or infinite filter bound; JSON cannot carry it
    #[error("Filter on {branch} has non-finite bound {value}")]
    NonFiniteBound { branch: String, value: f64 },

    /// Aggregator construction invariants
    #[error("Aggregator invariant violated: {0}")]
    Aggregator(#[from] AggregatorViolation),

    /// A selection config with no selectors and no aggregators
    #[error("Selection '{name}' needs at least one feature selector or aggregator")]
    EmptySelection { name: String },

    /// Flattened selection width does not fit in usize
    #[error("Selection '{name}' feature size overflows")]
    FeatureSizeOverflow { name: String },

    /// Structurally invalid persisted document
    #[error("Malformed task config: {0}")]
    MalformedConfig(String),

    /// Config file does not exist
    #[error("Configuration file not found: {0:?}")]
    ConfigNotFound(PathBuf),

    /// The raw branch index is not loaded and the branch is not derived
    #[error("Branch index unavailable and '{0}' is not a derived feature")]
    RegistryUnavailable(String),

    /// Errors related to settings and registry sources
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<FeatureSpecError>,
    },
}

/// The checks run by `FeatureArrayAggregator::new`, in order
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregatorViolation {
    #[error("at least one input branch must be provided")]
    EmptyInputs,

    #[error("min_length must be non-negative, got {0}")]
    NegativeMinLength(i64),

    #[error("max_length must be positive, got {0}")]
    NonPositiveMaxLength(i64),

    #[error("min_length ({min}) cannot be greater than max_length ({max})")]
    MinExceedsMax { min: i64, max: i64 },

    #[error("feature width for max_length {0} does not fit in usize")]
    WidthOverflow(i64),
}

impl FeatureSpecError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        FeatureSpecError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, with every context layer removed
    pub fn root(&self) -> &FeatureSpecError {
        match self {
            FeatureSpecError::WithContext { source, .. } => source.root(),
            other => other,
        }
    }

    /// True when a lookup failed because the name is unknown (as opposed to a
    /// missing index or a kind mismatch)
    pub fn is_not_found(&self) -> bool {
        matches!(self.root(), FeatureSpecError::BranchNotFound(_))
    }
}

impl From<serde_json::Error> for FeatureSpecError {
    fn from(err: serde_json::Error) -> Self {
        FeatureSpecError::Serialization(err.to_string())
    }
}

/// Result type alias for hep-featurespec operations
pub type Result<T> = std::result::Result<T, FeatureSpecError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}
