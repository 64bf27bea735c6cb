//! Core data types for hep-featurespec
//!
//! This module contains the small value types shared by the registry and the
//! selection model.
//!
//! # Main Types
//!
//! - [`BranchKind`] - Scalar / array classification derived from a shape
//! - [`BranchStatus`] - Validity marker stored in the branch index
//! - [`ValueRange`] - Optional min/max pair used by name-based builders
//!
//! # Shapes
//!
//! Branch shapes are stored in the index either as integer lists or as
//! textual tuples such as `"()"`, `"(-1,)"` or `"(-1, 4)"`. [`parse_shape`]
//! accepts only that bounded grammar; anything else yields no shape and the
//! branch is classified as [`BranchKind::Unknown`].

use serde::{Deserialize, Serialize};

/// Scalar/array classification of a branch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BranchKind {
    /// Missing or unparseable shape
    #[default]
    Unknown,
    /// One value per event
    Scalar,
    /// Variable-length array per event
    Array,
}

impl BranchKind {
    /// Classify a parsed shape.
    ///
    /// An empty shape or `(0,)` is a scalar, any other shape is an array and
    /// a missing shape is unknown.
    pub fn from_shape(shape: Option<&[i64]>) -> Self {
        match shape {
            None => BranchKind::Unknown,
            Some([]) | Some([0]) => BranchKind::Scalar,
            Some(_) => BranchKind::Array,
        }
    }

    /// Returns true for the kinds a selector or filter can wrap
    pub fn is_selectable(&self) -> bool {
        !matches!(self, BranchKind::Unknown)
    }
}

impl std::fmt::Display for BranchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BranchKind::Unknown => write!(f, "unknown"),
            BranchKind::Scalar => write!(f, "scalar"),
            BranchKind::Array => write!(f, "array"),
        }
    }
}

/// Validity marker recorded by the index generator
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum BranchStatus {
    #[default]
    Success,
    /// Anything other than `"success"`, kept verbatim for diagnostics
    Failed(String),
}

impl BranchStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, BranchStatus::Success)
    }
}

impl From<&str> for BranchStatus {
    fn from(value: &str) -> Self {
        if value == "success" {
            BranchStatus::Success
        } else {
            BranchStatus::Failed(value.to_string())
        }
    }
}

impl std::fmt::Display for BranchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BranchStatus::Success => write!(f, "success"),
            BranchStatus::Failed(status) => write!(f, "{}", status),
        }
    }
}

/// Optional inclusive bounds, as written in name-based task specs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct ValueRange {
    #[serde(default, alias = "min_value")]
    pub min: Option<f64>,
    #[serde(default, alias = "max_value")]
    pub max: Option<f64>,
}

impl ValueRange {
    pub fn new(min: Option<f64>, max: Option<f64>) -> Self {
        Self { min, max }
    }

    pub fn at_least(min: f64) -> Self {
        Self::new(Some(min), None)
    }

    pub fn at_most(max: f64) -> Self {
        Self::new(None, Some(max))
    }

    pub fn between(min: f64, max: f64) -> Self {
        Self::new(Some(min), Some(max))
    }

    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }
}

/// Parse a textual shape such as `"(-1, 4)"`.
///
/// Grammar: optional `(` (or `[`) with its matching closer, comma-separated
/// integers, optional trailing comma. Returns `None` for anything else.
pub fn parse_shape(text: &str) -> Option<Vec<i64>> {
    let trimmed = text.trim();
    let inner = if let Some(rest) = trimmed.strip_prefix('(') {
        rest.strip_suffix(')')?
    } else if let Some(rest) = trimmed.strip_prefix('[') {
        rest.strip_suffix(']')?
    } else {
        trimmed
    };

    let inner = inner.trim();
    if inner.is_empty() {
        return Some(Vec::new());
    }

    let mut parts: Vec<&str> = inner.split(',').map(str::trim).collect();
    // A single trailing comma is allowed: "(10,)"
    if parts.len() > 1 && parts.last() == Some(&"") {
        parts.pop();
    }

    parts
        .into_iter()
        .map(|part| {
            if part.is_empty() {
                None
            } else {
                part.parse::<i64>().ok()
            }
        })
        .collect()
}

/// Render a shape the way it is written in the index, e.g. `(-1,)`
pub fn format_shape(shape: &[i64]) -> String {
    match shape {
        [] => "()".to_string(),
        [single] => format!("({},)", single),
        dims => {
            let parts: Vec<String> = dims.iter().map(|d| d.to_string()).collect();
            format!("({})", parts.join(", "))
        }
    }
}
