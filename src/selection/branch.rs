//! Validated branch handles

use crate::error::{FeatureSpecError, Result};
use crate::registry::{self, split_name, BranchOrigin, BranchRegistry};
use crate::types::{format_shape, BranchKind, BranchStatus};
use std::hash::{Hash, Hasher};

/// A branch name that resolved to a scalar or array entry.
///
/// Equality and hashing use the name only.
#[derive(Debug, Clone)]
pub struct Branch {
    name: String,
    category: String,
    feature: String,
    kind: BranchKind,
    shape: Option<Vec<i64>>,
    dtype: Option<String>,
    status: BranchStatus,
    origin: BranchOrigin,
}

impl Branch {
    /// Resolve `name` through the process-wide registry
    pub fn new(name: &str) -> Result<Self> {
        Self::resolve(name, registry::ensure_loaded())
    }

    /// Resolve `name` through an explicit registry.
    ///
    /// Fails with `BranchNotFound` for unknown names and for entries whose
    /// kind is unknown, and with `RegistryUnavailable` when the raw index is
    /// missing and the name is not derived.
    pub fn resolve(name: &str, registry: &BranchRegistry) -> Result<Self> {
        let info = registry.resolve(name)?;
        let kind = info.kind();
        if !kind.is_selectable() {
            tracing::warn!("Branch '{}' has no usable shape information", name);
            return Err(FeatureSpecError::BranchNotFound(name.to_string()));
        }

        let (category, feature) = split_name(name);
        Ok(Self {
            name: name.to_string(),
            category: category.to_string(),
            feature: feature.to_string(),
            kind,
            shape: info.shape,
            dtype: info.dtype,
            status: info.status,
            origin: info.origin,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn feature(&self) -> &str {
        &self.feature
    }

    pub fn kind(&self) -> BranchKind {
        self.kind
    }

    pub fn shape(&self) -> Option<&[i64]> {
        self.shape.as_deref()
    }

    pub fn dtype(&self) -> Option<&str> {
        self.dtype.as_deref()
    }

    pub fn status(&self) -> &BranchStatus {
        &self.status
    }

    pub fn origin(&self) -> BranchOrigin {
        self.origin
    }

    pub fn is_scalar(&self) -> bool {
        self.kind == BranchKind::Scalar
    }

    pub fn is_array(&self) -> bool {
        self.kind == BranchKind::Array
    }

    pub fn is_derived(&self) -> bool {
        self.origin == BranchOrigin::Derived
    }
}

impl PartialEq for Branch {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Branch {}

impl Hash for Branch {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl std::fmt::Display for Branch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.shape {
            Some(shape) => write!(
                f,
                "Branch({}, kind={}, shape={})",
                self.name,
                self.kind,
                format_shape(shape)
            ),
            None => write!(f, "Branch({}, kind={})", self.name, self.kind),
        }
    }
}
