//! Derived (computed) features
//!
//! Derived features are branches computed from other branches rather than
//! read from the raw event schema. The registry consults a
//! [`DerivedFeatureProvider`] before the raw index and never builds the
//! definitions itself. [`DerivedFeatureCatalog`] is the data-driven provider
//! shipped with the crate.

use super::RawShape;
use crate::error::{FeatureSpecError, Result};
use crate::types::BranchKind;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Packaged derived-feature definitions
const BUILTIN_DERIVED_FEATURES: &str = include_str!("../../resources/derived_features.json");

/// Shape and dtype of a derived feature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedFeature {
    pub shape: Vec<i64>,
    pub dtype: String,
    pub description: Option<String>,
}

impl DerivedFeature {
    pub fn new(shape: Vec<i64>, dtype: impl Into<String>) -> Self {
        Self {
            shape,
            dtype: dtype.into(),
            description: None,
        }
    }

    pub fn kind(&self) -> BranchKind {
        BranchKind::from_shape(Some(&self.shape))
    }
}

/// Source of derived-feature definitions
#[cfg_attr(test, mockall::automock)]
pub trait DerivedFeatureProvider: Send + Sync {
    /// Whether `name` is claimed by this provider
    fn is_derived(&self, name: &str) -> bool;

    /// Definition for `name`, if any
    fn get(&self, name: &str) -> Option<DerivedFeature>;
}

#[derive(Debug, Deserialize)]
struct CatalogDocument {
    #[serde(default)]
    derived_features: BTreeMap<String, CatalogEntry>,
}

#[derive(Debug, Deserialize)]
struct CatalogEntry {
    shape: RawShape,
    #[serde(default = "default_dtype")]
    dtype: String,
    #[serde(default)]
    description: Option<String>,
}

fn default_dtype() -> String {
    "float32".to_string()
}

/// Name-keyed table of derived features
#[derive(Debug, Clone, Default)]
pub struct DerivedFeatureCatalog {
    features: BTreeMap<String, DerivedFeature>,
}

impl DerivedFeatureCatalog {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Catalog embedded in the crate at build time
    pub fn builtin() -> Result<Self> {
        Self::from_json_str(BUILTIN_DERIVED_FEATURES)
    }

    /// Parse a catalog document: `{"derived_features": {name: {shape, dtype}}}`
    pub fn from_json_str(json: &str) -> Result<Self> {
        let document: CatalogDocument = serde_json::from_str(json).map_err(|e| {
            FeatureSpecError::Config(format!("Failed to parse derived features: {}", e))
        })?;

        let mut features = BTreeMap::new();
        for (name, entry) in document.derived_features {
            let shape = entry.shape.parse().ok_or_else(|| {
                FeatureSpecError::Config(format!(
                    "Derived feature '{}' has unparseable shape",
                    name
                ))
            })?;
            features.insert(
                name,
                DerivedFeature {
                    shape,
                    dtype: entry.dtype,
                    description: entry.description,
                },
            );
        }

        Ok(Self { features })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            FeatureSpecError::Config(format!(
                "Failed to read derived features {:?}: {}",
                path, e
            ))
        })?;
        Self::from_json_str(&content)
    }

    /// Register a definition, replacing any previous one with the same name
    pub fn insert(&mut self, name: impl Into<String>, feature: DerivedFeature) {
        self.features.insert(name.into(), feature);
    }

    pub fn with_feature(mut self, name: impl Into<String>, feature: DerivedFeature) -> Self {
        self.insert(name, feature);
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.features.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

impl DerivedFeatureProvider for DerivedFeatureCatalog {
    fn is_derived(&self, name: &str) -> bool {
        self.features.contains_key(name)
    }

    fn get(&self, name: &str) -> Option<DerivedFeature> {
        self.features.get(name).cloned()
    }
}
