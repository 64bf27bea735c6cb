//! Branch registry
//!
//! Read-only lookup from a full branch name (`"Category.feature"`) to its
//! shape, dtype and status. Two sources are consulted, in order:
//!
//! 1. A [`DerivedFeatureProvider`] for computed branches. Derived features
//!    never touch the raw index and always resolve with `status = success`.
//! 2. The raw branch index, keyed by category then feature. Names without a
//!    `.` live under the [`OTHER_CATEGORY`] category.
//!
//! # Global registry
//!
//! Most callers use the process-wide registry returned by [`ensure_loaded`].
//! It is initialized once, on first access, from [`RegistrySettings`] (with
//! environment overrides) and is immutable afterwards, so concurrent readers
//! need no locking. A binary that wants different sources calls [`install`]
//! before anything else touches the registry.
//!
//! Failing to load the raw index is not fatal: the registry degrades to
//! derived features only and each raw lookup reports
//! [`FeatureSpecError::RegistryUnavailable`].
//!
//! # Index format
//!
//! ```json
//! {
//!   "generation_info": { "source": "..." },
//!   "branches": {
//!     "EventInfoAuxDyn": { "eventNumber": { "shape": "()", "dtype": "uint64", "status": "success" } }
//!   }
//! }
//! ```
//!
//! `physlite_branches` is read as a synonym for `branches`.

pub mod derived;

pub use derived::{DerivedFeature, DerivedFeatureCatalog, DerivedFeatureProvider};

use crate::config::settings::RegistrySettings;
use crate::error::{FeatureSpecError, Result};
use crate::types::{parse_shape, BranchKind, BranchStatus};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

/// Category used for branch names without a `.`
pub const OTHER_CATEGORY: &str = "Other";

/// Packaged branch index
const BUILTIN_BRANCH_INDEX: &str = include_str!("../../resources/branch_index.json");

static GLOBAL_REGISTRY: OnceLock<BranchRegistry> = OnceLock::new();

/// Split a branch name into `(category, feature)` on the first `.`
pub fn split_name(name: &str) -> (&str, &str) {
    match name.split_once('.') {
        Some((category, feature)) => (category, feature),
        None => (OTHER_CATEGORY, name),
    }
}

/// Shape as stored in index files: an integer list or a textual tuple
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawShape {
    Dims(Vec<i64>),
    Text(String),
}

impl RawShape {
    pub(crate) fn parse(self) -> Option<Vec<i64>> {
        match self {
            RawShape::Dims(dims) => Some(dims),
            RawShape::Text(text) => parse_shape(&text),
        }
    }
}

/// Where a resolved branch came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BranchOrigin {
    #[default]
    Raw,
    Derived,
}

impl std::fmt::Display for BranchOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BranchOrigin::Raw => write!(f, "raw"),
            BranchOrigin::Derived => write!(f, "derived"),
        }
    }
}

/// Metadata for one branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchInfo {
    /// Parsed shape; `None` when absent or unparseable
    pub shape: Option<Vec<i64>>,
    pub dtype: Option<String>,
    pub status: BranchStatus,
    pub origin: BranchOrigin,
}

impl BranchInfo {
    pub fn kind(&self) -> BranchKind {
        BranchKind::from_shape(self.shape.as_deref())
    }
}

impl From<DerivedFeature> for BranchInfo {
    fn from(feature: DerivedFeature) -> Self {
        Self {
            shape: Some(feature.shape),
            dtype: Some(feature.dtype),
            status: BranchStatus::Success,
            origin: BranchOrigin::Derived,
        }
    }
}

#[derive(Debug, Deserialize)]
struct IndexDocument {
    #[serde(alias = "physlite_branches")]
    branches: BTreeMap<String, BTreeMap<String, IndexEntry>>,
    #[serde(default)]
    generation_info: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct IndexEntry {
    #[serde(default)]
    shape: Option<RawShape>,
    #[serde(default)]
    dtype: Option<String>,
    #[serde(default = "default_status")]
    status: String,
}

fn default_status() -> String {
    "unknown".to_string()
}

/// The raw branch index: category -> feature -> metadata
#[derive(Debug, Clone, Default)]
pub struct RawIndex {
    categories: BTreeMap<String, BTreeMap<String, BranchInfo>>,
    generation_info: Option<serde_json::Value>,
}

impl RawIndex {
    /// Index embedded in the crate at build time
    pub fn builtin() -> Result<Self> {
        Self::from_json_str(BUILTIN_BRANCH_INDEX)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let document: IndexDocument = serde_json::from_str(json).map_err(|e| {
            FeatureSpecError::Config(format!("Failed to parse branch index: {}", e))
        })?;

        let categories = document
            .branches
            .into_iter()
            .map(|(category, features)| {
                let features = features
                    .into_iter()
                    .map(|(feature, entry)| {
                        let info = BranchInfo {
                            shape: entry.shape.and_then(RawShape::parse),
                            dtype: entry.dtype,
                            status: BranchStatus::from(entry.status.as_str()),
                            origin: BranchOrigin::Raw,
                        };
                        (feature, info)
                    })
                    .collect();
                (category, features)
            })
            .collect();

        Ok(Self {
            categories,
            generation_info: document.generation_info,
        })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            FeatureSpecError::Config(format!("Failed to read branch index {:?}: {}", path, e))
        })?;
        Self::from_json_str(&content)
    }

    pub fn get(&self, category: &str, feature: &str) -> Option<&BranchInfo> {
        self.categories.get(category)?.get(feature)
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }

    pub fn features(&self, category: &str) -> impl Iterator<Item = (&str, &BranchInfo)> {
        self.categories
            .get(category)
            .into_iter()
            .flat_map(|features| features.iter().map(|(name, info)| (name.as_str(), info)))
    }

    /// Total number of entries across all categories
    pub fn len(&self) -> usize {
        self.categories.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn generation_info(&self) -> Option<&serde_json::Value> {
        self.generation_info.as_ref()
    }
}

/// Branch lookup over a raw index and a derived-feature provider
pub struct BranchRegistry {
    index: Option<RawIndex>,
    derived: Box<dyn DerivedFeatureProvider>,
}

impl std::fmt::Debug for BranchRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BranchRegistry")
            .field("index_entries", &self.index.as_ref().map(RawIndex::len))
            .finish_non_exhaustive()
    }
}

impl BranchRegistry {
    pub fn new(index: Option<RawIndex>, derived: Box<dyn DerivedFeatureProvider>) -> Self {
        Self { index, derived }
    }

    /// A registry with no raw index and no derived features
    pub fn empty() -> Self {
        Self::new(None, Box::new(DerivedFeatureCatalog::empty()))
    }

    /// Registry over an index document, without derived features
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(Self::new(
            Some(RawIndex::from_json_str(json)?),
            Box::new(DerivedFeatureCatalog::empty()),
        ))
    }

    /// Replace the derived-feature provider
    pub fn with_derived(mut self, derived: impl DerivedFeatureProvider + 'static) -> Self {
        self.derived = Box::new(derived);
        self
    }

    /// Build a registry from settings.
    ///
    /// Never fails: an index that cannot be read or parsed is logged and the
    /// registry falls back to derived features only.
    pub fn load(settings: &RegistrySettings) -> Self {
        let index = match &settings.index_path {
            Some(path) => RawIndex::from_path(path),
            None => RawIndex::builtin(),
        };
        let index = match index {
            Ok(index) => {
                tracing::info!(
                    "Loaded branch index ({} branches) from {}",
                    index.len(),
                    settings.index_source()
                );
                Some(index)
            }
            Err(e) => {
                tracing::error!(
                    "Branch index unavailable, only derived features will resolve: {}",
                    e
                );
                None
            }
        };

        let derived = match &settings.derived_features_path {
            Some(path) => DerivedFeatureCatalog::from_path(path),
            None => DerivedFeatureCatalog::builtin(),
        };
        let derived = derived.unwrap_or_else(|e| {
            tracing::warn!("Failed to load derived features, using none: {}", e);
            DerivedFeatureCatalog::empty()
        });

        Self::new(index, Box::new(derived))
    }

    /// Whether the raw index loaded and holds at least one entry
    pub fn is_available(&self) -> bool {
        self.index.as_ref().is_some_and(|index| !index.is_empty())
    }

    pub fn index(&self) -> Option<&RawIndex> {
        self.index.as_ref()
    }

    /// Look up a branch.
    ///
    /// Entries whose status is not `success` are treated as absent.
    pub fn resolve(&self, name: &str) -> Result<BranchInfo> {
        if self.derived.is_derived(name) {
            return match self.derived.get(name) {
                Some(feature) => {
                    let info = BranchInfo::from(feature);
                    tracing::debug!("Branch '{}' resolved as derived ({})", name, info.kind());
                    Ok(info)
                }
                None => {
                    tracing::warn!(
                        "Branch '{}' flagged as derived but definition not found",
                        name
                    );
                    Err(FeatureSpecError::BranchNotFound(name.to_string()))
                }
            };
        }

        let index = match &self.index {
            Some(index) if !index.is_empty() => index,
            _ => return Err(FeatureSpecError::RegistryUnavailable(name.to_string())),
        };

        let (category, feature) = split_name(name);
        let Some(info) = index.get(category, feature) else {
            tracing::warn!(
                "Branch '{}' not found in branch index and is not a derived feature",
                name
            );
            return Err(FeatureSpecError::BranchNotFound(name.to_string()));
        };

        if !info.status.is_success() {
            tracing::warn!(
                "Branch '{}' has status '{}' in index, treating as invalid",
                name,
                info.status
            );
            return Err(FeatureSpecError::BranchNotFound(name.to_string()));
        }

        Ok(info.clone())
    }

    /// Whether `name` resolves to a selectable (scalar or array) branch
    pub fn contains(&self, name: &str) -> bool {
        self.resolve(name)
            .map(|info| info.kind().is_selectable())
            .unwrap_or(false)
    }
}

/// The process-wide registry, initialized on first access
pub fn ensure_loaded() -> &'static BranchRegistry {
    GLOBAL_REGISTRY
        .get_or_init(|| BranchRegistry::load(&RegistrySettings::default().with_env_overrides()))
}

/// Install `registry` as the process-wide registry.
///
/// Fails if the global registry was already initialized, either by an
/// earlier `install` or by a lookup through [`ensure_loaded`].
pub fn install(registry: BranchRegistry) -> Result<&'static BranchRegistry> {
    GLOBAL_REGISTRY.set(registry).map_err(|_| {
        FeatureSpecError::Config("Branch registry is already initialized".to_string())
    })?;
    Ok(ensure_loaded())
}
