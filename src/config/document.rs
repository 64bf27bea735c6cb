//! Persisted task config format
//!
//! These are plain serde mirrors of the model. Writing always produces the
//! canonical shape:
//!
//! ```json
//! {
//!   "event_filters": [{"branch_name": "...", "min_value": 0.0, "max_value": null}],
//!   "input": {
//!     "name": "Input",
//!     "feature_selectors": [{"branch_name": "..."}],
//!     "feature_array_aggregators": [{
//!       "input_branches": [{"branch_name": "..."}],
//!       "filter_branches": [{"branch_name": "...", "min_value": 1000.0, "max_value": null}],
//!       "sort_by_branch": {"branch_name": "..."},
//!       "min_length": 1,
//!       "max_length": 100
//!     }]
//!   },
//!   "labels": []
//! }
//! ```
//!
//! Reading is lenient: a branch entry may be a bare string, the branch key
//! may be spelled `branch`, and bounds may be spelled `min` / `max`. Nothing
//! here is validated against the registry; see [`super::builder`].

use crate::selection::{
    FeatureArrayAggregator, Filter, KindMarker, SelectionConfig, Selector, DEFAULT_MAX_LENGTH,
    DEFAULT_MIN_LENGTH,
};
use serde::{Deserialize, Serialize};

/// Top-level persisted document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskConfigDocument {
    #[serde(default)]
    pub event_filters: Vec<FilterEntry>,

    pub input: SelectionDocument,

    #[serde(default)]
    pub labels: Vec<SelectionDocument>,
}

/// One selection config
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionDocument {
    #[serde(default = "default_selection_name")]
    pub name: String,

    #[serde(default)]
    pub feature_selectors: Vec<BranchEntry>,

    #[serde(default)]
    pub feature_array_aggregators: Vec<AggregatorDocument>,
}

fn default_selection_name() -> String {
    "Selection".to_string()
}

/// Reference to a branch by name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BranchEntryRepr")]
pub struct BranchEntry {
    pub branch_name: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BranchEntryRepr {
    Name(String),
    Entry {
        #[serde(default, alias = "branch")]
        branch_name: Option<String>,
    },
}

impl From<BranchEntryRepr> for BranchEntry {
    fn from(repr: BranchEntryRepr) -> Self {
        match repr {
            BranchEntryRepr::Name(name) => Self {
                branch_name: Some(name),
            },
            BranchEntryRepr::Entry { branch_name } => Self { branch_name },
        }
    }
}

impl BranchEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            branch_name: Some(name.into()),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.branch_name.as_deref().filter(|name| !name.is_empty())
    }
}

impl From<&str> for BranchEntry {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl<K: KindMarker> From<&Selector<K>> for BranchEntry {
    fn from(selector: &Selector<K>) -> Self {
        Self::new(selector.name())
    }
}

/// A branch with optional inclusive bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterEntry {
    #[serde(default, alias = "branch")]
    pub branch_name: Option<String>,

    #[serde(default, alias = "min")]
    pub min_value: Option<f64>,

    #[serde(default, alias = "max")]
    pub max_value: Option<f64>,
}

impl FilterEntry {
    pub fn new(name: impl Into<String>, min_value: Option<f64>, max_value: Option<f64>) -> Self {
        Self {
            branch_name: Some(name.into()),
            min_value,
            max_value,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.branch_name.as_deref().filter(|name| !name.is_empty())
    }
}

impl<K: KindMarker> From<&Filter<K>> for FilterEntry {
    fn from(filter: &Filter<K>) -> Self {
        Self::new(filter.name(), filter.min_value(), filter.max_value())
    }
}

/// One feature array aggregator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatorDocument {
    #[serde(default)]
    pub input_branches: Vec<BranchEntry>,

    #[serde(default)]
    pub filter_branches: Vec<FilterEntry>,

    #[serde(default)]
    pub sort_by_branch: Option<BranchEntry>,

    #[serde(default = "default_min_length")]
    pub min_length: i64,

    #[serde(default = "default_max_length")]
    pub max_length: i64,
}

fn default_min_length() -> i64 {
    DEFAULT_MIN_LENGTH
}

fn default_max_length() -> i64 {
    DEFAULT_MAX_LENGTH
}

impl Default for AggregatorDocument {
    fn default() -> Self {
        Self {
            input_branches: Vec::new(),
            filter_branches: Vec::new(),
            sort_by_branch: None,
            min_length: DEFAULT_MIN_LENGTH,
            max_length: DEFAULT_MAX_LENGTH,
        }
    }
}

impl From<&FeatureArrayAggregator> for AggregatorDocument {
    fn from(aggregator: &FeatureArrayAggregator) -> Self {
        Self {
            input_branches: aggregator
                .input_branches()
                .iter()
                .map(BranchEntry::from)
                .collect(),
            filter_branches: aggregator
                .filter_branches()
                .iter()
                .map(FilterEntry::from)
                .collect(),
            sort_by_branch: aggregator.sort_by_branch().map(BranchEntry::from),
            min_length: aggregator.min_length() as i64,
            max_length: aggregator.max_length() as i64,
        }
    }
}

impl From<&SelectionConfig> for SelectionDocument {
    fn from(config: &SelectionConfig) -> Self {
        Self {
            name: config.name().to_string(),
            feature_selectors: config
                .feature_selectors()
                .iter()
                .map(BranchEntry::from)
                .collect(),
            feature_array_aggregators: config
                .feature_array_aggregators()
                .iter()
                .map(AggregatorDocument::from)
                .collect(),
        }
    }
}
