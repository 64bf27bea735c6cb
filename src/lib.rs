//! # hep-featurespec: Feature selection configs for HEP event data
//!
//! Describes *which* branches of an event-data schema become the input and
//! label tensors of a model, and persists that description so it can be
//! validated again against the branch index of a later run.
//!
//! ## Architecture
//!
//! - **Registry**: read-only branch metadata (shape, dtype, status) from a
//!   packaged index plus computed "derived" features
//! - **Selection**: typed, validated selectors, filters, aggregators and
//!   selection configs built on top of registry lookups
//! - **Config**: the persisted [`TaskConfig`], name-based [`TaskSpec`]s and
//!   runtime [`Settings`]
//!
//! Nothing here reads event data; the model only describes the output
//! layout and its width.
//!
//! ## Example
//!
//! ```ignore
//! use hep_featurespec::{
//!     registry,
//!     selection::{FeatureArrayAggregator, FeatureArraySelector, FeatureSelector, SelectionConfig},
//! };
//!
//! let registry = registry::ensure_loaded();
//! let tracks = FeatureArrayAggregator::new(
//!     vec![FeatureArraySelector::resolve("InDetTrackParticlesAuxDyn.d0", registry)?],
//!     vec![],
//!     None,
//!     1,
//!     30,
//! )?;
//! let input = SelectionConfig::new(
//!     "Input",
//!     vec![FeatureSelector::resolve("EventInfoAuxDyn.eventNumber", registry)?],
//!     vec![tracks],
//! )?;
//! assert_eq!(input.total_feature_size(), 1 + 30);
//! ```

pub mod config;
pub mod error;
pub mod registry;
pub mod selection;
pub mod types;

// Re-export commonly used types
pub use config::{Settings, TaskConfig, TaskSpec};
pub use error::{FeatureSpecError, Result, ResultExt};
pub use registry::{BranchRegistry, DerivedFeatureProvider};
pub use selection::{
    Branch, FeatureArrayAggregator, FeatureArrayFilter, FeatureArraySelector, FeatureFilter,
    FeatureSelector, SelectionConfig,
};
pub use types::{BranchKind, ValueRange};
