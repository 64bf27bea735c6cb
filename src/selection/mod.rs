//! Typed selection model
//!
//! Everything here is built bottom-up and validated on construction:
//!
//! ```text
//! registry -> Branch -> Selector / Filter -> FeatureArrayAggregator -> SelectionConfig
//! ```
//!
//! Values are immutable once built and own their children, so a finished
//! [`SelectionConfig`] can be moved to another thread freely.

pub mod aggregator;
pub mod branch;
pub mod config;
pub mod selector;

pub use aggregator::{FeatureArrayAggregator, DEFAULT_MAX_LENGTH, DEFAULT_MIN_LENGTH};
pub use branch::Branch;
pub use config::SelectionConfig;
pub use selector::{
    ArrayKind, FeatureArrayFilter, FeatureArraySelector, FeatureFilter, FeatureSelector, Filter,
    KindMarker, ScalarKind, Selector,
};
