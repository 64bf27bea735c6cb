//! Named bundles of selectors and aggregators

use super::aggregator::FeatureArrayAggregator;
use super::selector::FeatureSelector;
use crate::error::{FeatureSpecError, Result};
use crate::registry::BranchRegistry;

/// One output feature vector: scalar selectors followed by aggregators.
///
/// At least one of the two lists is non-empty.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionConfig {
    name: String,
    feature_selectors: Vec<FeatureSelector>,
    feature_array_aggregators: Vec<FeatureArrayAggregator>,
    total_feature_size: usize,
}

impl SelectionConfig {
    pub fn new(
        name: impl Into<String>,
        feature_selectors: Vec<FeatureSelector>,
        feature_array_aggregators: Vec<FeatureArrayAggregator>,
    ) -> Result<Self> {
        let name = name.into();
        if feature_selectors.is_empty() && feature_array_aggregators.is_empty() {
            return Err(FeatureSpecError::EmptySelection { name });
        }
        let total_feature_size = feature_array_aggregators
            .iter()
            .map(FeatureArrayAggregator::feature_width)
            .try_fold(feature_selectors.len(), usize::checked_add);
        let Some(total_feature_size) = total_feature_size else {
            return Err(FeatureSpecError::FeatureSizeOverflow { name });
        };

        Ok(Self {
            name,
            feature_selectors,
            feature_array_aggregators,
            total_feature_size,
        })
    }

    /// Degraded construction: a single-selector config built from the first
    /// candidate that resolves to a scalar branch.
    pub fn from_first_valid_scalar<S: AsRef<str>>(
        name: impl Into<String>,
        candidates: &[S],
        registry: &BranchRegistry,
    ) -> Result<Self> {
        let name = name.into();
        let selector = candidates
            .iter()
            .find_map(|candidate| FeatureSelector::resolve(candidate.as_ref(), registry).ok());

        match selector {
            Some(selector) => {
                tracing::warn!(
                    "Selection '{}' rebuilt from fallback scalar '{}'",
                    name,
                    selector.name()
                );
                Self::new(name, vec![selector], Vec::new())
            }
            None => Err(FeatureSpecError::EmptySelection { name }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn feature_selectors(&self) -> &[FeatureSelector] {
        &self.feature_selectors
    }

    pub fn feature_array_aggregators(&self) -> &[FeatureArrayAggregator] {
        &self.feature_array_aggregators
    }

    /// Width of the flattened output vector
    pub fn total_feature_size(&self) -> usize {
        self.total_feature_size
    }
}

impl std::fmt::Display for SelectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "SelectionConfig(name='{}', feature_selectors={}, feature_array_aggregators={})",
            self.name,
            self.feature_selectors.len(),
            self.feature_array_aggregators.len()
        )
    }
}
