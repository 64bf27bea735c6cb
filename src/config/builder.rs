//! Rebuilding the typed model from names
//!
//! Two entry points share this code:
//!
//! - **Persisted**: a [`TaskConfigDocument`] written by
//!   [`TaskConfig::save`](super::TaskConfig::save). Scalar selectors and
//!   event filters that no longer resolve are skipped, aggregator inputs
//!   that are not found are skipped, and everything else that fails
//!   validation is fatal.
//! - **Exploratory**: a [`TaskSpec`] of plain name lists. Any branch that is
//!   unknown or of the wrong kind is logged and dropped. An event filter
//!   with neither bound defaults to `min = 0`.
//!
//! Every branch is re-resolved through the registry and every constructor
//! re-runs its checks. A missing index ([`FeatureSpecError::RegistryUnavailable`])
//! is never skipped.

use super::document::{AggregatorDocument, FilterEntry, SelectionDocument};
use crate::error::{FeatureSpecError, Result, ResultExt};
use crate::registry::BranchRegistry;
use crate::selection::{
    FeatureArrayAggregator, FeatureArrayFilter, FeatureArraySelector, FeatureFilter,
    FeatureSelector, SelectionConfig,
};
use crate::types::ValueRange;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Name of the input selection built from a [`TaskSpec`]
pub const INPUT_SELECTION_NAME: &str = "Input";

/// Lower bound used for an exploratory event filter with neither bound
pub const DEFAULT_EVENT_FILTER_MIN: f64 = 0.0;

/// Name-based description of a task, as accepted by
/// [`TaskConfig::from_spec`](super::TaskConfig::from_spec).
///
/// Labels are positional: the i-th feature list pairs with the i-th
/// aggregator list and a missing side counts as empty.
///
/// ```toml
/// input_features = ["EventInfoAuxDyn.eventNumber"]
/// label_features = [["EventInfoAuxDyn.mcChannelNumber"]]
///
/// [event_filters]
/// "EventInfoAuxDyn.runNumber" = { min = 300000 }
///
/// [[input_array_aggregators]]
/// input_branches = ["InDetTrackParticlesAuxDyn.d0", "InDetTrackParticlesAuxDyn.z0"]
/// filter_branches = [{ branch = "derived.InDetTrackParticlesAuxDyn.pt", min = 1000.0 }]
/// sort_by_branch = { branch = "derived.InDetTrackParticlesAuxDyn.pt" }
/// max_length = 30
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    #[serde(default)]
    pub event_filters: BTreeMap<String, ValueRange>,

    #[serde(default)]
    pub input_features: Vec<String>,

    #[serde(default)]
    pub input_array_aggregators: Vec<AggregatorDocument>,

    #[serde(default)]
    pub label_features: Vec<Vec<String>>,

    #[serde(default)]
    pub label_array_aggregators: Vec<Vec<AggregatorDocument>>,
}

impl TaskSpec {
    /// Load a spec file, TOML or JSON by extension
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(FeatureSpecError::ConfigNotFound(path.to_path_buf()))
            }
            Err(e) => return Err(e.into()),
        };

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            serde_json::from_str(&content).map_err(|e| {
                FeatureSpecError::MalformedConfig(format!("{:?}: {}", path, e))
            })
        } else {
            toml::from_str(&content).map_err(|e| {
                FeatureSpecError::MalformedConfig(format!("{:?}: {}", path, e))
            })
        }
    }

    /// Number of label selections this spec produces
    pub fn label_count(&self) -> usize {
        self.label_features
            .len()
            .max(self.label_array_aggregators.len())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    Persisted,
    Exploratory,
}

/// Where in the model a branch name is used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    EventFilter,
    Selector,
    AggregatorInput,
    AggregatorFilter,
    SortBy,
}

impl Slot {
    fn label(self) -> &'static str {
        match self {
            Slot::EventFilter => "event_filters",
            Slot::Selector => "feature_selectors",
            Slot::AggregatorInput => "input_branches",
            Slot::AggregatorFilter => "filter_branches",
            Slot::SortBy => "sort_by_branch",
        }
    }
}

pub(crate) struct Reconstruction<'a> {
    registry: &'a BranchRegistry,
    mode: Mode,
}

impl<'a> Reconstruction<'a> {
    pub(crate) fn new(registry: &'a BranchRegistry, mode: Mode) -> Self {
        Self { registry, mode }
    }

    /// Whether a failed lookup in `slot` drops the entry instead of failing
    fn tolerates(&self, slot: Slot, err: &FeatureSpecError) -> bool {
        let not_found = match err.root() {
            FeatureSpecError::BranchNotFound(_) => true,
            FeatureSpecError::BranchTypeMismatch { .. } => false,
            _ => return false,
        };
        match (self.mode, slot) {
            (Mode::Exploratory, _) => true,
            (Mode::Persisted, Slot::EventFilter | Slot::Selector) => true,
            (Mode::Persisted, Slot::AggregatorInput) => not_found,
            (Mode::Persisted, Slot::AggregatorFilter | Slot::SortBy) => false,
        }
    }

    /// Keep `Ok`, drop tolerated failures, propagate the rest
    fn keep<T>(&self, slot: Slot, name: &str, result: Result<T>) -> Result<Option<T>> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(e) if self.tolerates(slot, &e) => {
                tracing::warn!("Skipping branch '{}' in {}: {}", name, slot.label(), e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    pub(crate) fn event_filters(&self, entries: &[FilterEntry]) -> Result<Vec<FeatureFilter>> {
        let mut filters = Vec::with_capacity(entries.len());
        for (i, entry) in entries.iter().enumerate() {
            let name = entry.name().ok_or_else(|| {
                FeatureSpecError::MalformedConfig(format!(
                    "event filter #{} is missing branch_name",
                    i
                ))
            })?;
            let range = ValueRange::new(entry.min_value, entry.max_value);
            if let Some(filter) = self.event_filter(name, range)? {
                filters.push(filter);
            }
        }
        Ok(filters)
    }

    pub(crate) fn event_filters_from_map(
        &self,
        ranges: &BTreeMap<String, ValueRange>,
    ) -> Result<Vec<FeatureFilter>> {
        let mut filters = Vec::with_capacity(ranges.len());
        for (name, range) in ranges {
            if let Some(filter) = self.event_filter(name, *range)? {
                filters.push(filter);
            }
        }
        Ok(filters)
    }

    fn event_filter(&self, name: &str, range: ValueRange) -> Result<Option<FeatureFilter>> {
        let range = if self.mode == Mode::Exploratory && range.is_unbounded() {
            tracing::debug!(
                "Event filter on '{}' has no bounds, using min={}",
                name,
                DEFAULT_EVENT_FILTER_MIN
            );
            ValueRange::at_least(DEFAULT_EVENT_FILTER_MIN)
        } else {
            range
        };

        let filter = FeatureFilter::resolve(name, self.registry, range.min, range.max);
        self.keep(Slot::EventFilter, name, filter)
    }

    pub(crate) fn selection(&self, document: &SelectionDocument) -> Result<SelectionConfig> {
        let names = document
            .feature_selectors
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                entry.name().ok_or_else(|| {
                    FeatureSpecError::MalformedConfig(format!(
                        "selection '{}' feature_selectors #{} is missing branch_name",
                        document.name, i
                    ))
                })
            })
            .collect::<Result<Vec<&str>>>()?;
        self.selection_from_parts(
            &document.name,
            names.as_slice(),
            &document.feature_array_aggregators,
        )
    }

    pub(crate) fn selection_from_parts<S: AsRef<str>>(
        &self,
        name: &str,
        feature_names: &[S],
        aggregators: &[AggregatorDocument],
    ) -> Result<SelectionConfig> {
        tracing::debug!(
            "Building selection '{}' from {} feature names and {} aggregators",
            name,
            feature_names.len(),
            aggregators.len()
        );

        let mut selectors = Vec::with_capacity(feature_names.len());
        for feature in feature_names {
            let feature = feature.as_ref();
            let selector = FeatureSelector::resolve(feature, self.registry);
            if let Some(selector) = self.keep(Slot::Selector, feature, selector)? {
                selectors.push(selector);
            }
        }

        let mut built = Vec::with_capacity(aggregators.len());
        for (i, document) in aggregators.iter().enumerate() {
            let aggregator = self
                .aggregator(i, document)
                .with_context(|| format!("selection '{}'", name))?;
            if let Some(aggregator) = aggregator {
                built.push(aggregator);
            }
        }

        // The fallback re-checks the same names with the same lookup that just
        // dropped them, so against a fixed registry it ends in EmptySelection.
        // It is the last stage of a persisted load, not a recovery path.
        match SelectionConfig::new(name, selectors, built) {
            Err(FeatureSpecError::EmptySelection { .. }) if self.mode == Mode::Persisted => {
                tracing::warn!(
                    "Selection '{}' is empty after validation, trying fallback scalars",
                    name
                );
                SelectionConfig::from_first_valid_scalar(name, feature_names, self.registry)
            }
            other => other,
        }
    }

    /// Rebuild aggregator `index`; `None` when no input survived
    pub(crate) fn aggregator(
        &self,
        index: usize,
        document: &AggregatorDocument,
    ) -> Result<Option<FeatureArrayAggregator>> {
        let mut inputs = Vec::with_capacity(document.input_branches.len());
        for entry in &document.input_branches {
            let name = self.required_name(index, Slot::AggregatorInput, entry.name())?;
            let selector = FeatureArraySelector::resolve(name, self.registry)
                .with_context(|| aggregator_context(index, Slot::AggregatorInput));
            if let Some(selector) = self.keep(Slot::AggregatorInput, name, selector)? {
                inputs.push(selector);
            }
        }

        let mut filters = Vec::with_capacity(document.filter_branches.len());
        for entry in &document.filter_branches {
            let name = self.required_name(index, Slot::AggregatorFilter, entry.name())?;
            let filter = FeatureArrayFilter::resolve(
                name,
                self.registry,
                entry.min_value,
                entry.max_value,
            )
            .with_context(|| aggregator_context(index, Slot::AggregatorFilter));
            if let Some(filter) = self.keep(Slot::AggregatorFilter, name, filter)? {
                filters.push(filter);
            }
        }

        let sort_by = match &document.sort_by_branch {
            Some(entry) => {
                let name = self.required_name(index, Slot::SortBy, entry.name())?;
                let selector = FeatureArraySelector::resolve(name, self.registry)
                    .with_context(|| aggregator_context(index, Slot::SortBy));
                self.keep(Slot::SortBy, name, selector)?
            }
            None => None,
        };

        if inputs.is_empty() {
            tracing::warn!(
                "Skipping aggregator #{} due to empty input_branches; \
                 its branch names may be invalid or of the wrong type",
                index
            );
            return Ok(None);
        }

        FeatureArrayAggregator::new(
            inputs,
            filters,
            sort_by,
            document.min_length,
            document.max_length,
        )
        .map(Some)
        .with_context(|| format!("aggregator #{}", index))
    }

    fn required_name<'n>(&self, index: usize, slot: Slot, name: Option<&'n str>) -> Result<&'n str> {
        name.ok_or_else(|| {
            FeatureSpecError::MalformedConfig(format!(
                "missing branch name in {} for aggregator #{}",
                slot.label(),
                index
            ))
        })
    }
}

fn aggregator_context(index: usize, slot: Slot) -> String {
    format!("aggregator #{} {}", index, slot.label())
}
