//! Task configuration for hep-featurespec
//!
//! A [`TaskConfig`] is the top-level, persisted description of one analysis
//! task: event-level filters, the input selection and zero or more label
//! selections.
//!
//! # Files
//!
//! - Task configs (`*.json`) - written by [`TaskConfig::save`], shared between runs
//! - Task specs (`*.toml` / `*.json`) - name lists for [`TaskConfig::from_spec`]
//! - `settings.toml` - runtime settings, see [`settings`]
//!
//! # Example
//!
//! ```ignore
//! use hep_featurespec::config::{TaskConfig, TaskSpec};
//!
//! let spec = TaskSpec::load("task.toml")?;
//! let config = TaskConfig::from_spec(&spec)?;
//! println!("input width: {}", config.input_size());
//! config.save("task.json")?;
//!
//! // Later: every branch is re-validated against the registry
//! let config = TaskConfig::load("task.json")?;
//! ```

pub mod builder;
pub mod document;
pub mod settings;

pub use builder::{TaskSpec, DEFAULT_EVENT_FILTER_MIN, INPUT_SELECTION_NAME};
pub use document::{
    AggregatorDocument, BranchEntry, FilterEntry, SelectionDocument, TaskConfigDocument,
};
pub use settings::*;

use crate::error::{FeatureSpecError, Result, ResultExt};
use crate::registry::{self, BranchRegistry};
use crate::selection::{FeatureFilter, SelectionConfig};
use crate::types::ValueRange;
use builder::{Mode, Reconstruction};
use std::collections::BTreeMap;
use std::path::Path;

/// Task config file extension
pub const TASK_CONFIG_EXTENSION: &str = "json";

/// Event filters plus input and label selections
#[derive(Debug, Clone, PartialEq)]
pub struct TaskConfig {
    event_filters: Vec<FeatureFilter>,
    input: SelectionConfig,
    labels: Vec<SelectionConfig>,
}

impl TaskConfig {
    pub fn new(
        event_filters: Vec<FeatureFilter>,
        input: SelectionConfig,
        labels: Vec<SelectionConfig>,
    ) -> Self {
        Self {
            event_filters,
            input,
            labels,
        }
    }

    pub fn event_filters(&self) -> &[FeatureFilter] {
        &self.event_filters
    }

    pub fn input(&self) -> &SelectionConfig {
        &self.input
    }

    pub fn labels(&self) -> &[SelectionConfig] {
        &self.labels
    }

    /// Width of the flattened input vector
    pub fn input_size(&self) -> usize {
        self.input.total_feature_size()
    }

    /// Width of each label vector, in label order
    pub fn label_sizes(&self) -> Vec<usize> {
        self.labels
            .iter()
            .map(SelectionConfig::total_feature_size)
            .collect()
    }

    // ==================== Persistence ====================

    /// Structural representation in the persisted field order
    pub fn to_document(&self) -> TaskConfigDocument {
        TaskConfigDocument {
            event_filters: self.event_filters.iter().map(FilterEntry::from).collect(),
            input: SelectionDocument::from(&self.input),
            labels: self.labels.iter().map(SelectionDocument::from).collect(),
        }
    }

    /// Pretty JSON with two-space indentation
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_document())?)
    }

    /// Save as JSON, creating parent directories
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                FeatureSpecError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = self.to_json()?;
        std::fs::write(path, content).map_err(|e| {
            FeatureSpecError::Config(format!("Failed to write task config {:?}: {}", path, e))
        })?;

        tracing::info!("Saved task config to {:?}", path);
        Ok(())
    }

    /// Load and re-validate a task config through the global registry
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_with(path, registry::ensure_loaded())
    }

    pub fn load_with(path: impl AsRef<Path>, registry: &BranchRegistry) -> Result<Self> {
        let path = path.as_ref();
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(FeatureSpecError::ConfigNotFound(path.to_path_buf()))
            }
            Err(e) => return Err(e.into()),
        };

        let config = Self::from_json_str_with(&content, registry)
            .with_context(|| format!("Failed to load task config {:?}", path))?;
        tracing::info!("Loaded task config from {:?}: {}", path, config);
        Ok(config)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Self::from_json_str_with(json, registry::ensure_loaded())
    }

    pub fn from_json_str_with(json: &str, registry: &BranchRegistry) -> Result<Self> {
        let document: TaskConfigDocument = serde_json::from_str(json)
            .map_err(|e| FeatureSpecError::MalformedConfig(e.to_string()))?;
        Self::from_document_with(&document, registry)
    }

    pub fn from_document(document: &TaskConfigDocument) -> Result<Self> {
        Self::from_document_with(document, registry::ensure_loaded())
    }

    /// Rebuild from a persisted document.
    ///
    /// Scalar names that no longer resolve are dropped with a warning; an
    /// aggregator whose inputs all fail to resolve is dropped; a selection
    /// left empty falls back to its first valid scalar name.
    pub fn from_document_with(
        document: &TaskConfigDocument,
        registry: &BranchRegistry,
    ) -> Result<Self> {
        let rebuild = Reconstruction::new(registry, Mode::Persisted);

        let event_filters = rebuild
            .event_filters(&document.event_filters)
            .context("event_filters")?;
        let input = rebuild.selection(&document.input).context("input")?;
        let labels = document
            .labels
            .iter()
            .enumerate()
            .map(|(i, label)| {
                rebuild
                    .selection(label)
                    .with_context(|| format!("labels[{}]", i))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self::new(event_filters, input, labels))
    }

    // ==================== Name-based construction ====================

    /// Build from plain names through the global registry
    pub fn from_branch_names(
        event_filters: &BTreeMap<String, ValueRange>,
        input_features: &[String],
        input_array_aggregators: &[AggregatorDocument],
        label_features: &[Vec<String>],
        label_array_aggregators: &[Vec<AggregatorDocument>],
    ) -> Result<Self> {
        Self::from_branch_names_with(
            registry::ensure_loaded(),
            event_filters,
            input_features,
            input_array_aggregators,
            label_features,
            label_array_aggregators,
        )
    }

    /// Build from plain names.
    ///
    /// Unknown or wrong-kind branch names are logged and dropped. An event
    /// filter with neither bound gets `min = 0`. Labels are named
    /// `Label_1`, `Label_2`, ... and there are as many as the longer of the
    /// two label lists.
    pub fn from_branch_names_with(
        registry: &BranchRegistry,
        event_filters: &BTreeMap<String, ValueRange>,
        input_features: &[String],
        input_array_aggregators: &[AggregatorDocument],
        label_features: &[Vec<String>],
        label_array_aggregators: &[Vec<AggregatorDocument>],
    ) -> Result<Self> {
        let rebuild = Reconstruction::new(registry, Mode::Exploratory);

        let event_filters = rebuild.event_filters_from_map(event_filters)?;
        let input = rebuild.selection_from_parts(
            INPUT_SELECTION_NAME,
            input_features,
            input_array_aggregators,
        )?;

        let n_labels = label_features.len().max(label_array_aggregators.len());
        let mut labels = Vec::with_capacity(n_labels);
        for i in 0..n_labels {
            let features = label_features.get(i).map(Vec::as_slice).unwrap_or(&[]);
            let aggregators = label_array_aggregators
                .get(i)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            labels.push(rebuild.selection_from_parts(
                &format!("Label_{}", i + 1),
                features,
                aggregators,
            )?);
        }

        Ok(Self::new(event_filters, input, labels))
    }

    pub fn from_spec(spec: &TaskSpec) -> Result<Self> {
        Self::from_spec_with(spec, registry::ensure_loaded())
    }

    pub fn from_spec_with(spec: &TaskSpec, registry: &BranchRegistry) -> Result<Self> {
        Self::from_branch_names_with(
            registry,
            &spec.event_filters,
            &spec.input_features,
            &spec.input_array_aggregators,
            &spec.label_features,
            &spec.label_array_aggregators,
        )
    }
}

impl std::fmt::Display for TaskConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "TaskConfig(event_filters={}, input={}, labels={})",
            self.event_filters.len(),
            self.input,
            self.labels.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::test_support::fixture_registry;
    use crate::selection::FeatureSelector;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn sample(registry: &BranchRegistry) -> TaskConfig {
        let mut ranges = BTreeMap::new();
        ranges.insert(
            "EventInfoAuxDyn.averageInteractionsPerCrossing".to_string(),
            ValueRange::between(10.0, 80.5),
        );
        let tracks = AggregatorDocument {
            input_branches: vec!["InDetTrackParticlesAuxDyn.d0".into()],
            filter_branches: vec![FilterEntry::new(
                "derived.InDetTrackParticlesAuxDyn.pt",
                Some(1000.0),
                None,
            )],
            sort_by_branch: Some("derived.InDetTrackParticlesAuxDyn.pt".into()),
            min_length: 2,
            max_length: 10,
        };

        TaskConfig::from_branch_names_with(
            registry,
            &ranges,
            &names(&["EventInfoAuxDyn.eventNumber", "EventInfoAuxDyn.runNumber"]),
            &[tracks],
            &[names(&["EventInfoAuxDyn.mcChannelNumber"])],
            &[],
        )
        .unwrap()
    }

    #[test]
    fn test_sizes() {
        let registry = fixture_registry();
        let config = sample(&registry);
        assert_eq!(config.input_size(), 2 + 10);
        assert_eq!(config.label_sizes(), vec![1]);
    }

    #[test]
    fn test_document_round_trip() {
        let registry = fixture_registry();
        let config = sample(&registry);
        let json = config.to_json().unwrap();
        let loaded = TaskConfig::from_json_str_with(&json, &registry).unwrap();
        assert_eq!(loaded.to_document(), config.to_document());
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_json_layout() {
        let registry = fixture_registry();
        let json = sample(&registry).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(
            value["event_filters"][0]["branch_name"],
            "EventInfoAuxDyn.averageInteractionsPerCrossing"
        );
        assert_eq!(value["event_filters"][0]["max_value"], 80.5);
        let aggregator = &value["input"]["feature_array_aggregators"][0];
        assert_eq!(
            aggregator["input_branches"][0]["branch_name"],
            "InDetTrackParticlesAuxDyn.d0"
        );
        assert!(aggregator["filter_branches"][0]["max_value"].is_null());
        assert_eq!(aggregator["min_length"], 2);
        assert_eq!(value["labels"][0]["name"], "Label_1");
        assert!(json.contains("\n  \"event_filters\""));
    }

    #[test]
    fn test_labels_pair_positionally() {
        let registry = fixture_registry();
        let aggregator = AggregatorDocument {
            input_branches: vec!["AnalysisElectronsAuxDyn.caloClusterP4".into()],
            max_length: 3,
            ..Default::default()
        };
        let config = TaskConfig::from_branch_names_with(
            &registry,
            &BTreeMap::new(),
            &names(&["EventInfoAuxDyn.eventNumber"]),
            &[],
            &[names(&["EventInfoAuxDyn.runNumber"])],
            &[vec![], vec![aggregator]],
        )
        .unwrap();

        let labels = config.labels();
        assert_eq!(labels.len(), 2);
        assert_eq!(labels[0].name(), "Label_1");
        assert_eq!(labels[0].total_feature_size(), 1);
        assert_eq!(labels[1].name(), "Label_2");
        assert!(labels[1].feature_selectors().is_empty());
        assert_eq!(labels[1].total_feature_size(), 3 * 4);
    }

    #[test]
    fn test_from_branch_names_empty_input_fails() {
        let registry = fixture_registry();
        let err = TaskConfig::from_branch_names_with(
            &registry,
            &BTreeMap::new(),
            &names(&["Nope.nothing"]),
            &[],
            &[],
            &[],
        )
        .unwrap_err();
        assert!(matches!(err, FeatureSpecError::EmptySelection { .. }));
    }

    #[test]
    fn test_malformed_json() {
        let registry = fixture_registry();
        for json in ["[1, 2]", "{\"labels\": []}", "not json", "{\"input\": 3}"] {
            let err = TaskConfig::from_json_str_with(json, &registry).unwrap_err();
            assert!(
                matches!(err, FeatureSpecError::MalformedConfig(_)),
                "{} gave {:?}",
                json,
                err
            );
        }
    }

    #[test]
    fn test_display() {
        let registry = fixture_registry();
        let input = SelectionConfig::new(
            "Input",
            vec![FeatureSelector::resolve("EventInfoAuxDyn.eventNumber", &registry).unwrap()],
            vec![],
        )
        .unwrap();
        let config = TaskConfig::new(vec![], input, vec![]);
        assert_eq!(
            config.to_string(),
            "TaskConfig(event_filters=0, input=SelectionConfig(name='Input', \
             feature_selectors=1, feature_array_aggregators=0), labels=0)"
        );
    }
}
