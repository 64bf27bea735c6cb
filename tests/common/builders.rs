//! Test data builders for creating task specs and documents

use hep_featurespec::config::{AggregatorDocument, BranchEntry, FilterEntry, TaskSpec};
use hep_featurespec::ValueRange;

/// Builder for aggregator documents
pub struct AggregatorBuilder {
    document: AggregatorDocument,
}

impl AggregatorBuilder {
    pub fn new(inputs: &[&str]) -> Self {
        Self {
            document: AggregatorDocument {
                input_branches: inputs.iter().map(|n| BranchEntry::new(*n)).collect(),
                ..Default::default()
            },
        }
    }

    pub fn filter(mut self, name: &str, min: Option<f64>, max: Option<f64>) -> Self {
        self.document
            .filter_branches
            .push(FilterEntry::new(name, min, max));
        self
    }

    pub fn sort_by(mut self, name: &str) -> Self {
        self.document.sort_by_branch = Some(BranchEntry::new(name));
        self
    }

    pub fn lengths(mut self, min_length: i64, max_length: i64) -> Self {
        self.document.min_length = min_length;
        self.document.max_length = max_length;
        self
    }

    pub fn build(self) -> AggregatorDocument {
        self.document
    }
}

/// Builder for name-based task specs
#[derive(Default)]
pub struct TaskSpecBuilder {
    spec: TaskSpec,
}

impl TaskSpecBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn event_filter(mut self, name: &str, range: ValueRange) -> Self {
        self.spec.event_filters.insert(name.to_string(), range);
        self
    }

    pub fn input_features(mut self, names: &[&str]) -> Self {
        self.spec
            .input_features
            .extend(names.iter().map(|n| n.to_string()));
        self
    }

    pub fn input_aggregator(mut self, aggregator: AggregatorBuilder) -> Self {
        self.spec.input_array_aggregators.push(aggregator.build());
        self
    }

    /// Append a label made of scalar names and aggregators
    pub fn label(mut self, names: &[&str], aggregators: Vec<AggregatorBuilder>) -> Self {
        self.spec
            .label_features
            .push(names.iter().map(|n| n.to_string()).collect());
        self.spec
            .label_array_aggregators
            .push(aggregators.into_iter().map(AggregatorBuilder::build).collect());
        self
    }

    pub fn build(self) -> TaskSpec {
        self.spec
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregator_builder() {
        let doc = AggregatorBuilder::new(&["A.x", "A.y"])
            .filter("A.pt", Some(1.0), None)
            .sort_by("A.pt")
            .lengths(2, 8)
            .build();

        assert_eq!(doc.input_branches.len(), 2);
        assert_eq!(doc.filter_branches[0].min_value, Some(1.0));
        assert_eq!(doc.sort_by_branch, Some(BranchEntry::new("A.pt")));
        assert_eq!((doc.min_length, doc.max_length), (2, 8));
    }

    #[test]
    fn test_task_spec_builder_labels() {
        let spec = TaskSpecBuilder::new()
            .input_features(&["A.x"])
            .label(&["A.y"], vec![])
            .label(&[], vec![AggregatorBuilder::new(&["A.z"])])
            .build();

        assert_eq!(spec.label_count(), 2);
        assert!(spec.label_array_aggregators[0].is_empty());
        assert!(spec.label_features[1].is_empty());
    }
}
