//! Feature array aggregation
//!
//! An aggregator collects one or more array branches that share an element
//! axis (e.g. all `InDetTrackParticlesAuxDyn.*` columns), keeps the elements
//! passing every filter, optionally orders them by a sort branch (descending,
//! stable), and pads with zeros or truncates to exactly `max_length`
//! elements. Events with fewer than `min_length` surviving elements are
//! rejected downstream.
//!
//! Output width is `max_length * per_element_width`, where each input
//! contributes its per-element multiplicity `k`:
//!
//! | shape        | k                |
//! |--------------|------------------|
//! | `(-1,)`      | 1                |
//! | `(-1, k)`    | k (1 if `k <= 0`)|
//! | other / none | 1                |

use super::selector::{FeatureArrayFilter, FeatureArraySelector};
use crate::error::{AggregatorViolation, Result};

/// `min_length` used when a persisted aggregator omits it
pub const DEFAULT_MIN_LENGTH: i64 = 1;

/// `max_length` used when a persisted aggregator omits it
pub const DEFAULT_MAX_LENGTH: i64 = 100;

/// Joint filter/sort/pad configuration over array branches
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureArrayAggregator {
    input_branches: Vec<FeatureArraySelector>,
    filter_branches: Vec<FeatureArrayFilter>,
    sort_by_branch: Option<FeatureArraySelector>,
    min_length: usize,
    max_length: usize,
    per_element_width: usize,
    feature_width: usize,
}

impl FeatureArrayAggregator {
    /// Validates, in order: non-empty inputs, `min_length >= 0`,
    /// `max_length > 0`, `min_length <= max_length`, and finally that
    /// `max_length * per_element_width` fits in `usize`.
    pub fn new(
        input_branches: Vec<FeatureArraySelector>,
        filter_branches: Vec<FeatureArrayFilter>,
        sort_by_branch: Option<FeatureArraySelector>,
        min_length: i64,
        max_length: i64,
    ) -> Result<Self> {
        if input_branches.is_empty() {
            return Err(AggregatorViolation::EmptyInputs.into());
        }
        if min_length < 0 {
            return Err(AggregatorViolation::NegativeMinLength(min_length).into());
        }
        if max_length <= 0 {
            return Err(AggregatorViolation::NonPositiveMaxLength(max_length).into());
        }
        if min_length > max_length {
            return Err(AggregatorViolation::MinExceedsMax {
                min: min_length,
                max: max_length,
            }
            .into());
        }

        let overflow = AggregatorViolation::WidthOverflow(max_length);
        let (Ok(min), Ok(max)) = (usize::try_from(min_length), usize::try_from(max_length)) else {
            return Err(overflow.into());
        };
        let per_element_width = input_branches
            .iter()
            .map(element_multiplicity)
            .try_fold(0usize, |total, k| total.checked_add(k?))
            .ok_or(overflow)?;
        let feature_width = max.checked_mul(per_element_width).ok_or(overflow)?;

        Ok(Self {
            input_branches,
            filter_branches,
            sort_by_branch,
            min_length: min,
            max_length: max,
            per_element_width,
            feature_width,
        })
    }

    /// Output columns, in order
    pub fn input_branches(&self) -> &[FeatureArraySelector] {
        &self.input_branches
    }

    /// Element filters, combined with AND
    pub fn filter_branches(&self) -> &[FeatureArrayFilter] {
        &self.filter_branches
    }

    pub fn sort_by_branch(&self) -> Option<&FeatureArraySelector> {
        self.sort_by_branch.as_ref()
    }

    pub fn min_length(&self) -> usize {
        self.min_length
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Names of the input branches, in output order
    pub fn branch_names(&self) -> Vec<&str> {
        self.input_branches.iter().map(|s| s.name()).collect()
    }

    /// Sum of per-element multiplicities over all inputs
    pub fn per_element_width(&self) -> usize {
        self.per_element_width
    }

    /// Number of output values this aggregator contributes per event
    pub fn feature_width(&self) -> usize {
        self.feature_width
    }
}

/// `None` when the inner dimension does not fit in `usize`
fn element_multiplicity(selector: &FeatureArraySelector) -> Option<usize> {
    let name = selector.name();
    let k = match selector.branch().shape() {
        Some(shape) if shape.len() == 1 => 1,
        Some(shape) if shape.len() == 2 => {
            let k = shape[1];
            if k > 0 {
                return usize::try_from(k).ok();
            }
            tracing::warn!(
                "Branch '{}' has non-positive inner dimension {} in shape {:?}, assuming k=1",
                name,
                k,
                shape
            );
            1
        }
        Some(shape) => {
            tracing::warn!(
                "Branch '{}' has unexpected shape {:?} for feature size calculation, assuming k=1",
                name,
                shape
            );
            1
        }
        None => {
            tracing::warn!("Branch '{}' has no shape info available, assuming k=1", name);
            1
        }
    };
    Some(k)
}

impl std::fmt::Display for FeatureArrayAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let filters = if self.filter_branches.is_empty() {
            "none".to_string()
        } else {
            self.filter_branches
                .iter()
                .map(|filter| filter.name())
                .collect::<Vec<_>>()
                .join(", ")
        };
        write!(
            f,
            "FeatureArrayAggregator(branches=[{}], filters=[{}], sort_by={}, length={}-{})",
            self.branch_names().join(", "),
            filters,
            self.sort_by_branch
                .as_ref()
                .map(|s| s.name())
                .unwrap_or("none"),
            self.min_length,
            self.max_length
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FeatureSpecError;
    use crate::registry::BranchRegistry;
    use crate::selection::test_support::fixture_registry;
    use proptest::prelude::*;

    fn array(registry: &BranchRegistry, name: &str) -> FeatureArraySelector {
        FeatureArraySelector::resolve(name, registry).unwrap()
    }

    fn violation(result: Result<FeatureArrayAggregator>) -> AggregatorViolation {
        match result {
            Err(FeatureSpecError::Aggregator(v)) => v,
            other => panic!("expected aggregator violation, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_inputs() {
        let v = violation(FeatureArrayAggregator::new(vec![], vec![], None, 0, 10));
        assert_eq!(v, AggregatorViolation::EmptyInputs);
    }

    #[test]
    fn test_negative_min_length() {
        let registry = fixture_registry();
        let inputs = vec![array(&registry, "InDetTrackParticlesAuxDyn.d0")];
        let v = violation(FeatureArrayAggregator::new(inputs, vec![], None, -1, 10));
        assert_eq!(v, AggregatorViolation::NegativeMinLength(-1));
    }

    #[test]
    fn test_non_positive_max_length() {
        let registry = fixture_registry();
        let inputs = vec![array(&registry, "InDetTrackParticlesAuxDyn.d0")];
        let v = violation(FeatureArrayAggregator::new(inputs, vec![], None, 0, 0));
        assert_eq!(v, AggregatorViolation::NonPositiveMaxLength(0));
    }

    #[test]
    fn test_min_exceeds_max() {
        let registry = fixture_registry();
        let x = array(&registry, "InDetTrackParticlesAuxDyn.d0");
        let v = violation(FeatureArrayAggregator::new(vec![x.clone()], vec![], None, 5, 3));
        assert_eq!(v, AggregatorViolation::MinExceedsMax { min: 5, max: 3 });

        let ok = FeatureArrayAggregator::new(vec![x], vec![], None, 3, 5).unwrap();
        assert_eq!(ok.min_length(), 3);
        assert_eq!(ok.max_length(), 5);
    }

    #[test]
    fn test_zero_min_length_is_allowed() {
        let registry = fixture_registry();
        let inputs = vec![array(&registry, "InDetTrackParticlesAuxDyn.d0")];
        assert!(FeatureArrayAggregator::new(inputs, vec![], None, 0, 1).is_ok());
    }

    #[test]
    fn test_checks_run_in_order() {
        // Empty inputs is reported even when the lengths are also invalid
        let v = violation(FeatureArrayAggregator::new(vec![], vec![], None, -3, -1));
        assert_eq!(v, AggregatorViolation::EmptyInputs);
    }

    #[test]
    fn test_feature_width_rank_one() {
        let registry = fixture_registry();
        let agg = FeatureArrayAggregator::new(
            vec![
                array(&registry, "InDetTrackParticlesAuxDyn.d0"),
                array(&registry, "InDetTrackParticlesAuxDyn.z0"),
            ],
            vec![],
            None,
            1,
            10,
        )
        .unwrap();
        assert_eq!(agg.per_element_width(), 2);
        assert_eq!(agg.feature_width(), 20);
    }

    #[test]
    fn test_feature_width_rank_two() {
        let registry = fixture_registry();
        let agg = FeatureArrayAggregator::new(
            vec![
                array(&registry, "InDetTrackParticlesAuxDyn.d0"),
                array(&registry, "InDetTrackParticlesAuxDyn.definingParametersCovMatrixDiag"),
            ],
            vec![],
            None,
            0,
            30,
        )
        .unwrap();
        assert_eq!(agg.per_element_width(), 1 + 5);
        assert_eq!(agg.feature_width(), 180);
    }

    #[test]
    fn test_anomalous_shapes_count_as_one() {
        let registry = fixture_registry();
        let agg = FeatureArrayAggregator::new(
            vec![
                // (-1, 0)
                array(&registry, "AnalysisElectronsAuxDyn.trackParticleLinks"),
                // (-1, 1, 2)
                array(&registry, "AnalysisJetsAuxDyn.NumTrkPt500"),
            ],
            vec![],
            None,
            0,
            4,
        )
        .unwrap();
        assert_eq!(agg.per_element_width(), 2);
        assert_eq!(agg.feature_width(), 8);
    }

    #[test]
    fn test_width_overflow_is_rejected() {
        let registry = fixture_registry();
        let wide = array(&registry, "InDetTrackParticlesAuxDyn.definingParametersCovMatrixDiag");
        let v = violation(FeatureArrayAggregator::new(
            vec![wide.clone()],
            vec![],
            None,
            0,
            i64::MAX,
        ));
        assert_eq!(v, AggregatorViolation::WidthOverflow(i64::MAX));

        // k = 1 still fits on 64-bit targets
        let narrow = array(&registry, "InDetTrackParticlesAuxDyn.d0");
        if usize::BITS >= 64 {
            let agg = FeatureArrayAggregator::new(vec![narrow], vec![], None, 0, i64::MAX).unwrap();
            assert_eq!(agg.feature_width(), i64::MAX as usize);
        }

        // Length checks still run first
        let v = violation(FeatureArrayAggregator::new(vec![wide], vec![], None, 5, 3));
        assert_eq!(v, AggregatorViolation::MinExceedsMax { min: 5, max: 3 });
    }

    #[test]
    fn test_display() {
        let registry = fixture_registry();
        let filter = FeatureArrayFilter::resolve(
            "derived.InDetTrackParticlesAuxDyn.pt",
            &registry,
            Some(1000.0),
            None,
        )
        .unwrap();
        let agg = FeatureArrayAggregator::new(
            vec![array(&registry, "InDetTrackParticlesAuxDyn.d0")],
            vec![filter],
            Some(array(&registry, "derived.InDetTrackParticlesAuxDyn.pt")),
            1,
            50,
        )
        .unwrap();
        assert_eq!(
            agg.to_string(),
            "FeatureArrayAggregator(branches=[InDetTrackParticlesAuxDyn.d0], \
             filters=[derived.InDetTrackParticlesAuxDyn.pt], \
             sort_by=derived.InDetTrackParticlesAuxDyn.pt, length=1-50)"
        );
    }

    proptest! {
        #[test]
        fn test_width_is_max_length_times_inputs(
            max_length in 1i64..500,
            n_inputs in 1usize..6,
        ) {
            let registry = fixture_registry();
            let names = [
                "InDetTrackParticlesAuxDyn.d0",
                "InDetTrackParticlesAuxDyn.z0",
                "InDetTrackParticlesAuxDyn.phi",
                "InDetTrackParticlesAuxDyn.theta",
                "InDetTrackParticlesAuxDyn.qOverP",
            ];
            let inputs = names[..n_inputs].iter().map(|n| array(&registry, n)).collect();
            let agg = FeatureArrayAggregator::new(inputs, vec![], None, 0, max_length).unwrap();
            prop_assert_eq!(agg.feature_width(), max_length as usize * n_inputs);
        }

        #[test]
        fn test_length_bounds_accepted_iff_ordered(min in -5i64..20, max in -5i64..20) {
            let registry = fixture_registry();
            let inputs = vec![array(&registry, "InDetTrackParticlesAuxDyn.d0")];
            let result = FeatureArrayAggregator::new(inputs, vec![], None, min, max);
            prop_assert_eq!(result.is_ok(), min >= 0 && max > 0 && min <= max);
        }
    }
}
