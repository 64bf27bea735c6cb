//! Selectors and range filters
//!
//! Both come in a scalar and an array flavour. The flavour is a type
//! parameter ([`ScalarKind`] or [`ArrayKind`]) checked once at construction,
//! so a `FeatureArraySelector` can never hold a scalar branch.

use super::branch::Branch;
use crate::error::{FeatureSpecError, Result};
use crate::registry::BranchRegistry;
use crate::types::BranchKind;
use std::marker::PhantomData;

mod sealed {
    pub trait Sealed {}
}

/// Branch kind required by a selector or filter
pub trait KindMarker:
    sealed::Sealed + std::fmt::Debug + Clone + Copy + PartialEq + Eq + Send + Sync + 'static
{
    const KIND: BranchKind;
    /// Display prefix, e.g. `FeatureArray`
    const LABEL: &'static str;
}

/// One value per event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ScalarKind;

/// Variable-length array per event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ArrayKind;

impl sealed::Sealed for ScalarKind {}
impl sealed::Sealed for ArrayKind {}

impl KindMarker for ScalarKind {
    const KIND: BranchKind = BranchKind::Scalar;
    const LABEL: &'static str = "Feature";
}

impl KindMarker for ArrayKind {
    const KIND: BranchKind = BranchKind::Array;
    const LABEL: &'static str = "FeatureArray";
}

fn check_kind<K: KindMarker>(branch: &Branch) -> Result<()> {
    if branch.kind() == K::KIND {
        Ok(())
    } else {
        Err(FeatureSpecError::BranchTypeMismatch {
            branch: branch.name().to_string(),
            expected: K::KIND,
            actual: branch.kind(),
        })
    }
}

/// Reference to a branch included in the output as-is
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Selector<K: KindMarker> {
    branch: Branch,
    _kind: PhantomData<K>,
}

/// Scalar branch selector
pub type FeatureSelector = Selector<ScalarKind>;

/// Array branch selector
pub type FeatureArraySelector = Selector<ArrayKind>;

impl<K: KindMarker> Selector<K> {
    pub fn new(branch: Branch) -> Result<Self> {
        check_kind::<K>(&branch)?;
        Ok(Self {
            branch,
            _kind: PhantomData,
        })
    }

    /// Resolve `name` and wrap it
    pub fn resolve(name: &str, registry: &BranchRegistry) -> Result<Self> {
        Self::new(Branch::resolve(name, registry)?)
    }

    pub fn branch(&self) -> &Branch {
        &self.branch
    }

    pub fn name(&self) -> &str {
        self.branch.name()
    }
}

impl<K: KindMarker> std::fmt::Display for Selector<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}Selector({})", K::LABEL, self.branch.name())
    }
}

/// Inclusive value-range constraint on a branch
#[derive(Debug, Clone, PartialEq)]
pub struct Filter<K: KindMarker> {
    branch: Branch,
    min_value: Option<f64>,
    max_value: Option<f64>,
    _kind: PhantomData<K>,
}

/// Event-level filter on a scalar branch
pub type FeatureFilter = Filter<ScalarKind>;

/// Element-level filter on an array branch
pub type FeatureArrayFilter = Filter<ArrayKind>;

impl<K: KindMarker> Filter<K> {
    /// At least one bound is required and every bound must be finite, both
    /// checked before the branch kind. `min > max` is accepted as written;
    /// see [`Filter::is_satisfiable`].
    pub fn new(branch: Branch, min_value: Option<f64>, max_value: Option<f64>) -> Result<Self> {
        if min_value.is_none() && max_value.is_none() {
            return Err(FeatureSpecError::EmptyRange {
                branch: branch.name().to_string(),
            });
        }
        if let Some(value) = min_value
            .into_iter()
            .chain(max_value)
            .find(|v| !v.is_finite())
        {
            return Err(FeatureSpecError::NonFiniteBound {
                branch: branch.name().to_string(),
                value,
            });
        }
        check_kind::<K>(&branch)?;
        if let (Some(min), Some(max)) = (min_value, max_value) {
            if min > max {
                tracing::warn!(
                    "Filter on '{}' has min {} above max {}; no value can pass",
                    branch.name(),
                    min,
                    max
                );
            }
        }

        Ok(Self {
            branch,
            min_value,
            max_value,
            _kind: PhantomData,
        })
    }

    pub fn resolve(
        name: &str,
        registry: &BranchRegistry,
        min_value: Option<f64>,
        max_value: Option<f64>,
    ) -> Result<Self> {
        Self::new(Branch::resolve(name, registry)?, min_value, max_value)
    }

    pub fn branch(&self) -> &Branch {
        &self.branch
    }

    pub fn name(&self) -> &str {
        self.branch.name()
    }

    pub fn min_value(&self) -> Option<f64> {
        self.min_value
    }

    pub fn max_value(&self) -> Option<f64> {
        self.max_value
    }

    /// Whether `value` lies within the bounds (both inclusive)
    pub fn accepts(&self, value: f64) -> bool {
        self.min_value.map_or(true, |min| value >= min)
            && self.max_value.map_or(true, |max| value <= max)
    }

    /// False for an inverted range (`min > max`)
    pub fn is_satisfiable(&self) -> bool {
        match (self.min_value, self.max_value) {
            (Some(min), Some(max)) => min <= max,
            _ => true,
        }
    }
}

impl<K: KindMarker> std::fmt::Display for Filter<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let min = self
            .min_value
            .map(|v| v.to_string())
            .unwrap_or_else(|| "-inf".to_string());
        let max = self
            .max_value
            .map(|v| v.to_string())
            .unwrap_or_else(|| "inf".to_string());
        write!(
            f,
            "{}Filter({}, range=[{}, {}])",
            K::LABEL,
            self.branch.name(),
            min,
            max
        )
    }
}
