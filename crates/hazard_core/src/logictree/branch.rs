//! Branches and branch sets.

use super::path::BranchPath;
use crate::types::{BranchId, BranchSetId, TectonicRegionType, ValidationError};
use serde::{Deserialize, Serialize};

/// A single modelling alternative with its weight.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    /// Branch identifier, unique inside a tree.
    pub id: BranchId,
    /// Weight in (0, 1].
    pub weight: f64,
    /// Opaque value: a source model name, a GSIM name, an uncertainty.
    pub value: String,
}

impl Branch {
    /// Creates a branch.
    pub fn new(id: impl Into<BranchId>, weight: f64, value: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            weight,
            value: value.into(),
        }
    }
}

/// Ordered alternatives whose weights sum to one.
///
/// A set with a tectonic region type belongs to a ground-motion tree and
/// selects the model for that region. A set with a non-empty `applies_to`
/// list only takes part in paths that already contain one of the listed
/// branches.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BranchSet {
    /// Set identifier.
    pub id: BranchSetId,
    /// Branches in declaration order.
    pub branches: Vec<Branch>,
    /// Tectonic region type the set applies to, for ground-motion trees.
    #[serde(default)]
    pub trt: Option<TectonicRegionType>,
    /// Branches that enable this set; empty means always applicable.
    #[serde(default)]
    pub applies_to: Vec<BranchId>,
}

impl BranchSet {
    /// Creates an unconditional set.
    pub fn new(id: impl Into<BranchSetId>, branches: Vec<Branch>) -> Self {
        Self {
            id: id.into(),
            branches,
            trt: None,
            applies_to: Vec::new(),
        }
    }

    /// Attaches a tectonic region type.
    pub fn with_trt(mut self, trt: impl Into<TectonicRegionType>) -> Self {
        self.trt = Some(trt.into());
        self
    }

    /// Restricts the set to paths containing one of `branches`.
    pub fn applies_to<I, B>(mut self, branches: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<BranchId>,
    {
        self.applies_to = branches.into_iter().map(Into::into).collect();
        self
    }

    /// Number of branches.
    #[inline]
    pub fn len(&self) -> usize {
        self.branches.len()
    }

    /// Returns true if the set has no branches.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }

    /// Whether the set takes part in a path that starts with `prefix`.
    pub fn applies(&self, prefix: &BranchPath) -> bool {
        self.applies_to.is_empty() || self.applies_to.iter().any(|b| prefix.contains(b))
    }

    /// Index of the branch selected by a uniform draw `u` in [0, 1).
    ///
    /// The first branch whose cumulative weight exceeds `u` wins. Rounding
    /// in the cumulative sum can leave `u` above the total, in which case
    /// the last branch is taken.
    pub fn pick(&self, u: f64) -> usize {
        let mut cumulative = 0.0;
        for (i, branch) in self.branches.iter().enumerate() {
            cumulative += branch.weight;
            if u < cumulative {
                return i;
            }
        }
        self.branches.len().saturating_sub(1)
    }

    /// Checks weights and emptiness.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::EmptyBranchSet`] when there are no branches
    /// - [`ValidationError::InvalidWeight`] on NaN or weights outside (0, 1]
    /// - [`ValidationError::WeightSum`] when the sum is off by more than `tolerance`
    pub fn validate(&self, tolerance: f64) -> Result<(), ValidationError> {
        if self.branches.is_empty() {
            return Err(ValidationError::EmptyBranchSet(self.id.to_string()));
        }
        for branch in &self.branches {
            let w = branch.weight;
            if !(w > 0.0 && w <= 1.0) {
                return Err(ValidationError::InvalidWeight {
                    branch: branch.id.to_string(),
                    weight: w,
                });
            }
        }
        let sum: f64 = self.branches.iter().map(|b| b.weight).sum();
        if (sum - 1.0).abs() > tolerance {
            return Err(ValidationError::WeightSum {
                set: self.id.to_string(),
                sum,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(weights: &[f64]) -> BranchSet {
        let branches = weights
            .iter()
            .enumerate()
            .map(|(i, w)| Branch::new(format!("b{}", i), *w, format!("v{}", i)))
            .collect();
        BranchSet::new("bs", branches)
    }

    #[test]
    fn test_validate_ok() {
        assert!(set(&[0.2, 0.3, 0.5]).validate(1e-6).is_ok());
    }

    #[test]
    fn test_validate_weight_sum() {
        let err = set(&[0.2, 0.3]).validate(1e-6).unwrap_err();
        assert!(matches!(err, ValidationError::WeightSum { .. }));
    }

    #[test]
    fn test_validate_nan_weight() {
        let err = set(&[f64::NAN, 1.0]).validate(1e-6).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidWeight { .. }));
    }

    #[test]
    fn test_validate_zero_weight() {
        let err = set(&[0.0, 1.0]).validate(1e-6).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidWeight { .. }));
    }

    #[test]
    fn test_validate_empty() {
        let err = set(&[]).validate(1e-6).unwrap_err();
        assert_eq!(err, ValidationError::EmptyBranchSet("bs".to_string()));
    }

    #[test]
    fn test_pick_cumulative() {
        let s = set(&[0.3, 0.7]);
        assert_eq!(s.pick(0.0), 0);
        assert_eq!(s.pick(0.29), 0);
        assert_eq!(s.pick(0.3), 1);
        assert_eq!(s.pick(0.999_999), 1);
    }

    #[test]
    fn test_pick_falls_back_to_last() {
        let s = set(&[0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1]);
        assert_eq!(s.pick(0.999_999_999_999), 9);
    }

    #[test]
    fn test_applies_unconditional() {
        assert!(set(&[1.0]).applies(&BranchPath::default()));
    }
}
