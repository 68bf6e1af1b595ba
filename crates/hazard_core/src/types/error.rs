//! Error types for structured error handling.
//!
//! This module provides:
//! - `ValidationError`: Malformed logic trees, levels or sampling requests

use thiserror::Error;

/// Validation errors raised while building logic trees and related inputs.
///
/// Validation happens once, at construction time. Anything that survives a
/// builder's `build()` can be used without further checks.
///
/// # Variants
/// - `WeightSum`: Branch weights of a set do not sum to one
/// - `InvalidWeight`: A branch weight is NaN or outside (0, 1]
/// - `EmptyBranchSet`: A branch set has no branches
/// - `DuplicateBranch`: Two branches share an id
/// - `UnknownBranch`: `applies_to` names a branch that does not exist
/// - `ZeroSamples`: Monte Carlo sampling requested with no samples
/// - `InvalidLevels`: Intensity levels are empty, non-positive or unsorted
/// - `DuplicateSource`: A source id repeats inside one source group
/// - `InvalidInput`: Any other malformed input
///
/// # Examples
/// ```
/// use hazard_core::types::ValidationError;
///
/// let err = ValidationError::WeightSum { set: "bs1".to_string(), sum: 0.9 };
/// assert_eq!(format!("{}", err), "branch set bs1: weights sum to 0.9, expected 1");
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Branch weights do not sum to one within tolerance.
    #[error("branch set {set}: weights sum to {sum}, expected 1")]
    WeightSum {
        /// Branch set id
        set: String,
        /// Actual sum of weights
        sum: f64,
    },

    /// Branch weight is NaN or outside (0, 1].
    #[error("branch {branch}: invalid weight {weight}")]
    InvalidWeight {
        /// Branch id
        branch: String,
        /// Offending weight
        weight: f64,
    },

    /// Branch set without branches.
    #[error("branch set {0} is empty")]
    EmptyBranchSet(String),

    /// Duplicated branch id inside a tree.
    #[error("duplicated branch id {0}")]
    DuplicateBranch(String),

    /// `applies_to` references a branch that is not declared earlier.
    #[error("branch set {set}: applies_to names unknown branch {branch}")]
    UnknownBranch {
        /// Branch set id
        set: String,
        /// Unknown branch id
        branch: String,
    },

    /// Sampling with zero samples.
    #[error("sampling requires at least one sample")]
    ZeroSamples,

    /// Intensity levels are malformed.
    #[error("invalid levels for {imt}: {reason}")]
    InvalidLevels {
        /// Intensity measure type
        imt: String,
        /// What is wrong with them
        reason: String,
    },

    /// Two sources with the same id inside one source group.
    #[error("source {source_id} appears twice in group {group}")]
    DuplicateSource {
        /// Source id
        source_id: String,
        /// Group id
        group: u32,
    },

    /// Generic invalid input.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = ValidationError::InvalidWeight {
            branch: "b2".to_string(),
            weight: -0.5,
        };
        assert_eq!(err.to_string(), "branch b2: invalid weight -0.5");
        assert_eq!(
            ValidationError::EmptyBranchSet("gmpe".to_string()).to_string(),
            "branch set gmpe is empty"
        );
    }

    #[test]
    fn test_error_trait() {
        fn takes_error(_: &dyn std::error::Error) {}
        takes_error(&ValidationError::ZeroSamples);
    }
}
