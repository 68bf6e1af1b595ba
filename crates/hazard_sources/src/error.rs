//! Source-model error types.

use hazard_core::types::ValidationError;
use thiserror::Error;

/// Errors raised while building sources, source models and GSIM registries.
///
/// # Examples
/// ```
/// use hazard_sources::SourceError;
///
/// let err = SourceError::UnknownGsim("Nope2024".to_string());
/// assert_eq!(err.to_string(), "unknown ground-motion model: Nope2024");
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    /// Structural validation failure.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A source carries inconsistent data.
    #[error("invalid source {id}: {reason}")]
    InvalidSource {
        /// Source id
        id: String,
        /// What is wrong
        reason: String,
    },

    /// No model registered under this name.
    #[error("unknown ground-motion model: {0}")]
    UnknownGsim(String),

    /// The model has no coefficients for this IMT.
    #[error("{gsim} does not support {imt}")]
    UnsupportedImt {
        /// Model name
        gsim: String,
        /// Requested IMT
        imt: String,
    },
}
