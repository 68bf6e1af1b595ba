//! Engine error types.
//!
//! This module provides:
//! - `AssociationError`: A realization cannot be mapped to a ground-motion model
//! - `TaskFailure`: A task failed for good after its retries
//! - `NumericError`: Invalid probabilities or weights
//! - `ConfigError`: Invalid engine configuration
//! - `EngineError`: Umbrella over all of the above

use hazard_core::types::{GroupId, SourceId, ValidationError};
use hazard_sources::SourceError;
use thiserror::Error;

/// Failure to associate realizations with ground-motion models.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AssociationError {
    /// The ground-motion path of a realization has no branch for a region.
    #[error("realization {rlz} has no ground-motion model for {trt}")]
    UncoveredTrt {
        /// Realization ordinal
        rlz: usize,
        /// Region type present in the composite model
        trt: String,
    },
}

/// A task that could not be completed.
///
/// # Examples
/// ```
/// use hazard_engine::TaskFailure;
///
/// let failure = TaskFailure {
///     task_id: 7,
///     sources: vec!["a".into(), "b".into()],
///     reason: "worker crashed".to_string(),
/// };
/// assert_eq!(failure.to_string(), "task 7 failed (2 sources): worker crashed");
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
#[error("task {task_id} failed ({} sources): {reason}", .sources.len())]
pub struct TaskFailure {
    /// Task id
    pub task_id: u32,
    /// Sources of the task
    pub sources: Vec<SourceId>,
    /// Last error reported by the worker
    pub reason: String,
}

/// Probabilities or weights outside their domain. Never clamped.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NumericError {
    /// A probability of exceedance is NaN or outside [0, 1].
    #[error("invalid probability {value} at site {site}, level {level}")]
    InvalidPoe {
        /// Site id
        site: u32,
        /// Level index
        level: usize,
        /// Offending value
        value: f64,
    },

    /// Curves of different lengths were combined.
    #[error("curve length mismatch: expected {expected}, got {got}")]
    LevelMismatch {
        /// Expected number of levels
        expected: usize,
        /// Actual number of levels
        got: usize,
    },

    /// A weight is NaN or negative.
    #[error("invalid weight {0}")]
    InvalidWeight(f64),
}

/// Invalid engine configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A parameter is out of range.
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter {
        /// Parameter name
        name: &'static str,
        /// What is wrong
        reason: String,
    },

    /// Configuration file could not be read or parsed.
    #[error("configuration file error: {0}")]
    FileError(String),

    /// An environment override could not be parsed.
    #[error("environment variable {name}: {reason}")]
    EnvError {
        /// Variable name
        name: String,
        /// What is wrong
        reason: String,
    },
}

/// Any error the engine can return.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Malformed logic tree or input.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Source model problem.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Association problem.
    #[error(transparent)]
    Association(#[from] AssociationError),

    /// Task failed after retries.
    #[error(transparent)]
    TaskFailure(#[from] TaskFailure),

    /// Invalid numbers.
    #[error(transparent)]
    Numeric(#[from] NumericError),

    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Task payload could not be encoded or decoded.
    #[error("wire format error: {0}")]
    Wire(#[from] serde_json::Error),

    /// Worker pool could not be created.
    #[error("worker pool error: {0}")]
    Pool(String),

    /// The calculation was cancelled.
    #[error("calculation cancelled")]
    Cancelled,

    /// An unknown group id was referenced.
    #[error("unknown group {0}")]
    UnknownGroup(GroupId),

    /// A partial result names a model the group is not associated with.
    #[error("group {grp_id} has no realization using {gsim}")]
    UnassociatedGsim {
        /// Group id
        grp_id: GroupId,
        /// Model name
        gsim: String,
    },
}
