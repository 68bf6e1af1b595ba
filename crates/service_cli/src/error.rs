//! CLI error types.

use hazard_engine::{ConfigError, EngineError};
use thiserror::Error;

/// Errors reported by CLI commands.
#[derive(Error, Debug)]
pub enum CliError {
    /// The job file does not exist.
    #[error("file not found: {0}")]
    FileNotFound(String),

    /// The job file could not be parsed or describes an invalid job.
    #[error("invalid job file: {0}")]
    Job(String),

    /// Invalid command-line argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Invalid calculation parameters.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The calculation failed.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Output could not be serialised.
    #[error("output error: {0}")]
    Output(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for CLI commands.
pub type Result<T> = std::result::Result<T, CliError>;
