//! Workers: byte-in, byte-out task executors.

use super::task::TaskMessage;
use crate::kernel::{self, CalcContext};
use crate::wire::{decode, encode, TaskInput};
use std::sync::Arc;
use thiserror::Error;

/// Failure reported by a worker for one attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// May succeed if tried again.
    #[error("transient: {0}")]
    Transient(String),

    /// Will fail again; no retry.
    #[error("fatal: {0}")]
    Fatal(String),
}

impl TaskError {
    /// Whether a retry may help.
    pub fn is_transient(&self) -> bool {
        matches!(self, TaskError::Transient(_))
    }
}

/// Executes task messages.
///
/// Implementations must be pure functions of the payload and whatever
/// read-only state they share; the scheduler may run the same message more
/// than once.
pub trait Worker: Send + Sync {
    /// Runs one attempt of a task.
    ///
    /// # Errors
    ///
    /// [`TaskError`] describing whether a retry is worthwhile.
    fn execute(&self, message: &TaskMessage) -> Result<Vec<u8>, TaskError>;
}

/// Worker running the classical kernel on a shared context.
#[derive(Clone, Debug)]
pub struct ClassicalWorker {
    ctx: Arc<CalcContext>,
}

impl ClassicalWorker {
    /// Worker over `ctx`.
    pub fn new(ctx: Arc<CalcContext>) -> Self {
        Self { ctx }
    }
}

impl Worker for ClassicalWorker {
    fn execute(&self, message: &TaskMessage) -> Result<Vec<u8>, TaskError> {
        let input: TaskInput =
            decode(&message.payload).map_err(|e| TaskError::Fatal(e.to_string()))?;
        let output = kernel::compute(&self.ctx, &input).map_err(|e| TaskError::Fatal(e.to_string()))?;
        encode(&output).map_err(|e| TaskError::Fatal(e.to_string()))
    }
}
