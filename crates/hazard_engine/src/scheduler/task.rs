//! Tasks and the messages sent for them.

use hazard_core::types::{GroupId, SourceId};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Task identifier, dense from 0 in creation order.
pub type TaskId = u32;

/// Lifecycle of a task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Not yet sent, or waiting for a retry.
    Pending,
    /// Sent to a worker.
    Running,
    /// Result received and handed over.
    Done,
    /// Failed for good.
    Failed,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Done => "done",
            TaskStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// A block of sources with its bookkeeping.
#[derive(Clone, Debug, Serialize)]
pub struct Task {
    /// Task id.
    pub id: TaskId,
    /// Task kind, used to group timings.
    pub kind: String,
    /// Group of the sources.
    pub grp_id: GroupId,
    /// Sources assigned to the task.
    pub sources: Vec<SourceId>,
    /// Sum of the source weights.
    pub weight: f64,
    /// Current status.
    pub status: TaskStatus,
    /// Attempts started so far.
    pub attempts: u32,
    /// Duration of the successful attempt.
    pub duration: Option<Duration>,
    /// Bytes sent, over all attempts.
    pub sent: u64,
    /// Bytes received.
    pub received: u64,
    #[serde(skip)]
    payload: Arc<Vec<u8>>,
}

impl Task {
    /// New pending task carrying `payload`.
    pub fn new(
        id: TaskId,
        kind: impl Into<String>,
        grp_id: GroupId,
        sources: Vec<SourceId>,
        weight: f64,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            id,
            kind: kind.into(),
            grp_id,
            sources,
            weight,
            status: TaskStatus::Pending,
            attempts: 0,
            duration: None,
            sent: 0,
            received: 0,
            payload: Arc::new(payload),
        }
    }

    /// Serialized input.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Message for the next attempt.
    pub fn message(&self, attempt: u32) -> TaskMessage {
        TaskMessage {
            task_id: self.id,
            attempt,
            kind: self.kind.clone(),
            payload: Arc::clone(&self.payload),
        }
    }
}

/// What a worker receives.
#[derive(Clone, Debug)]
pub struct TaskMessage {
    /// Task id.
    pub task_id: TaskId,
    /// Attempt number, 0 for the first.
    pub attempt: u32,
    /// Task kind.
    pub kind: String,
    /// Serialized input.
    pub payload: Arc<Vec<u8>>,
}
