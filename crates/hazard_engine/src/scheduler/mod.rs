//! Task dispatch.
//!
//! The scheduler sends every task to a [`WorkerPool`], collects results
//! through a channel it polls with a timeout, retries transient failures with
//! exponential backoff and hands each successful result exactly once to the
//! caller. Results arrive in no particular order.

pub mod cancel;
pub mod partition;
pub mod pool;
pub mod retry;
pub mod stats;
pub mod task;
pub mod worker;

pub use cancel::CancellationToken;
pub use partition::{first_fit_decreasing, Block};
pub use pool::{InlinePool, Job, RayonPool, WorkerPool};
pub use retry::{ExponentialBackoff, RetryConfig};
pub use stats::{TimingRow, TimingTable, TransferRow, TransferTable};
pub use task::{Task, TaskId, TaskMessage, TaskStatus};
pub use worker::{ClassicalWorker, TaskError, Worker};

use crate::error::{EngineError, TaskFailure};
use std::any::Any;
use std::collections::{BTreeMap, HashSet};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Dispatch parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct SchedulerConfig {
    /// Retry policy for transient failures.
    pub retry: RetryConfig,
    /// How long the loop blocks on the result channel before checking
    /// cancellation and due retries.
    pub poll_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            poll_interval: Duration::from_millis(50),
        }
    }
}

/// Everything the scheduler learned while running.
#[derive(Clone, Debug)]
pub struct DispatchSummary {
    /// Tasks with their final status and counters.
    pub tasks: Vec<Task>,
    /// Durations by task kind.
    pub timing: TimingTable,
    /// Bytes moved by task kind.
    pub transfer: TransferTable,
    /// Retries performed.
    pub num_retries: u32,
    /// Name of the pool used.
    pub pool: &'static str,
}

struct Completion {
    task_id: TaskId,
    attempt: u32,
    elapsed: Duration,
    outcome: Result<Vec<u8>, TaskError>,
}

/// Dispatches tasks to a pool and collects the results.
pub struct Scheduler {
    pool: Arc<dyn WorkerPool>,
    worker: Arc<dyn Worker>,
    config: SchedulerConfig,
    cancel: CancellationToken,
}

impl Scheduler {
    /// Scheduler running `worker` on `pool`.
    pub fn new(pool: Arc<dyn WorkerPool>, worker: Arc<dyn Worker>, config: SchedulerConfig) -> Self {
        Self {
            pool,
            worker,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Uses `token` to stop the run from outside.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Runs every task to completion.
    ///
    /// `on_result` is called once per task, with the bytes of its successful
    /// attempt, on the calling thread.
    ///
    /// # Errors
    ///
    /// - [`EngineError::TaskFailure`] when a task fails fatally or runs out
    ///   of retries
    /// - [`EngineError::Cancelled`] when the token is cancelled; results
    ///   still in flight are dropped
    /// - any error returned by `on_result`
    pub fn run<F>(&self, mut tasks: Vec<Task>, mut on_result: F) -> Result<DispatchSummary, EngineError>
    where
        F: FnMut(&Task, &[u8]) -> Result<(), EngineError>,
    {
        let index: BTreeMap<TaskId, usize> = tasks.iter().enumerate().map(|(i, t)| (t.id, i)).collect();
        let mut backoffs: Vec<ExponentialBackoff> = tasks
            .iter()
            .map(|_| ExponentialBackoff::new(self.config.retry.clone()))
            .collect();
        let mut timing = TimingTable::new();
        let mut transfer = TransferTable::new();
        let mut retry_queue: Vec<(Instant, usize)> = Vec::new();
        let mut completed: HashSet<TaskId> = HashSet::new();
        let mut num_retries = 0;

        info!(
            num_tasks = tasks.len(),
            pool = self.pool.name(),
            num_workers = self.pool.num_workers(),
            "dispatching tasks"
        );

        let (tx, rx) = mpsc::channel::<Completion>();
        for task in tasks.iter_mut() {
            if self.cancel.is_cancelled() {
                return Err(EngineError::Cancelled);
            }
            self.submit(task, &tx, &mut transfer);
        }

        while completed.len() < tasks.len() {
            if self.cancel.is_cancelled() {
                warn!(
                    done = completed.len(),
                    total = tasks.len(),
                    "calculation cancelled"
                );
                return Err(EngineError::Cancelled);
            }

            let now = Instant::now();
            let (due, waiting): (Vec<_>, Vec<_>) = retry_queue.into_iter().partition(|(at, _)| *at <= now);
            retry_queue = waiting;
            for (_, i) in due {
                self.submit(&mut tasks[i], &tx, &mut transfer);
            }

            let completion = match rx.recv_timeout(self.config.poll_interval) {
                Ok(c) => c,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(EngineError::Pool("result channel closed".to_string()))
                }
            };
            let Some(&i) = index.get(&completion.task_id) else {
                continue;
            };
            if completed.contains(&completion.task_id) {
                debug!(task_id = completion.task_id, "duplicate result ignored");
                continue;
            }

            match completion.outcome {
                Ok(bytes) => {
                    let task = &mut tasks[i];
                    task.status = TaskStatus::Done;
                    task.duration = Some(completion.elapsed);
                    task.received += bytes.len() as u64;
                    transfer.record_received(&task.kind, bytes.len() as u64);
                    timing.record(&task.kind, completion.elapsed.as_secs_f64());
                    debug!(
                        task_id = task.id,
                        attempt = completion.attempt,
                        bytes = bytes.len(),
                        "task done"
                    );
                    on_result(task, &bytes)?;
                    completed.insert(task.id);
                }
                Err(err) => {
                    let task = &mut tasks[i];
                    let delay = if err.is_transient() {
                        backoffs[i].next_delay()
                    } else {
                        None
                    };
                    match delay {
                        Some(delay) => {
                            num_retries += 1;
                            task.status = TaskStatus::Pending;
                            warn!(
                                task_id = task.id,
                                attempt = completion.attempt,
                                delay_ms = delay.as_millis() as u64,
                                error = %err,
                                "retrying task"
                            );
                            retry_queue.push((Instant::now() + delay, i));
                        }
                        None => {
                            task.status = TaskStatus::Failed;
                            warn!(task_id = task.id, error = %err, "task failed");
                            return Err(TaskFailure {
                                task_id: task.id,
                                sources: task.sources.clone(),
                                reason: err.to_string(),
                            }
                            .into());
                        }
                    }
                }
            }
        }

        info!(num_tasks = tasks.len(), num_retries, "all tasks done");
        Ok(DispatchSummary {
            tasks,
            timing,
            transfer,
            num_retries,
            pool: self.pool.name(),
        })
    }

    fn submit(&self, task: &mut Task, tx: &Sender<Completion>, transfer: &mut TransferTable) {
        let attempt = task.attempts;
        task.attempts += 1;
        task.status = TaskStatus::Running;
        task.sent += task.payload().len() as u64;
        transfer.record_sent(&task.kind, task.payload().len() as u64);

        let message = task.message(attempt);
        let worker = Arc::clone(&self.worker);
        let tx = tx.clone();
        self.pool.spawn(Box::new(move || {
            let start = Instant::now();
            let outcome = catch_unwind(AssertUnwindSafe(|| worker.execute(&message)))
                .unwrap_or_else(|panic| Err(TaskError::Transient(panic_message(panic.as_ref()))));
            // The receiver is gone once the run is over or cancelled.
            let _ = tx.send(Completion {
                task_id: message.task_id,
                attempt: message.attempt,
                elapsed: start.elapsed(),
                outcome,
            });
        }));
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("worker panicked: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("worker panicked: {s}")
    } else {
        "worker panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hazard_core::types::GroupId;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Echoes the payload, failing the first `failures` attempts of task 1.
    struct Flaky {
        failures: u32,
        fatal: bool,
        calls: AtomicU32,
    }

    impl Worker for Flaky {
        fn execute(&self, message: &TaskMessage) -> Result<Vec<u8>, TaskError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if message.task_id == 1 && message.attempt < self.failures {
                if self.fatal {
                    return Err(TaskError::Fatal("bad input".to_string()));
                }
                return Err(TaskError::Transient("connection reset".to_string()));
            }
            Ok(message.payload.to_vec())
        }
    }

    struct Panicky;

    impl Worker for Panicky {
        fn execute(&self, message: &TaskMessage) -> Result<Vec<u8>, TaskError> {
            if message.attempt == 0 {
                panic!("boom");
            }
            Ok(vec![1])
        }
    }

    fn tasks(n: u32) -> Vec<Task> {
        (0..n)
            .map(|i| Task::new(i, "test", GroupId(0), vec![format!("s{i}").into()], 1.0, vec![i as u8; 4]))
            .collect()
    }

    fn config(max_retries: u32) -> SchedulerConfig {
        SchedulerConfig {
            retry: RetryConfig::new()
                .max_retries(max_retries)
                .initial_delay(Duration::from_millis(1))
                .jitter(false),
            poll_interval: Duration::from_millis(5),
        }
    }

    #[test]
    fn test_transient_failures_retried() {
        let worker = Arc::new(Flaky {
            failures: 2,
            fatal: false,
            calls: AtomicU32::new(0),
        });
        let scheduler = Scheduler::new(Arc::new(InlinePool), worker.clone(), config(3));
        let mut seen = Vec::new();
        let summary = scheduler
            .run(tasks(3), |task, bytes| {
                seen.push((task.id, bytes.to_vec()));
                Ok(())
            })
            .unwrap();

        seen.sort();
        assert_eq!(seen, vec![(0, vec![0; 4]), (1, vec![1; 4]), (2, vec![2; 4])]);
        assert_eq!(summary.num_retries, 2);
        assert_eq!(worker.calls.load(Ordering::SeqCst), 5);
        assert_eq!(summary.tasks[1].attempts, 3);
        assert_eq!(summary.tasks[1].sent, 12);
        assert!(summary.tasks.iter().all(|t| t.status == TaskStatus::Done));
        assert_eq!(summary.timing.rows()[0].count, 3);
        assert_eq!(summary.transfer.rows()[0].messages, 5);
    }

    #[test]
    fn test_retries_exhausted() {
        let worker = Arc::new(Flaky {
            failures: 5,
            fatal: false,
            calls: AtomicU32::new(0),
        });
        let scheduler = Scheduler::new(Arc::new(InlinePool), worker, config(2));
        let err = scheduler.run(tasks(2), |_, _| Ok(())).unwrap_err();
        match err {
            EngineError::TaskFailure(f) => {
                assert_eq!(f.task_id, 1);
                assert_eq!(f.sources, vec!["s1".into()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_fatal_not_retried() {
        let worker = Arc::new(Flaky {
            failures: 1,
            fatal: true,
            calls: AtomicU32::new(0),
        });
        let scheduler = Scheduler::new(Arc::new(InlinePool), worker.clone(), config(3));
        assert!(matches!(
            scheduler.run(tasks(2), |_, _| Ok(())),
            Err(EngineError::TaskFailure(_))
        ));
        assert_eq!(worker.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_panic_is_transient() {
        let pool = Arc::new(RayonPool::new(2).unwrap());
        let scheduler = Scheduler::new(pool, Arc::new(Panicky), config(1));
        let summary = scheduler.run(tasks(4), |_, _| Ok(())).unwrap();
        assert_eq!(summary.num_retries, 4);
    }

    #[test]
    fn test_cancelled_before_start() {
        let token = CancellationToken::new();
        token.cancel();
        let worker = Arc::new(Flaky {
            failures: 0,
            fatal: false,
            calls: AtomicU32::new(0),
        });
        let scheduler = Scheduler::new(Arc::new(InlinePool), worker.clone(), config(0)).with_cancellation(token);
        assert!(matches!(scheduler.run(tasks(3), |_, _| Ok(())), Err(EngineError::Cancelled)));
        assert_eq!(worker.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_callback_error_stops_run() {
        let worker = Arc::new(Flaky {
            failures: 0,
            fatal: false,
            calls: AtomicU32::new(0),
        });
        let scheduler = Scheduler::new(Arc::new(InlinePool), worker, config(0));
        let err = scheduler
            .run(tasks(2), |_, _| Err(EngineError::Pool("disk full".to_string())))
            .unwrap_err();
        assert_eq!(err.to_string(), "worker pool error: disk full");
    }

    #[test]
    fn test_no_tasks() {
        let scheduler = Scheduler::new(Arc::new(InlinePool), Arc::new(Panicky), config(0));
        let summary = scheduler.run(Vec::new(), |_, _| Ok(())).unwrap();
        assert!(summary.tasks.is_empty());
        assert!(summary.timing.is_empty());
    }
}
