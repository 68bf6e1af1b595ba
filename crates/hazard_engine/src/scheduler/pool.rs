//! Worker pools.
//!
//! A pool only runs boxed jobs; what a job does (and how its bytes travel)
//! is up to the scheduler.

use crate::error::EngineError;
use tracing::debug;

/// A unit of work handed to a pool.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Something that can run jobs.
pub trait WorkerPool: Send + Sync {
    /// Runs `job`, now or later, on some thread.
    fn spawn(&self, job: Job);

    /// Number of jobs that can run at once.
    fn num_workers(&self) -> usize;

    /// Short name for logs and reports.
    fn name(&self) -> &'static str;
}

/// Pool backed by a dedicated rayon thread pool.
pub struct RayonPool {
    pool: rayon::ThreadPool,
    num_workers: usize,
}

impl RayonPool {
    /// Creates a pool with `num_workers` threads (at least one).
    ///
    /// # Errors
    ///
    /// [`EngineError::Pool`] if the threads cannot be started.
    pub fn new(num_workers: usize) -> Result<Self, EngineError> {
        let num_workers = num_workers.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_workers)
            .thread_name(|i| format!("hazard-worker-{i}"))
            .build()
            .map_err(|e| EngineError::Pool(e.to_string()))?;
        debug!(num_workers, "rayon pool started");
        Ok(Self { pool, num_workers })
    }
}

impl WorkerPool for RayonPool {
    fn spawn(&self, job: Job) {
        self.pool.spawn(job);
    }

    fn num_workers(&self) -> usize {
        self.num_workers
    }

    fn name(&self) -> &'static str {
        "rayon"
    }
}

/// Runs every job immediately on the calling thread.
#[derive(Clone, Copy, Debug, Default)]
pub struct InlinePool;

impl WorkerPool for InlinePool {
    fn spawn(&self, job: Job) {
        job();
    }

    fn num_workers(&self) -> usize {
        1
    }

    fn name(&self) -> &'static str {
        "inline"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_inline_runs_immediately() {
        let (tx, rx) = mpsc::channel();
        InlinePool.spawn(Box::new(move || tx.send(7).unwrap()));
        assert_eq!(rx.try_recv(), Ok(7));
    }

    #[test]
    fn test_rayon_runs_all_jobs() {
        let pool = RayonPool::new(3).unwrap();
        assert_eq!(pool.num_workers(), 3);
        let (tx, rx) = mpsc::channel();
        for i in 0..20 {
            let tx = tx.clone();
            pool.spawn(Box::new(move || tx.send(i).unwrap()));
        }
        drop(tx);
        let mut got: Vec<i32> = rx.iter().collect();
        got.sort_unstable();
        assert_eq!(got, (0..20).collect::<Vec<_>>());
    }
}
