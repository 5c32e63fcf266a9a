//! Worker pool scheduler
//!
//! Dispatches shards in index order to at most `jobs` concurrent workers and
//! refills each slot as soon as its worker finishes.

#![allow(dead_code)]

use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::models::{ShardIdentity, WorkerOutcome};

/// Runs a single shard to completion
pub trait ShardRunner: Send + Sync + 'static {
    fn run(
        &self,
        shard: ShardIdentity,
        shutdown: watch::Receiver<bool>,
    ) -> impl Future<Output = WorkerOutcome> + Send;
}

/// Observer notified as each shard finishes, in completion order
pub trait ProgressSink {
    fn shard_finished(&mut self, outcome: &WorkerOutcome);
}

/// Progress sink that ignores every notification
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn shard_finished(&mut self, _outcome: &WorkerOutcome) {}
}

/// Fatal conditions of the pool itself
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("worker task failed after {completed} shard(s) completed: {message}")]
    WorkerPanicked { completed: usize, message: String },
}

/// Everything the pool collected during one run
#[derive(Debug)]
pub struct PoolRun {
    /// Outcomes in completion order
    pub outcomes: Vec<WorkerOutcome>,
    /// Shards never dispatched because the run stopped early
    pub not_dispatched: usize,
    pub interrupted: bool,
}

/// Fixed-size pool of shard workers
pub struct WorkerPool<R> {
    runner: Arc<R>,
    jobs: usize,
}

impl<R: ShardRunner> WorkerPool<R> {
    pub fn new(runner: R, jobs: usize) -> Self {
        Self {
            runner: Arc::new(runner),
            jobs: jobs.max(1),
        }
    }

    pub fn jobs(&self) -> usize {
        self.jobs
    }

    /// Run every planned shard, never more than `jobs` at a time.
    ///
    /// Shard failures never stop the pool. A panicking worker or a raised
    /// shutdown flag stops further dispatch; workers already started are
    /// still awaited before returning.
    pub async fn run(
        &self,
        plan: Vec<ShardIdentity>,
        shutdown: watch::Receiver<bool>,
        progress: &mut dyn ProgressSink,
    ) -> Result<PoolRun, PoolError> {
        info!(
            "Dispatching {} shard(s) to {} worker slot(s)",
            plan.len(),
            self.jobs
        );

        let mut pending = plan.into_iter();
        let mut running: JoinSet<WorkerOutcome> = JoinSet::new();
        let mut outcomes = Vec::new();
        let mut fatal: Option<String> = None;

        loop {
            while running.len() < self.jobs && fatal.is_none() && !*shutdown.borrow() {
                let Some(shard) = pending.next() else {
                    break;
                };
                debug!("Dispatching {}", shard);

                let runner = Arc::clone(&self.runner);
                let rx = shutdown.clone();
                running.spawn(async move { runner.run(shard, rx).await });
            }

            match running.join_next().await {
                None => break,
                Some(Ok(outcome)) => {
                    debug!("Collected {}", outcome);
                    progress.shard_finished(&outcome);
                    outcomes.push(outcome);
                }
                Some(Err(e)) => {
                    error!("Worker task failed: {}", e);
                    fatal.get_or_insert_with(|| e.to_string());
                }
            }
        }

        let not_dispatched = pending.count();

        if let Some(message) = fatal {
            return Err(PoolError::WorkerPanicked {
                completed: outcomes.len(),
                message,
            });
        }

        let interrupted = *shutdown.borrow();
        Ok(PoolRun {
            outcomes,
            not_dispatched,
            interrupted,
        })
    }
}
