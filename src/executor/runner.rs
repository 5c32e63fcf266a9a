//! Sharded run orchestration
//!
//! Wires the shard plan, the worker pool and the aggregator together for one
//! validated configuration.

use anyhow::{Context, Result};
use tokio::sync::watch;
use tracing::{info, warn};

use super::{plan, ProcessWorker, ProgressSink, ShardRunner, WorkerPool};
use crate::config::RunConfig;
use crate::models::RunReport;
use crate::utils::Timer;

/// One sharded execution of a test binary
pub struct ShardedRun<R> {
    shards: usize,
    pool: WorkerPool<R>,
}

impl ShardedRun<ProcessWorker> {
    /// Run the configured binary in real worker processes
    pub fn new(config: &RunConfig) -> Self {
        Self::with_runner(config, ProcessWorker::new(config))
    }
}

impl<R: ShardRunner> ShardedRun<R> {
    pub fn with_runner(config: &RunConfig, runner: R) -> Self {
        Self {
            shards: config.shards,
            pool: WorkerPool::new(runner, config.jobs),
        }
    }

    /// Run every shard and aggregate the outcomes
    pub async fn run(
        &self,
        shutdown: watch::Receiver<bool>,
        progress: &mut dyn ProgressSink,
    ) -> Result<RunReport> {
        info!(
            "Running {} shard(s) with {} job(s)",
            self.shards,
            self.pool.jobs()
        );

        let timer = Timer::start("sharded run");
        let run = self
            .pool
            .run(plan(self.shards), shutdown, progress)
            .await
            .context("Worker pool aborted")?;

        if run.interrupted {
            warn!(
                "Run interrupted: {} shard(s) collected, {} never started",
                run.outcomes.len(),
                run.not_dispatched
            );
        }

        let report = RunReport::new(self.shards, run.outcomes, timer.stop())
            .with_interrupted(run.interrupted);

        info!(
            "Run completed in {}ms - {}",
            report.duration.as_millis(),
            report
        );

        Ok(report)
    }
}
