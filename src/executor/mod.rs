//! Sharded test execution engine
//!
//! Plans shards, runs each one in its own worker process and bounds how many
//! run at once.

mod plan;
mod pool;
mod runner;
mod worker;

pub use plan::plan;
pub use pool::{ProgressSink, ShardRunner, WorkerPool};

#[cfg(test)]
pub use pool::NoProgress;
pub use runner::ShardedRun;
pub use worker::ProcessWorker;

use tokio::sync::watch;

/// Resolve once the shutdown flag is raised; pend forever if the sender is gone
pub(crate) async fn shutdown_requested(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
