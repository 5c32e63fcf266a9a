//! Data models for sharded test runs
//!
//! Shard identities, per-shard outcomes and the aggregated run report.

mod outcome;
mod report;
mod shard;

pub use outcome::{ShardStatus, WorkerOutcome};
pub use report::RunReport;
pub use shard::ShardIdentity;
