//! Worker outcome models
//!
//! Defines how a single shard's run ended and what it printed.

use chrono::{DateTime, Utc};
use std::fmt;

use super::ShardIdentity;

/// Terminal status of one shard's worker process
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShardStatus {
    /// Exited with code 0
    Passed,
    /// Exited with a nonzero code
    Failed { code: i32 },
    /// Terminated by a signal
    Crashed { signal: i32 },
    /// The child process could not be started
    LaunchFailed { reason: String },
    /// Killed because the whole run was interrupted
    Interrupted,
}

impl ShardStatus {
    pub fn symbol(&self) -> &'static str {
        match self {
            ShardStatus::Passed => ".",
            _ => "E",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ShardStatus::Passed)
    }

    /// Human-readable description used in shard headers
    pub fn describe(&self) -> String {
        match self {
            ShardStatus::Passed => "passed".to_string(),
            ShardStatus::Failed { code } => format!("tests failed (exit code {code})"),
            ShardStatus::Crashed { signal } => format!("crashed (signal {signal})"),
            ShardStatus::LaunchFailed { reason } => format!("could not start: {reason}"),
            ShardStatus::Interrupted => "interrupted".to_string(),
        }
    }
}

impl fmt::Display for ShardStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShardStatus::Passed => write!(f, "PASS"),
            ShardStatus::Failed { .. } => write!(f, "FAIL"),
            ShardStatus::Crashed { .. } => write!(f, "CRASH"),
            ShardStatus::LaunchFailed { .. } => write!(f, "ERROR"),
            ShardStatus::Interrupted => write!(f, "INTERRUPTED"),
        }
    }
}

/// Result of running one shard to completion
#[derive(Clone, Debug)]
pub struct WorkerOutcome {
    pub shard: ShardIdentity,
    pub status: ShardStatus,
    /// Combined stdout/stderr of the child, in program order
    pub output: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl WorkerOutcome {
    pub fn new(
        shard: ShardIdentity,
        status: ShardStatus,
        output: impl Into<String>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            shard,
            status,
            output: output.into(),
            started_at,
            finished_at: Utc::now(),
        }
    }

    pub fn launch_failed(shard: ShardIdentity, reason: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            shard,
            status: ShardStatus::LaunchFailed {
                reason: reason.into(),
            },
            output: String::new(),
            started_at: now,
            finished_at: now,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn duration_ms(&self) -> u64 {
        (self.finished_at - self.started_at)
            .num_milliseconds()
            .max(0) as u64
    }
}

impl fmt::Display for WorkerOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} [{}ms] - {}",
            self.status,
            self.shard,
            self.duration_ms(),
            self.status.describe()
        )
    }
}
