//! Aggregated run report
//!
//! Collapses the unordered set of worker outcomes into a deterministic,
//! index-ordered view with an overall verdict.

#![allow(dead_code)]

use std::fmt;
use std::time::Duration;

use super::WorkerOutcome;

/// Exit code used when the run was interrupted by the user
pub const INTERRUPTED_EXIT_CODE: u8 = 130;

/// Aggregate view of a whole sharded run
#[derive(Clone, Debug)]
pub struct RunReport {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    /// Planned shards that were never dispatched
    pub not_run: usize,
    pub interrupted: bool,
    pub duration: Duration,
    /// Every collected outcome, sorted by shard index
    pub outcomes: Vec<WorkerOutcome>,
}

impl RunReport {
    pub fn new(total: usize, mut outcomes: Vec<WorkerOutcome>, duration: Duration) -> Self {
        outcomes.sort_by_key(|o| o.shard.index());

        let passed = outcomes.iter().filter(|o| o.is_success()).count();
        let failed = outcomes.len() - passed;
        let not_run = total.saturating_sub(outcomes.len());

        Self {
            total,
            passed,
            failed,
            not_run,
            interrupted: false,
            duration,
            outcomes,
        }
    }

    pub fn with_interrupted(mut self, interrupted: bool) -> Self {
        self.interrupted = interrupted;
        self
    }

    /// Failed outcomes in shard index order
    pub fn failures(&self) -> impl Iterator<Item = &WorkerOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    pub fn is_success(&self) -> bool {
        !self.interrupted && self.failed == 0 && self.not_run == 0 && self.total > 0
    }

    /// Process exit code: 0 on success, otherwise the failure count clamped to a byte
    pub fn exit_code(&self) -> u8 {
        if self.interrupted {
            INTERRUPTED_EXIT_CODE
        } else if self.is_success() {
            0
        } else {
            (self.failed + self.not_run).clamp(1, 255) as u8
        }
    }

    pub fn verdict(&self) -> &'static str {
        if self.is_success() {
            "PASSED"
        } else {
            "FAILED"
        }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} passed, {} failed", self.passed, self.failed)?;
        if self.not_run > 0 {
            write!(f, ", {} not run", self.not_run)?;
        }
        write!(f, ", overall: {}", self.verdict())
    }
}
