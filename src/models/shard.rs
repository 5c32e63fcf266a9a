//! Shard identity
//!
//! A shard is one disjoint slice of the test binary's test set, addressed by
//! its zero-based index and the total number of slices.

#![allow(dead_code)]

use std::fmt;
use thiserror::Error;

/// Errors raised when constructing a shard identity
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShardError {
    #[error("shard total must be at least 1")]
    EmptyTotal,

    #[error("shard index {index} out of range for {total} shards")]
    IndexOutOfRange { index: usize, total: usize },
}

/// Identity of a single shard: `(index, total)` with `index < total`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShardIdentity {
    index: usize,
    total: usize,
}

impl ShardIdentity {
    pub fn new(index: usize, total: usize) -> Result<Self, ShardError> {
        if total == 0 {
            return Err(ShardError::EmptyTotal);
        }
        if index >= total {
            return Err(ShardError::IndexOutOfRange { index, total });
        }
        Ok(Self { index, total })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Value for `GTEST_SHARD_INDEX`
    pub fn index_env(&self) -> String {
        self.index.to_string()
    }

    /// Value for `GTEST_TOTAL_SHARDS`
    pub fn total_env(&self) -> String {
        self.total.to_string()
    }
}

impl fmt::Display for ShardIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "shard {}/{}", self.index, self.total)
    }
}
