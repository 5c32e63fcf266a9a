//! Shard planning

use crate::models::ShardIdentity;

/// Expand a shard count into the ordered list of shard identities
pub fn plan(total: usize) -> Vec<ShardIdentity> {
    (0..total)
        .filter_map(|index| ShardIdentity::new(index, total).ok())
        .collect()
}
