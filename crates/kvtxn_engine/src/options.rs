//! Per-operation option sets.

use crate::types::Snapshot;
use std::time::Duration;

/// Options applied to reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOptions {
    /// Recompute and compare the stored checksum of every value read.
    pub verify_checksums: bool,
    /// Insert values read from the store into the block cache.
    pub fill_cache: bool,
    /// Skip range-tombstone checks. Keys covered by a range deletion stay
    /// visible when this is set.
    pub ignore_range_deletions: bool,
    /// Read at this snapshot instead of the transaction's own view.
    pub snapshot: Option<Snapshot>,
    /// Exclusive upper bound for iterators.
    pub iterate_upper_bound: Option<Vec<u8>>,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            verify_checksums: true,
            fill_cache: true,
            ignore_range_deletions: false,
            snapshot: None,
            iterate_upper_bound: None,
        }
    }
}

/// Options applied when a transaction's writes are committed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Request a durable sync of the commit.
    pub sync: bool,
    /// Skip the write-ahead log for the commit.
    pub disable_wal: bool,
}

/// Options for transactions on an optimistic store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptimisticTransactionOptions {
    /// Take a snapshot when the transaction begins.
    pub set_snapshot: bool,
}

/// Options for transactions on a pessimistic store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionOptions {
    /// Take a snapshot when the transaction begins.
    pub set_snapshot: bool,
    /// Row-lock wait limit; `None` uses the store default.
    pub lock_timeout: Option<Duration>,
}
