//! Engine statistics.
//!
//! Counters are updated with relaxed atomics and can be read while
//! transactions are in flight.
//!
//! ```rust
//! use kvtxn_engine::{OptimisticTransactionDb, OptimisticTransactionOptions, WriteOptions};
//!
//! let db = OptimisticTransactionDb::open_default();
//! let mut txn = db.begin_transaction(&WriteOptions::default(), &OptimisticTransactionOptions::default());
//! txn.put(b"k", b"v").unwrap();
//! txn.commit().unwrap();
//!
//! let stats = db.statistics();
//! assert_eq!(stats.transactions_committed, 1);
//! assert_eq!(stats.keys_written, 1);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

/// Live engine counters shared by every handle on a store.
#[derive(Debug, Default)]
pub(crate) struct EngineStats {
    transactions_started: AtomicU64,
    transactions_committed: AtomicU64,
    transactions_rolled_back: AtomicU64,
    write_conflicts: AtomicU64,
    lock_timeouts: AtomicU64,
    keys_read: AtomicU64,
    keys_written: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    cache_inserts: AtomicU64,
    synced_commits: AtomicU64,
    unlogged_commits: AtomicU64,
}

impl EngineStats {
    /// Creates a zeroed counter set.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_transaction_start(&self) {
        self.transactions_started.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_transaction_commit(&self) {
        self.transactions_committed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_transaction_rollback(&self) {
        self.transactions_rolled_back.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_write_conflict(&self) {
        self.write_conflicts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_lock_timeout(&self) {
        self.lock_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_read(&self) {
        self.keys_read.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_writes(&self, count: u64) {
        self.keys_written.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cache_insert(&self) {
        self.cache_inserts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_commit_durability(&self, sync: bool, disable_wal: bool) {
        if sync {
            self.synced_commits.fetch_add(1, Ordering::Relaxed);
        }
        if disable_wal {
            self.unlogged_commits.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Returns a point-in-time copy of every counter.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            transactions_started: self.transactions_started.load(Ordering::Relaxed),
            transactions_committed: self.transactions_committed.load(Ordering::Relaxed),
            transactions_rolled_back: self.transactions_rolled_back.load(Ordering::Relaxed),
            write_conflicts: self.write_conflicts.load(Ordering::Relaxed),
            lock_timeouts: self.lock_timeouts.load(Ordering::Relaxed),
            keys_read: self.keys_read.load(Ordering::Relaxed),
            keys_written: self.keys_written.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            cache_inserts: self.cache_inserts.load(Ordering::Relaxed),
            synced_commits: self.synced_commits.load(Ordering::Relaxed),
            unlogged_commits: self.unlogged_commits.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time copy of the engine counters.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    /// Transactions begun.
    pub transactions_started: u64,
    /// Transactions committed.
    pub transactions_committed: u64,
    /// Transactions rolled back, explicitly or by drop.
    pub transactions_rolled_back: u64,
    /// Write conflicts detected at commit or lock time.
    pub write_conflicts: u64,
    /// Row-lock waits that timed out.
    pub lock_timeouts: u64,
    /// Point reads served from the store or cache.
    pub keys_read: u64,
    /// Keys written by committed batches.
    pub keys_written: u64,
    /// Reads answered by the block cache.
    pub cache_hits: u64,
    /// Reads that missed the block cache.
    pub cache_misses: u64,
    /// Values inserted into the block cache.
    pub cache_inserts: u64,
    /// Commits issued with `sync` set.
    pub synced_commits: u64,
    /// Commits issued with `disable_wal` set.
    pub unlogged_commits: u64,
}
