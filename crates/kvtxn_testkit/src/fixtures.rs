//! Store fixtures.
//!
//! Provides fresh stores of either concurrency mode behind one type, so a
//! test body can be run against both.

use kvtxn_core::{PendingTx, TransactionHandle};
use kvtxn_engine::{
    ConcurrencyMode, EngineConfig, OptimisticTransactionDb, ReadOptions, SequenceNumber,
    StatsSnapshot, TransactionDb,
};
use std::time::Duration;

/// A fresh in-memory store of either mode.
#[derive(Debug, Clone)]
pub enum TestStore {
    /// Optimistic store.
    Optimistic(OptimisticTransactionDb),
    /// Pessimistic store.
    Pessimistic(TransactionDb),
}

impl TestStore {
    /// Opens a store of the given mode with `config`.
    pub fn open(mode: ConcurrencyMode, config: EngineConfig) -> Self {
        match mode {
            ConcurrencyMode::Optimistic => Self::Optimistic(OptimisticTransactionDb::open(config)),
            ConcurrencyMode::Pessimistic => Self::Pessimistic(TransactionDb::open(config)),
        }
    }

    /// Opens an optimistic store with default configuration.
    pub fn optimistic() -> Self {
        Self::open(ConcurrencyMode::Optimistic, EngineConfig::default())
    }

    /// Opens a pessimistic store with default configuration.
    pub fn pessimistic() -> Self {
        Self::open(ConcurrencyMode::Pessimistic, EngineConfig::default())
    }

    /// Concurrency mode of the store.
    pub fn mode(&self) -> ConcurrencyMode {
        match self {
            Self::Optimistic(_) => ConcurrencyMode::Optimistic,
            Self::Pessimistic(_) => ConcurrencyMode::Pessimistic,
        }
    }

    /// An unstarted typed handle bound to this store.
    pub fn pending(&self) -> PendingTx {
        match self {
            Self::Optimistic(db) => PendingTx::optimistic(db),
            Self::Pessimistic(db) => PendingTx::pessimistic(db),
        }
    }

    /// An unstarted runtime-checked handle bound to this store.
    pub fn handle(&self) -> TransactionHandle {
        match self {
            Self::Optimistic(db) => TransactionHandle::optimistic(db),
            Self::Pessimistic(db) => TransactionHandle::pessimistic(db),
        }
    }

    /// Committed value of `key`, as seen outside any transaction.
    ///
    /// # Panics
    ///
    /// Panics if the read fails.
    pub fn committed(&self, key: &[u8]) -> Option<Vec<u8>> {
        let opts = ReadOptions::default();
        let value = match self {
            Self::Optimistic(db) => db.get(&opts, key),
            Self::Pessimistic(db) => db.get(&opts, key),
        };
        value.expect("committed read failed")
    }

    /// Commits a single put outside any handle.
    ///
    /// # Panics
    ///
    /// Panics if the write fails.
    pub fn seed(&self, key: &[u8], value: &[u8]) -> SequenceNumber {
        let seq = match self {
            Self::Optimistic(db) => db.put(key, value),
            Self::Pessimistic(db) => db.put(key, value),
        };
        seq.expect("seed write failed")
    }

    /// Writes a range tombstone over `[start, end)`.
    pub fn delete_range(&self, start: &[u8], end: &[u8]) -> SequenceNumber {
        match self {
            Self::Optimistic(db) => db.delete_range(start, end),
            Self::Pessimistic(db) => db.delete_range(start, end),
        }
    }

    /// Damages the checksum of the newest version of `key`.
    pub fn inject_corruption(&self, key: &[u8]) -> bool {
        match self {
            Self::Optimistic(db) => db.inject_corruption(key),
            Self::Pessimistic(db) => db.inject_corruption(key),
        }
    }

    /// Latest committed sequence.
    pub fn latest_sequence(&self) -> SequenceNumber {
        match self {
            Self::Optimistic(db) => db.latest_sequence(),
            Self::Pessimistic(db) => db.latest_sequence(),
        }
    }

    /// Store statistics.
    pub fn statistics(&self) -> StatsSnapshot {
        match self {
            Self::Optimistic(db) => db.statistics(),
            Self::Pessimistic(db) => db.statistics(),
        }
    }
}

/// Configuration with a short lock timeout, for tests that expect
/// contention to fail fast.
pub fn fast_timeout_config() -> EngineConfig {
    EngineConfig::new().lock_timeout(Duration::from_millis(20))
}

/// Runs `f` once against a fresh store of each mode.
pub fn for_each_mode<F>(mut f: F)
where
    F: FnMut(TestStore),
{
    f(TestStore::optimistic());
    f(TestStore::pessimistic());
}
