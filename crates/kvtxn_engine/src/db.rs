//! Optimistic and pessimistic transactional stores.

use crate::cache::BlockCache;
use crate::checksum::compute_crc32;
use crate::config::EngineConfig;
use crate::error::{display_key, EngineError, EngineResult};
use crate::lock::LockManager;
use crate::options::{
    OptimisticTransactionOptions, ReadOptions, TransactionOptions, WriteOptions,
};
use crate::stats::{EngineStats, StatsSnapshot};
use crate::transaction::{Mode, Transaction};
use crate::types::{ColumnFamily, SequenceNumber, Snapshot, TransactionId};
use crate::store::VersionedStore;
use parking_lot::{Mutex, MutexGuard};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// State shared by every handle and transaction on one store.
#[derive(Debug)]
pub(crate) struct DbInner {
    pub(crate) config: EngineConfig,
    pub(crate) store: VersionedStore,
    pub(crate) cache: BlockCache,
    pub(crate) locks: LockManager,
    pub(crate) stats: EngineStats,
    /// Serializes commit validation with batch application.
    commit_lock: Mutex<()>,
    next_txid: AtomicU64,
}

impl DbInner {
    fn new(config: EngineConfig) -> Self {
        Self {
            cache: BlockCache::new(config.block_cache_capacity),
            config,
            store: VersionedStore::new(),
            locks: LockManager::new(),
            stats: EngineStats::new(),
            commit_lock: Mutex::new(()),
            next_txid: AtomicU64::new(1),
        }
    }

    pub(crate) fn next_txid(&self) -> TransactionId {
        TransactionId::new(self.next_txid.fetch_add(1, Ordering::SeqCst))
    }

    pub(crate) fn snapshot(&self) -> Snapshot {
        Snapshot::at(self.store.latest_sequence())
    }

    pub(crate) fn commit_guard(&self) -> MutexGuard<'_, ()> {
        self.commit_lock.lock()
    }

    /// Point read of committed state at `read_seq`.
    pub(crate) fn read(
        &self,
        opts: &ReadOptions,
        key: &[u8],
        read_seq: SequenceNumber,
    ) -> EngineResult<Option<Vec<u8>>> {
        self.stats.record_read();
        let found = self.store.with_live_version(
            key,
            read_seq,
            opts.ignore_range_deletions,
            |version| {
                if let Some(value) = self.cache.get(key, version.seq) {
                    self.stats.record_cache_hit();
                    return Ok(value);
                }
                self.stats.record_cache_miss();

                if opts.verify_checksums && compute_crc32(version.value) != version.checksum {
                    return Err(EngineError::corruption(format!(
                        "checksum mismatch for key {} at {}",
                        display_key(key),
                        version.seq
                    )));
                }

                let value = version.value.to_vec();
                if opts.fill_cache {
                    self.cache.insert(key, version.seq, value.clone());
                    self.stats.record_cache_insert();
                }
                Ok(value)
            },
        );
        found.transpose()
    }
}

macro_rules! impl_store_common {
    ($store:ident) => {
        impl $store {
            /// Opens an empty store.
            #[must_use]
            pub fn open(config: EngineConfig) -> Self {
                tracing::debug!(
                    store = stringify!($store),
                    lock_timeout = ?config.lock_timeout,
                    block_cache_capacity = config.block_cache_capacity,
                    "opening store"
                );
                Self {
                    inner: Arc::new(DbInner::new(config)),
                }
            }

            /// Opens an empty store with the default configuration.
            #[must_use]
            pub fn open_default() -> Self {
                Self::open(EngineConfig::default())
            }

            /// Returns the store configuration.
            #[must_use]
            pub fn config(&self) -> &EngineConfig {
                &self.inner.config
            }

            /// Returns the default column family.
            #[must_use]
            pub fn default_column_family(&self) -> ColumnFamily {
                ColumnFamily::default_family()
            }

            /// Takes a snapshot of the latest committed state.
            #[must_use]
            pub fn snapshot(&self) -> Snapshot {
                self.inner.snapshot()
            }

            /// Sequence number of the most recent commit.
            #[must_use]
            pub fn latest_sequence(&self) -> SequenceNumber {
                self.inner.store.latest_sequence()
            }

            /// Reads committed state outside any transaction.
            ///
            /// Honors `opts.snapshot`; otherwise reads the latest commit.
            pub fn get(&self, opts: &ReadOptions, key: &[u8]) -> EngineResult<Option<Vec<u8>>> {
                let read_seq = opts
                    .snapshot
                    .map_or_else(|| self.inner.store.latest_sequence(), |s| s.sequence());
                self.inner.read(opts, key, read_seq)
            }

            /// Deletes every key in `[start, end)` with a range tombstone.
            ///
            /// Reads with `ignore_range_deletions` set do not see the
            /// tombstone.
            pub fn delete_range(&self, start: &[u8], end: &[u8]) -> SequenceNumber {
                let _guard = self.inner.commit_guard();
                let seq = self.inner.store.delete_range(start, end);
                tracing::debug!(%seq, "range tombstone written");
                seq
            }

            /// Returns a copy of the store statistics.
            #[must_use]
            pub fn statistics(&self) -> StatsSnapshot {
                self.inner.stats.snapshot()
            }

            /// Damages the stored checksum of the newest version of `key`.
            ///
            /// For fault-injection tests: a later checksum-verifying read of
            /// that version reports [`EngineError::Corruption`]. Returns
            /// false if the key has no live version.
            pub fn inject_corruption(&self, key: &[u8]) -> bool {
                match self.inner.store.corrupt_latest(key) {
                    Some(seq) => {
                        self.inner.cache.invalidate(key, seq);
                        tracing::warn!(key = %display_key(key), %seq, "checksum corrupted");
                        true
                    }
                    None => false,
                }
            }

            /// Returns the transaction currently holding the row lock on `key`.
            #[must_use]
            pub fn lock_holder(&self, key: &[u8]) -> Option<TransactionId> {
                self.inner.locks.holder(key)
            }
        }
    };
}

/// A store whose transactions detect conflicts at commit time.
///
/// Transactions never block each other. Keys written or read for update
/// are validated at commit; if another transaction committed a newer
/// version in the meantime the commit fails with
/// [`EngineError::WriteConflict`].
///
/// ```rust
/// use kvtxn_engine::{OptimisticTransactionDb, OptimisticTransactionOptions, ReadOptions, WriteOptions};
///
/// let db = OptimisticTransactionDb::open_default();
/// let mut txn = db.begin_transaction(&WriteOptions::default(), &OptimisticTransactionOptions::default());
/// txn.put(b"a", b"1").unwrap();
/// assert_eq!(txn.get(&ReadOptions::default(), b"a").unwrap(), Some(b"1".to_vec()));
/// txn.commit().unwrap();
/// assert_eq!(db.get(&ReadOptions::default(), b"a").unwrap(), Some(b"1".to_vec()));
/// ```
#[derive(Debug, Clone)]
pub struct OptimisticTransactionDb {
    inner: Arc<DbInner>,
}

impl_store_common!(OptimisticTransactionDb);

impl OptimisticTransactionDb {
    /// Begins an optimistic transaction.
    pub fn begin_transaction(
        &self,
        write_options: &WriteOptions,
        txn_options: &OptimisticTransactionOptions,
    ) -> Transaction {
        Transaction::begin(
            Arc::clone(&self.inner),
            Mode::Optimistic,
            write_options.clone(),
            txn_options.set_snapshot,
        )
    }

    /// Writes `value` at `key` in its own transaction.
    pub fn put(&self, key: &[u8], value: &[u8]) -> EngineResult<SequenceNumber> {
        let mut txn = self.begin_transaction(
            &WriteOptions::default(),
            &OptimisticTransactionOptions::default(),
        );
        txn.put(key, value)?;
        txn.commit()
    }

    /// Deletes `key` in its own transaction.
    pub fn delete(&self, key: &[u8]) -> EngineResult<SequenceNumber> {
        let mut txn = self.begin_transaction(
            &WriteOptions::default(),
            &OptimisticTransactionOptions::default(),
        );
        txn.delete(key)?;
        txn.commit()
    }
}

/// A store whose transactions lock keys as they access them.
///
/// Writes and reads for update take an exclusive row lock that is held
/// until commit or rollback. A transaction that cannot get a lock within
/// its timeout fails with [`EngineError::LockTimeout`].
#[derive(Debug, Clone)]
pub struct TransactionDb {
    inner: Arc<DbInner>,
}

impl_store_common!(TransactionDb);

impl TransactionDb {
    /// Begins a pessimistic transaction.
    pub fn begin_transaction(
        &self,
        write_options: &WriteOptions,
        txn_options: &TransactionOptions,
    ) -> Transaction {
        let lock_timeout = txn_options
            .lock_timeout
            .unwrap_or(self.inner.config.lock_timeout);
        Transaction::begin(
            Arc::clone(&self.inner),
            Mode::Pessimistic { lock_timeout },
            write_options.clone(),
            txn_options.set_snapshot,
        )
    }

    /// Writes `value` at `key` in its own transaction.
    pub fn put(&self, key: &[u8], value: &[u8]) -> EngineResult<SequenceNumber> {
        let mut txn =
            self.begin_transaction(&WriteOptions::default(), &TransactionOptions::default());
        txn.put(key, value)?;
        txn.commit()
    }

    /// Deletes `key` in its own transaction.
    pub fn delete(&self, key: &[u8]) -> EngineResult<SequenceNumber> {
        let mut txn =
            self.begin_transaction(&WriteOptions::default(), &TransactionOptions::default());
        txn.delete(key)?;
        txn.commit()
    }
}
