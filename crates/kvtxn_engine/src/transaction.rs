//! Engine-native transactions.

use crate::batch::{PendingWrite, WriteBatch};
use crate::checksum::compute_crc32;
use crate::db::DbInner;
use crate::error::{display_key, EngineError, EngineResult};
use crate::iter::TxnIterator;
use crate::options::{ReadOptions, WriteOptions};
use crate::types::{ColumnFamily, SequenceNumber, Snapshot, TransactionId};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// State of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Transaction is active and can perform operations.
    Active,
    /// Transaction has been committed.
    Committed,
    /// Transaction has been rolled back.
    RolledBack,
}

/// Concurrency strategy of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcurrencyMode {
    /// Conflicts are detected at commit.
    Optimistic,
    /// Keys are locked on access.
    Pessimistic,
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum Mode {
    Optimistic,
    Pessimistic { lock_timeout: Duration },
}

#[derive(Debug, Clone, Copy)]
struct SavePoint {
    batch_len: usize,
    tracked_len: usize,
}

/// A transaction over an [`OptimisticTransactionDb`](crate::OptimisticTransactionDb)
/// or a [`TransactionDb`](crate::TransactionDb).
///
/// Writes are buffered until [`commit`](Self::commit) and are visible to
/// this transaction's own reads. Dropping an active transaction rolls it
/// back.
#[derive(Debug)]
pub struct Transaction {
    db: Arc<DbInner>,
    id: TransactionId,
    mode: Mode,
    write_options: WriteOptions,
    state: TransactionState,
    snapshot: Option<Snapshot>,
    batch: WriteBatch,
    /// Keys tracked for conflict detection (optimistic) or locked
    /// (pessimistic), with the sequence they were validated against.
    tracked: HashMap<Vec<u8>, SequenceNumber>,
    /// Tracked keys in first-tracked order, for savepoint rollback.
    tracked_order: Vec<Vec<u8>>,
    savepoints: Vec<SavePoint>,
}

impl Transaction {
    pub(crate) fn begin(
        db: Arc<DbInner>,
        mode: Mode,
        write_options: WriteOptions,
        set_snapshot: bool,
    ) -> Self {
        let id = db.next_txid();
        let snapshot = set_snapshot.then(|| db.snapshot());
        db.stats.record_transaction_start();
        debug!(txn = %id, ?mode, snapshot = ?snapshot.map(|s| s.sequence()), "transaction begin");

        Self {
            db,
            id,
            mode,
            write_options,
            state: TransactionState::Active,
            snapshot,
            batch: WriteBatch::new(),
            tracked: HashMap::new(),
            tracked_order: Vec::new(),
            savepoints: Vec::new(),
        }
    }

    /// Returns the transaction ID.
    #[must_use]
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Checks if the transaction is still active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == TransactionState::Active
    }

    /// Returns the concurrency strategy of the owning store.
    #[must_use]
    pub fn concurrency_mode(&self) -> ConcurrencyMode {
        match self.mode {
            Mode::Optimistic => ConcurrencyMode::Optimistic,
            Mode::Pessimistic { .. } => ConcurrencyMode::Pessimistic,
        }
    }

    /// Returns the attached snapshot, if any.
    #[must_use]
    pub fn snapshot(&self) -> Option<Snapshot> {
        self.snapshot
    }

    /// Returns the write options applied at commit.
    #[must_use]
    pub fn write_options(&self) -> &WriteOptions {
        &self.write_options
    }

    /// Replaces the write options applied at commit.
    pub fn set_write_options(&mut self, write_options: WriteOptions) {
        self.write_options = write_options;
    }

    /// Number of buffered writes, overwrites included.
    #[must_use]
    pub fn pending_write_count(&self) -> usize {
        self.batch.len()
    }

    /// Number of keys tracked for conflict detection or locked.
    #[must_use]
    pub fn tracked_key_count(&self) -> usize {
        self.tracked.len()
    }

    /// Pins the transaction to the latest committed state.
    ///
    /// Subsequent reads see that state (plus this transaction's writes),
    /// and keys tracked from now on are validated against it.
    pub fn set_snapshot(&mut self) {
        let snapshot = self.db.snapshot();
        trace!(txn = %self.id, seq = %snapshot.sequence(), "snapshot set");
        self.snapshot = Some(snapshot);
    }

    /// Detaches the snapshot. Does nothing if none is attached.
    pub fn clear_snapshot(&mut self) {
        if self.snapshot.take().is_some() {
            trace!(txn = %self.id, "snapshot cleared");
        }
    }

    /// Reads `key`, seeing this transaction's own writes first.
    pub fn get(&self, opts: &ReadOptions, key: &[u8]) -> EngineResult<Option<Vec<u8>>> {
        self.ensure_active()?;
        self.read(opts, key)
    }

    /// Reads `key` and registers update intent on it.
    ///
    /// Optimistic transactions record the key for validation at commit;
    /// pessimistic ones lock it, waiting up to the lock timeout.
    pub fn get_for_update(
        &mut self,
        opts: &ReadOptions,
        _column_family: &ColumnFamily,
        key: &[u8],
    ) -> EngineResult<Option<Vec<u8>>> {
        self.ensure_active()?;
        self.track(key)?;
        self.read(opts, key)
    }

    /// Buffers a write of `value` at `key`.
    pub fn put(&mut self, key: &[u8], value: &[u8]) -> EngineResult<()> {
        self.ensure_active()?;
        self.track(key)?;
        self.batch.put(key, value);
        Ok(())
    }

    /// Buffers a deletion of `key`.
    pub fn delete(&mut self, key: &[u8]) -> EngineResult<()> {
        self.ensure_active()?;
        self.track(key)?;
        self.batch.delete(key);
        Ok(())
    }

    /// Commits all buffered writes atomically.
    ///
    /// Returns the sequence number of the commit, or of the latest commit
    /// if nothing was written. On a write conflict nothing is applied and
    /// the transaction stays active, so it can still be rolled back.
    pub fn commit(&mut self) -> EngineResult<SequenceNumber> {
        self.ensure_active()?;

        let guard = self.db.commit_guard();
        if let Mode::Optimistic = self.mode {
            self.validate()?;
        }

        let sequence = if self.batch.is_empty() {
            self.db.store.latest_sequence()
        } else {
            let writes = self.batch.latest().map(|(key, write)| match write {
                PendingWrite::Put { value } => (key, Some(value.as_slice())),
                PendingWrite::Delete => (key, None),
            });
            let seq = self.db.store.apply(writes);
            self.db.stats.record_writes(self.batch.key_count() as u64);
            self.db.stats.record_commit_durability(
                self.write_options.sync,
                self.write_options.disable_wal,
            );
            seq
        };
        drop(guard);

        self.release_locks();
        self.state = TransactionState::Committed;
        self.db.stats.record_transaction_commit();
        debug!(
            txn = %self.id,
            %sequence,
            writes = self.batch.key_count(),
            sync = self.write_options.sync,
            "transaction committed"
        );
        Ok(sequence)
    }

    /// Discards all buffered writes and releases held locks.
    pub fn rollback(&mut self) -> EngineResult<()> {
        self.ensure_active()?;
        self.abandon();
        debug!(txn = %self.id, "transaction rolled back");
        Ok(())
    }

    /// Pushes a savepoint capturing the current buffered state.
    pub fn set_savepoint(&mut self) {
        self.savepoints.push(SavePoint {
            batch_len: self.batch.len(),
            tracked_len: self.tracked_order.len(),
        });
        trace!(txn = %self.id, depth = self.savepoints.len(), "savepoint set");
    }

    /// Undoes everything buffered since the newest savepoint and pops it.
    ///
    /// Keys first tracked after the savepoint are untracked; in pessimistic
    /// mode their locks are released.
    pub fn rollback_to_savepoint(&mut self) -> EngineResult<()> {
        self.ensure_active()?;
        let savepoint = self.savepoints.pop().ok_or(EngineError::NoSavepoint)?;

        self.batch.truncate(savepoint.batch_len);
        let untracked = self.tracked_order.split_off(savepoint.tracked_len);
        for key in &untracked {
            self.tracked.remove(key);
        }
        if let Mode::Pessimistic { .. } = self.mode {
            self.db
                .locks
                .release(self.id, untracked.iter().map(Vec::as_slice));
        }

        trace!(
            txn = %self.id,
            depth = self.savepoints.len(),
            untracked = untracked.len(),
            "rolled back to savepoint"
        );
        Ok(())
    }

    /// Discards the newest savepoint without undoing any writes.
    pub fn pop_savepoint(&mut self) -> EngineResult<()> {
        self.ensure_active()?;
        self.savepoints.pop().ok_or(EngineError::NoSavepoint)?;
        trace!(txn = %self.id, depth = self.savepoints.len(), "savepoint popped");
        Ok(())
    }

    /// Returns an iterator over this transaction's view.
    ///
    /// The view is this transaction's buffered writes layered over the
    /// committed state at its read sequence, captured when the iterator is
    /// created. Capturing copies every visible key below
    /// `iterate_upper_bound`.
    pub fn iter(&self, opts: &ReadOptions) -> EngineResult<TxnIterator<'_>> {
        self.ensure_active()?;
        let read_seq = self.read_sequence(opts);
        let upper = opts.iterate_upper_bound.as_deref();

        let mut merged = BTreeMap::new();
        let mut corrupt = None;
        self.db
            .store
            .scan(read_seq, opts.ignore_range_deletions, upper, |key, version| {
                if opts.verify_checksums && compute_crc32(version.value) != version.checksum {
                    corrupt.get_or_insert_with(|| key.to_vec());
                    return;
                }
                merged.insert(key.to_vec(), version.value.to_vec());
            });
        if let Some(key) = corrupt {
            return Err(EngineError::corruption(format!(
                "checksum mismatch for key {} during iteration",
                display_key(&key)
            )));
        }

        for (key, write) in self.batch.latest() {
            if upper.is_some_and(|bound| key >= bound) {
                continue;
            }
            match write {
                PendingWrite::Put { value } => {
                    merged.insert(key.to_vec(), value.clone());
                }
                PendingWrite::Delete => {
                    merged.remove(key);
                }
            }
        }

        Ok(TxnIterator::new(merged.into_iter().collect()))
    }

    fn read(&self, opts: &ReadOptions, key: &[u8]) -> EngineResult<Option<Vec<u8>>> {
        if let Some(write) = self.batch.get(key) {
            return Ok(match write {
                PendingWrite::Put { value } => Some(value.clone()),
                PendingWrite::Delete => None,
            });
        }
        self.db.read(opts, key, self.read_sequence(opts))
    }

    fn read_sequence(&self, opts: &ReadOptions) -> SequenceNumber {
        opts.snapshot
            .or(self.snapshot)
            .map_or_else(|| self.db.store.latest_sequence(), |s| s.sequence())
    }

    /// Registers update intent on `key`.
    fn track(&mut self, key: &[u8]) -> EngineResult<()> {
        if self.tracked.contains_key(key) {
            return Ok(());
        }

        let seq = match self.mode {
            Mode::Optimistic => self
                .snapshot
                .map_or_else(|| self.db.store.latest_sequence(), |s| s.sequence()),
            Mode::Pessimistic { lock_timeout } => {
                if let Err(err) = self.db.locks.acquire(self.id, key, lock_timeout) {
                    self.db.stats.record_lock_timeout();
                    warn!(txn = %self.id, key = %display_key(key), ?lock_timeout, "lock wait timed out");
                    return Err(err);
                }
                match self.snapshot {
                    Some(snapshot) => {
                        let written_after = self
                            .db
                            .store
                            .latest_version_seq(key)
                            .is_some_and(|seq| seq > snapshot.sequence());
                        if written_after {
                            self.db.locks.release(self.id, [key]);
                            self.db.stats.record_write_conflict();
                            debug!(txn = %self.id, key = %display_key(key), "key changed after snapshot");
                            return Err(EngineError::SnapshotConflict { key: key.to_vec() });
                        }
                        snapshot.sequence()
                    }
                    None => self.db.store.latest_sequence(),
                }
            }
        };

        self.tracked.insert(key.to_vec(), seq);
        self.tracked_order.push(key.to_vec());
        Ok(())
    }

    /// Checks that no tracked key was committed after it was tracked.
    ///
    /// Must run under the commit guard.
    fn validate(&self) -> EngineResult<()> {
        for key in &self.tracked_order {
            let Some(&tracked_at) = self.tracked.get(key) else {
                continue;
            };
            let newer = self
                .db
                .store
                .latest_version_seq(key)
                .is_some_and(|seq| seq > tracked_at);
            if newer {
                self.db.stats.record_write_conflict();
                debug!(txn = %self.id, key = %display_key(key), %tracked_at, "commit conflict");
                return Err(EngineError::WriteConflict { key: key.clone() });
            }
        }
        Ok(())
    }

    fn release_locks(&mut self) {
        if let Mode::Pessimistic { .. } = self.mode {
            self.db
                .locks
                .release(self.id, self.tracked_order.iter().map(Vec::as_slice));
        }
        self.tracked.clear();
        self.tracked_order.clear();
        self.savepoints.clear();
    }

    fn abandon(&mut self) {
        self.batch.clear();
        self.release_locks();
        self.state = TransactionState::RolledBack;
        self.db.stats.record_transaction_rollback();
    }

    /// Ensures the transaction is active.
    fn ensure_active(&self) -> EngineResult<()> {
        match self.state {
            TransactionState::Active => Ok(()),
            TransactionState::Committed => Err(EngineError::invalid_operation(
                "transaction already committed",
            )),
            TransactionState::RolledBack => Err(EngineError::invalid_operation(
                "transaction already rolled back",
            )),
        }
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if self.is_active() {
            self.abandon();
            debug!(txn = %self.id, "active transaction dropped, rolled back");
        }
    }
}
