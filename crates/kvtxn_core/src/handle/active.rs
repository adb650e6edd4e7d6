//! Active handle.

use super::Backing;
use crate::error::TxResult;
use kvtxn_engine::{
    ColumnFamily, ConcurrencyMode, ReadOptions, SequenceNumber, Transaction, TransactionId,
    TxnIterator, WriteOptions,
};
use tracing::{debug, trace};

/// A handle whose transaction is running.
///
/// [`commit`](Self::commit) and [`rollback`](Self::rollback) consume the
/// handle. Dropping it without either rolls the transaction back.
#[derive(Debug)]
pub struct ActiveTx {
    backing: Backing,
    column_family: ColumnFamily,
    read_options: ReadOptions,
    txn: Transaction,
}

impl ActiveTx {
    pub(crate) fn new(backing: Backing, txn: Transaction, read_options: ReadOptions) -> Self {
        let column_family = backing.default_column_family();
        Self {
            backing,
            column_family,
            read_options,
            txn,
        }
    }

    /// Identifier of the running transaction.
    #[must_use]
    pub fn id(&self) -> TransactionId {
        self.txn.id()
    }

    /// Concurrency strategy of the bound store.
    #[must_use]
    pub fn mode(&self) -> ConcurrencyMode {
        self.backing.mode()
    }

    /// The bound store.
    #[must_use]
    pub fn backing(&self) -> &Backing {
        &self.backing
    }

    /// Current read options.
    #[must_use]
    pub fn read_options(&self) -> &ReadOptions {
        &self.read_options
    }

    /// Sets read-time checksum verification for subsequent reads.
    pub fn verify_checksums(&mut self, verify: bool) {
        self.read_options.verify_checksums = verify;
    }

    /// Sets whether subsequent reads populate the block cache.
    pub fn fill_cache(&mut self, fill: bool) {
        self.read_options.fill_cache = fill;
    }

    /// Replaces the write options used at commit.
    pub fn set_write_options(&mut self, write_options: WriteOptions) {
        self.txn.set_write_options(write_options);
    }

    /// Pins the transaction to the latest committed state.
    pub fn attach_snapshot(&mut self) {
        self.txn.set_snapshot();
    }

    /// Detaches the snapshot, if any.
    pub fn detach_snapshot(&mut self) {
        self.txn.clear_snapshot();
    }

    /// Whether a snapshot is attached.
    #[must_use]
    pub fn has_snapshot(&self) -> bool {
        self.txn.snapshot().is_some()
    }

    /// Looks up `key` in the default column family.
    ///
    /// With `for_update`, the key is also registered for update: locked on
    /// a pessimistic store, recorded for commit validation on an
    /// optimistic one. A missing key is `Ok(None)`.
    pub fn get(&mut self, key: &[u8], for_update: bool) -> TxResult<Option<Vec<u8>>> {
        let value = if for_update {
            self.txn
                .get_for_update(&self.read_options, &self.column_family, key)?
        } else {
            self.txn.get(&self.read_options, key)?
        };
        Ok(value)
    }

    /// Buffers a write of `value` at `key`.
    pub fn put(&mut self, key: &[u8], value: &[u8]) -> TxResult<()> {
        self.txn.put(key, value)?;
        Ok(())
    }

    /// Buffers a deletion of `key`.
    pub fn del(&mut self, key: &[u8]) -> TxResult<()> {
        self.txn.delete(key)?;
        Ok(())
    }

    /// Pushes a savepoint.
    pub fn set_savepoint(&mut self) {
        self.txn.set_savepoint();
    }

    /// Undoes the writes buffered since the newest savepoint and pops it.
    pub fn rollback_to_savepoint(&mut self) -> TxResult<()> {
        self.txn.rollback_to_savepoint()?;
        Ok(())
    }

    /// Pops the newest savepoint, keeping buffered writes.
    pub fn pop_savepoint(&mut self) -> TxResult<()> {
        self.txn.pop_savepoint()?;
        Ok(())
    }

    /// Iterates over this transaction's view with the current read options.
    ///
    /// The iterator borrows the handle, so it cannot outlive it or be held
    /// across a commit.
    pub fn iterator(&self) -> TxResult<TxnIterator<'_>> {
        Ok(self.txn.iter(&self.read_options)?)
    }

    /// Commits all buffered writes.
    ///
    /// The handle is consumed either way; when the commit fails the
    /// transaction is rolled back and its locks are released.
    pub fn commit(self) -> TxResult<SequenceNumber> {
        let Self { mut txn, .. } = self;
        match txn.commit() {
            Ok(seq) => Ok(seq),
            Err(err) => {
                debug!(txn = %txn.id(), error = %err, "commit failed, rolling back");
                txn.rollback()?;
                Err(err.into())
            }
        }
    }

    /// Discards all buffered writes and releases locks.
    pub fn rollback(self) -> TxResult<()> {
        let Self { mut txn, .. } = self;
        txn.rollback()?;
        trace!(txn = %txn.id(), "handle rolled back");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{PendingTx, TxError};
    use kvtxn_engine::{EngineConfig, OptimisticTransactionDb, ReadOptions, TransactionDb};
    use std::time::Duration;

    #[test]
    fn read_your_own_writes() {
        let db = OptimisticTransactionDb::open_default();
        let mut tx = PendingTx::optimistic(&db).start();
        tx.put(b"a", b"1").unwrap();
        assert_eq!(tx.get(b"a", false).unwrap(), Some(b"1".to_vec()));
        tx.del(b"a").unwrap();
        assert_eq!(tx.get(b"a", true).unwrap(), None);
        tx.commit().unwrap();
        assert_eq!(db.get(&ReadOptions::default(), b"a").unwrap(), None);
    }

    #[test]
    fn failed_commit_rolls_back() {
        let db = OptimisticTransactionDb::open_default();
        let mut t1 = PendingTx::optimistic(&db).start();
        let mut t2 = PendingTx::optimistic(&db).start();

        t1.get(b"k", true).unwrap();
        t2.get(b"k", true).unwrap();
        t1.put(b"k", b"one").unwrap();
        t2.put(b"k", b"two").unwrap();

        t1.commit().unwrap();
        let err = t2.commit().unwrap_err();
        assert!(matches!(err, TxError::Conflict(_)));
        assert_eq!(
            db.get(&ReadOptions::default(), b"k").unwrap(),
            Some(b"one".to_vec())
        );
        let stats = db.statistics();
        assert_eq!(stats.transactions_committed, 1);
        assert_eq!(stats.transactions_rolled_back, 1);
    }

    #[test]
    fn pessimistic_for_update_times_out() {
        let db = TransactionDb::open(EngineConfig::new().lock_timeout(Duration::ZERO));
        let mut holder = PendingTx::pessimistic(&db).start();
        holder.get(b"row", true).unwrap();

        let mut waiter = PendingTx::pessimistic(&db).start();
        let err = waiter.get(b"row", true).unwrap_err();
        assert!(matches!(err, TxError::Busy(_)));
        assert!(err.is_retryable());

        holder.rollback().unwrap();
        assert_eq!(waiter.get(b"row", true).unwrap(), None);
        waiter.commit().unwrap();
    }

    #[test]
    fn savepoint_round_trip() {
        let db = TransactionDb::open_default();
        let mut tx = PendingTx::pessimistic(&db).start();
        tx.set_savepoint();
        tx.put(b"a", b"2").unwrap();
        tx.rollback_to_savepoint().unwrap();
        assert_eq!(tx.get(b"a", false).unwrap(), None);
        assert_eq!(tx.pop_savepoint(), Err(TxError::EmptySavepointStack));
        tx.commit().unwrap();
        assert_eq!(db.lock_holder(b"a"), None);
    }

    #[test]
    fn snapshot_attach_and_detach() {
        let db = OptimisticTransactionDb::open_default();
        db.put(b"k", b"old").unwrap();

        let mut tx = PendingTx::optimistic(&db).start();
        assert!(!tx.has_snapshot());
        tx.detach_snapshot();
        tx.attach_snapshot();
        assert!(tx.has_snapshot());

        db.put(b"k", b"new").unwrap();
        assert_eq!(tx.get(b"k", false).unwrap(), Some(b"old".to_vec()));

        tx.detach_snapshot();
        assert_eq!(tx.get(b"k", false).unwrap(), Some(b"new".to_vec()));
        tx.rollback().unwrap();
    }

    #[test]
    fn iterator_sees_buffered_writes() {
        let db = OptimisticTransactionDb::open_default();
        db.put(b"a", b"1").unwrap();
        db.put(b"c", b"3").unwrap();

        let mut tx = PendingTx::optimistic(&db).start();
        tx.put(b"b", b"2").unwrap();
        tx.del(b"c").unwrap();

        let keys: Vec<Vec<u8>> = tx.iterator().unwrap().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![b"a".to_vec(), b"b".to_vec()]);
        tx.rollback().unwrap();
    }

    #[test]
    fn range_deletions_are_ignored() {
        let db = OptimisticTransactionDb::open_default();
        db.put(b"b", b"2").unwrap();
        db.delete_range(b"a", b"z");

        let mut tx = PendingTx::optimistic(&db).start();
        assert_eq!(tx.get(b"b", false).unwrap(), Some(b"2".to_vec()));
        tx.rollback().unwrap();
    }
}
