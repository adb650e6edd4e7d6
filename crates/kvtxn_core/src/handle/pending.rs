//! Unstarted handle.

use super::{handle_read_options, ActiveTx, Backing};
use kvtxn_engine::{
    ConcurrencyMode, OptimisticTransactionDb, ReadOptions, TransactionDb, WriteOptions,
};
use std::time::Duration;
use tracing::debug;

/// A handle bound to a store whose transaction has not started.
///
/// ```rust
/// use kvtxn_core::PendingTx;
/// use kvtxn_engine::OptimisticTransactionDb;
///
/// let db = OptimisticTransactionDb::open_default();
/// let mut pending = PendingTx::optimistic(&db);
/// pending.verify_checksums(false);
/// pending.stage_snapshot(true);
///
/// let mut tx = pending.start();
/// tx.put(b"a", b"1").unwrap();
/// assert_eq!(tx.get(b"a", false).unwrap(), Some(b"1".to_vec()));
/// tx.commit().unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct PendingTx {
    backing: Backing,
    read_options: ReadOptions,
    write_options: WriteOptions,
}

impl PendingTx {
    /// Binds a handle to an optimistic store.
    #[must_use]
    pub fn optimistic(db: &OptimisticTransactionDb) -> Self {
        Self::bind(Backing::optimistic(db))
    }

    /// Binds a handle to a pessimistic store.
    #[must_use]
    pub fn pessimistic(db: &TransactionDb) -> Self {
        Self::bind(Backing::pessimistic(db))
    }

    fn bind(backing: Backing) -> Self {
        Self {
            backing,
            read_options: handle_read_options(),
            write_options: WriteOptions::default(),
        }
    }

    /// Concurrency strategy of the bound store.
    #[must_use]
    pub fn mode(&self) -> ConcurrencyMode {
        self.backing.mode()
    }

    /// The bound store and its staged transaction options.
    #[must_use]
    pub fn backing(&self) -> &Backing {
        &self.backing
    }

    /// Current read options.
    #[must_use]
    pub fn read_options(&self) -> &ReadOptions {
        &self.read_options
    }

    /// Sets read-time checksum verification.
    pub fn verify_checksums(&mut self, verify: bool) {
        self.read_options.verify_checksums = verify;
    }

    /// Sets whether reads populate the block cache.
    pub fn fill_cache(&mut self, fill: bool) {
        self.read_options.fill_cache = fill;
    }

    /// Stages whether [`start`](Self::start) attaches a snapshot.
    pub fn stage_snapshot(&mut self, armed: bool) {
        self.backing.stage_snapshot(armed);
    }

    /// Sets the row-lock wait limit of the transaction.
    ///
    /// Only pessimistic stores take locks; on an optimistic store the
    /// value is ignored.
    pub fn lock_timeout(&mut self, timeout: Duration) {
        match &mut self.backing {
            Backing::Pessimistic { options, .. } => options.lock_timeout = Some(timeout),
            Backing::Optimistic { .. } => {
                debug!(?timeout, "lock timeout ignored by optimistic store");
            }
        }
    }

    /// Write options applied when the transaction commits.
    pub fn write_options_mut(&mut self) -> &mut WriteOptions {
        &mut self.write_options
    }

    /// Begins the transaction, consuming the staged options.
    #[must_use]
    pub fn start(self) -> ActiveTx {
        let Self {
            mut backing,
            read_options,
            write_options,
        } = self;
        let txn = backing.begin(&write_options);
        debug!(
            txn = %txn.id(),
            mode = ?backing.mode(),
            snapshot = txn.snapshot().is_some(),
            "handle started"
        );
        ActiveTx::new(backing, txn, read_options)
    }
}
