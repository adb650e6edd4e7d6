//! The store a handle is bound to.

use kvtxn_engine::{
    ColumnFamily, ConcurrencyMode, OptimisticTransactionDb, OptimisticTransactionOptions,
    Transaction, TransactionDb, TransactionOptions, WriteOptions,
};

/// A store together with the transaction options of its mode.
///
/// Exactly one store and one options type exist per handle; the pairing
/// is fixed at construction.
#[derive(Debug, Clone)]
pub enum Backing {
    /// Conflict detection at commit.
    Optimistic {
        /// The store.
        db: OptimisticTransactionDb,
        /// Options consumed when the transaction begins.
        options: OptimisticTransactionOptions,
    },
    /// Row locks taken on access.
    Pessimistic {
        /// The store.
        db: TransactionDb,
        /// Options consumed when the transaction begins.
        options: TransactionOptions,
    },
}

impl Backing {
    pub(crate) fn optimistic(db: &OptimisticTransactionDb) -> Self {
        Self::Optimistic {
            db: db.clone(),
            options: OptimisticTransactionOptions::default(),
        }
    }

    pub(crate) fn pessimistic(db: &TransactionDb) -> Self {
        Self::Pessimistic {
            db: db.clone(),
            options: TransactionOptions::default(),
        }
    }

    /// Concurrency strategy of the bound store.
    #[must_use]
    pub fn mode(&self) -> ConcurrencyMode {
        match self {
            Self::Optimistic { .. } => ConcurrencyMode::Optimistic,
            Self::Pessimistic { .. } => ConcurrencyMode::Pessimistic,
        }
    }

    /// Whether a snapshot is staged for the next begin.
    #[must_use]
    pub fn snapshot_staged(&self) -> bool {
        match self {
            Self::Optimistic { options, .. } => options.set_snapshot,
            Self::Pessimistic { options, .. } => options.set_snapshot,
        }
    }

    pub(crate) fn stage_snapshot(&mut self, armed: bool) {
        match self {
            Self::Optimistic { options, .. } => options.set_snapshot = armed,
            Self::Pessimistic { options, .. } => options.set_snapshot = armed,
        }
    }

    pub(crate) fn default_column_family(&self) -> ColumnFamily {
        match self {
            Self::Optimistic { db, .. } => db.default_column_family(),
            Self::Pessimistic { db, .. } => db.default_column_family(),
        }
    }

    /// Begins a transaction with the staged options, then resets the staged
    /// snapshot flag so the options are inert afterwards.
    pub(crate) fn begin(&mut self, write_options: &WriteOptions) -> Transaction {
        let txn = match self {
            Self::Optimistic { db, options } => db.begin_transaction(write_options, options),
            Self::Pessimistic { db, options } => db.begin_transaction(write_options, options),
        };
        self.stage_snapshot(false);
        txn
    }
}
