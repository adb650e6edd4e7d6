//! # kvtxn engine
//!
//! In-memory, multi-version key-value engine with two transactional
//! front ends:
//!
//! - [`OptimisticTransactionDb`] - no locks; conflicts are detected when a
//!   transaction commits
//! - [`TransactionDb`] - exclusive row locks taken on access, bounded by a
//!   lock timeout
//!
//! Both share the same storage core: versioned keys with CRC32 value
//! checksums, range tombstones, point-in-time [`Snapshot`]s, and an LRU
//! block cache. Transactions buffer their writes, read their own writes,
//! support a savepoint stack, and expose a [`TxnIterator`] over their view.
//!
//! ## Example
//!
//! ```rust
//! use kvtxn_engine::{ReadOptions, TransactionDb, TransactionOptions, WriteOptions};
//!
//! let db = TransactionDb::open_default();
//! let cf = db.default_column_family();
//! let mut txn = db.begin_transaction(&WriteOptions::default(), &TransactionOptions::default());
//!
//! assert_eq!(txn.get_for_update(&ReadOptions::default(), &cf, b"counter").unwrap(), None);
//! txn.put(b"counter", b"1").unwrap();
//! txn.commit().unwrap();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod batch;
mod cache;
mod checksum;
mod config;
mod db;
mod error;
mod iter;
mod lock;
mod options;
mod stats;
mod store;
mod transaction;
mod types;

pub use config::EngineConfig;
pub use db::{OptimisticTransactionDb, TransactionDb};
pub use error::{EngineError, EngineResult, Status, StatusCode, StatusSubcode};
pub use iter::TxnIterator;
pub use options::{OptimisticTransactionOptions, ReadOptions, TransactionOptions, WriteOptions};
pub use stats::StatsSnapshot;
pub use transaction::{ConcurrencyMode, Transaction, TransactionState};
pub use types::{ColumnFamily, SequenceNumber, Snapshot, TransactionId, DEFAULT_COLUMN_FAMILY};
