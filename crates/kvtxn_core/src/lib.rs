//! # kvtxn core
//!
//! One transaction handle over both kvtxn store flavours.
//!
//! A handle is bound to either an [`OptimisticTransactionDb`] or a
//! [`TransactionDb`] when it is created and then follows a fixed
//! lifecycle: configure, start, read and write, commit or roll back.
//!
//! - [`PendingTx`] and [`ActiveTx`] carry the phase in the type; the
//!   terminal operations consume the active handle.
//! - [`TransactionHandle`] checks the phase at runtime and panics on misuse.
//!
//! Errors are [`TxError`]s. Conflicts and lock timeouts are returned as-is,
//! never retried; [`Outcome`], [`status_of`] and [`lookup_status`] turn a
//! result into the engine-native [`Status`] for callers that report codes.
//!
//! ## Example
//!
//! ```rust
//! use kvtxn_core::{PendingTx, TxError};
//! use kvtxn_engine::OptimisticTransactionDb;
//!
//! let db = OptimisticTransactionDb::open_default();
//!
//! let mut t1 = PendingTx::optimistic(&db).start();
//! let mut t2 = PendingTx::optimistic(&db).start();
//! t1.get(b"seat", true).unwrap();
//! t2.get(b"seat", true).unwrap();
//! t1.put(b"seat", b"alice").unwrap();
//! t2.put(b"seat", b"bob").unwrap();
//!
//! t1.commit().unwrap();
//! assert!(matches!(t2.commit(), Err(TxError::Conflict(_))));
//! ```
//!
//! [`OptimisticTransactionDb`]: kvtxn_engine::OptimisticTransactionDb
//! [`TransactionDb`]: kvtxn_engine::TransactionDb
//! [`Status`]: kvtxn_engine::Status

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod handle;
mod outcome;

pub use error::{TxError, TxResult};
pub use handle::{ActiveTx, Backing, PendingTx, Phase, TransactionHandle};
pub use outcome::{lookup_status, status_of, Outcome};
