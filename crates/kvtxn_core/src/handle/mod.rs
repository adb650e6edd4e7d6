//! Transaction handles.
//!
//! A handle is bound to one store at construction and moves through
//! `Unstarted -> Active -> Terminated`:
//!
//! - [`PendingTx`] is the unstarted phase: read/write options and snapshot
//!   arming are staged here.
//! - [`ActiveTx`] owns the live engine transaction. Its terminal operations
//!   consume it, so the terminated phase has no value at all.
//! - [`TransactionHandle`] is a single runtime-checked type covering all
//!   three phases, for callers that cannot carry the phase in the type.

mod active;
mod backing;
mod pending;
mod runtime;

pub use active::ActiveTx;
pub use backing::Backing;
pub use pending::PendingTx;
pub use runtime::{Phase, TransactionHandle};

use kvtxn_engine::ReadOptions;

/// Read options every handle starts with.
///
/// Range tombstones are always ignored by handle reads; no handle setter
/// changes that.
pub(crate) fn handle_read_options() -> ReadOptions {
    ReadOptions {
        ignore_range_deletions: true,
        ..ReadOptions::default()
    }
}
