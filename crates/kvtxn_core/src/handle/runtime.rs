//! Runtime-checked handle covering all three phases.

use super::{ActiveTx, PendingTx};
use crate::error::TxResult;
use kvtxn_engine::{
    ConcurrencyMode, OptimisticTransactionDb, SequenceNumber, TransactionDb, TxnIterator,
    WriteOptions,
};
use std::fmt;
use std::time::Duration;

/// Lifecycle phase of a [`TransactionHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Bound to a store, transaction not begun.
    Unstarted,
    /// Transaction running.
    Active,
    /// Committed or rolled back.
    Terminated,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unstarted => write!(f, "unstarted"),
            Self::Active => write!(f, "active"),
            Self::Terminated => write!(f, "terminated"),
        }
    }
}

#[derive(Debug)]
enum State {
    Unstarted(PendingTx),
    Active(ActiveTx),
    Terminated,
}

/// A transaction handle whose phase is checked at runtime.
///
/// Offers the same operations as [`PendingTx`] and [`ActiveTx`] on one
/// type. Calling an operation in a phase that does not allow it is a
/// programming error and panics.
///
/// ```rust
/// use kvtxn_core::{Phase, TransactionHandle};
/// use kvtxn_engine::TransactionDb;
///
/// let db = TransactionDb::open_default();
/// let mut handle = TransactionHandle::pessimistic(&db);
/// handle.start();
/// handle.put(b"a", b"1").unwrap();
/// handle.commit().unwrap();
/// assert_eq!(handle.phase(), Phase::Terminated);
/// ```
#[derive(Debug)]
pub struct TransactionHandle {
    mode: ConcurrencyMode,
    state: State,
}

impl TransactionHandle {
    /// Binds an unstarted handle to an optimistic store.
    #[must_use]
    pub fn optimistic(db: &OptimisticTransactionDb) -> Self {
        PendingTx::optimistic(db).into()
    }

    /// Binds an unstarted handle to a pessimistic store.
    #[must_use]
    pub fn pessimistic(db: &TransactionDb) -> Self {
        PendingTx::pessimistic(db).into()
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        match self.state {
            State::Unstarted(_) => Phase::Unstarted,
            State::Active(_) => Phase::Active,
            State::Terminated => Phase::Terminated,
        }
    }

    /// Concurrency strategy of the bound store.
    #[must_use]
    pub fn mode(&self) -> ConcurrencyMode {
        self.mode
    }

    /// Sets read-time checksum verification.
    ///
    /// # Panics
    ///
    /// Panics if the handle is terminated.
    pub fn verify_checksums(&mut self, verify: bool) {
        match &mut self.state {
            State::Unstarted(pending) => pending.verify_checksums(verify),
            State::Active(active) => active.verify_checksums(verify),
            State::Terminated => violation("verify_checksums", Phase::Terminated),
        }
    }

    /// Sets whether reads populate the block cache.
    ///
    /// # Panics
    ///
    /// Panics if the handle is terminated.
    pub fn fill_cache(&mut self, fill: bool) {
        match &mut self.state {
            State::Unstarted(pending) => pending.fill_cache(fill),
            State::Active(active) => active.fill_cache(fill),
            State::Terminated => violation("fill_cache", Phase::Terminated),
        }
    }

    /// Arms or disarms the snapshot.
    ///
    /// Before [`start`](Self::start) this stages whether the transaction
    /// begins with a snapshot. On an active transaction `true` attaches a
    /// snapshot of the latest committed state and `false` does nothing;
    /// use [`clear_snapshot`](Self::clear_snapshot) to detach.
    ///
    /// # Panics
    ///
    /// Panics if the handle is terminated.
    pub fn set_snapshot(&mut self, armed: bool) {
        match &mut self.state {
            State::Unstarted(pending) => pending.stage_snapshot(armed),
            State::Active(active) => {
                if armed {
                    active.attach_snapshot();
                }
            }
            State::Terminated => violation("set_snapshot", Phase::Terminated),
        }
    }

    /// Detaches the transaction's snapshot, if any.
    ///
    /// # Panics
    ///
    /// Panics unless the handle is active.
    pub fn clear_snapshot(&mut self) {
        self.active_mut("clear_snapshot").detach_snapshot();
    }

    /// Sets the row-lock wait limit; ignored on an optimistic store.
    ///
    /// # Panics
    ///
    /// Panics unless the handle is unstarted.
    pub fn lock_timeout(&mut self, timeout: Duration) {
        self.pending_mut("lock_timeout").lock_timeout(timeout);
    }

    /// Replaces the write options used at commit.
    ///
    /// # Panics
    ///
    /// Panics if the handle is terminated.
    pub fn set_write_options(&mut self, write_options: WriteOptions) {
        match &mut self.state {
            State::Unstarted(pending) => *pending.write_options_mut() = write_options,
            State::Active(active) => active.set_write_options(write_options),
            State::Terminated => violation("set_write_options", Phase::Terminated),
        }
    }

    /// Begins the transaction.
    ///
    /// # Panics
    ///
    /// Panics unless the handle is unstarted.
    pub fn start(&mut self) {
        match std::mem::replace(&mut self.state, State::Terminated) {
            State::Unstarted(pending) => self.state = State::Active(pending.start()),
            other => {
                let phase = phase_of(&other);
                self.state = other;
                violation("start", phase);
            }
        }
    }

    /// See [`ActiveTx::get`].
    ///
    /// # Panics
    ///
    /// Panics unless the handle is active.
    pub fn get(&mut self, key: &[u8], for_update: bool) -> TxResult<Option<Vec<u8>>> {
        self.active_mut("get").get(key, for_update)
    }

    /// See [`ActiveTx::put`].
    ///
    /// # Panics
    ///
    /// Panics unless the handle is active.
    pub fn put(&mut self, key: &[u8], value: &[u8]) -> TxResult<()> {
        self.active_mut("put").put(key, value)
    }

    /// See [`ActiveTx::del`].
    ///
    /// # Panics
    ///
    /// Panics unless the handle is active.
    pub fn del(&mut self, key: &[u8]) -> TxResult<()> {
        self.active_mut("del").del(key)
    }

    /// See [`ActiveTx::set_savepoint`].
    ///
    /// # Panics
    ///
    /// Panics unless the handle is active.
    pub fn set_savepoint(&mut self) {
        self.active_mut("set_savepoint").set_savepoint();
    }

    /// See [`ActiveTx::rollback_to_savepoint`].
    ///
    /// # Panics
    ///
    /// Panics unless the handle is active.
    pub fn rollback_to_savepoint(&mut self) -> TxResult<()> {
        self.active_mut("rollback_to_savepoint")
            .rollback_to_savepoint()
    }

    /// See [`ActiveTx::pop_savepoint`].
    ///
    /// # Panics
    ///
    /// Panics unless the handle is active.
    pub fn pop_savepoint(&mut self) -> TxResult<()> {
        self.active_mut("pop_savepoint").pop_savepoint()
    }

    /// See [`ActiveTx::iterator`].
    ///
    /// # Panics
    ///
    /// Panics unless the handle is active.
    pub fn iterator(&self) -> TxResult<TxnIterator<'_>> {
        match &self.state {
            State::Active(active) => active.iterator(),
            other => violation("iterator", phase_of(other)),
        }
    }

    /// Commits and terminates the handle, whatever the outcome.
    ///
    /// # Panics
    ///
    /// Panics unless the handle is active.
    pub fn commit(&mut self) -> TxResult<SequenceNumber> {
        self.take_active("commit").commit()
    }

    /// Rolls back and terminates the handle.
    ///
    /// # Panics
    ///
    /// Panics unless the handle is active.
    pub fn rollback(&mut self) -> TxResult<()> {
        self.take_active("rollback").rollback()
    }

    fn pending_mut(&mut self, op: &'static str) -> &mut PendingTx {
        match &mut self.state {
            State::Unstarted(pending) => pending,
            other => violation(op, phase_of(other)),
        }
    }

    fn active_mut(&mut self, op: &'static str) -> &mut ActiveTx {
        match &mut self.state {
            State::Active(active) => active,
            other => violation(op, phase_of(other)),
        }
    }

    fn take_active(&mut self, op: &'static str) -> ActiveTx {
        match std::mem::replace(&mut self.state, State::Terminated) {
            State::Active(active) => active,
            other => {
                let phase = phase_of(&other);
                self.state = other;
                violation(op, phase)
            }
        }
    }
}

impl From<PendingTx> for TransactionHandle {
    fn from(pending: PendingTx) -> Self {
        Self {
            mode: pending.mode(),
            state: State::Unstarted(pending),
        }
    }
}

impl From<ActiveTx> for TransactionHandle {
    fn from(active: ActiveTx) -> Self {
        Self {
            mode: active.mode(),
            state: State::Active(active),
        }
    }
}

fn phase_of(state: &State) -> Phase {
    match state {
        State::Unstarted(_) => Phase::Unstarted,
        State::Active(_) => Phase::Active,
        State::Terminated => Phase::Terminated,
    }
}

#[cold]
#[track_caller]
fn violation(op: &str, phase: Phase) -> ! {
    panic!("`{op}` called on {phase} transaction handle")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Outcome, TxError};
    use kvtxn_engine::{ReadOptions, StatusCode};

    #[test]
    fn lifecycle_phases() {
        let db = OptimisticTransactionDb::open_default();
        let mut handle = TransactionHandle::optimistic(&db);
        assert_eq!(handle.phase(), Phase::Unstarted);
        handle.start();
        assert_eq!(handle.phase(), Phase::Active);
        handle.rollback().unwrap();
        assert_eq!(handle.phase(), Phase::Terminated);
        assert_eq!(handle.mode(), ConcurrencyMode::Optimistic);
    }

    #[test]
    fn optimistic_scenario() {
        let db = OptimisticTransactionDb::open_default();
        let mut handle = TransactionHandle::optimistic(&db);
        handle.start();
        handle.put(b"a", b"1").unwrap();
        let read = handle.get(b"a", false);
        assert_eq!(Outcome::of_lookup(&read), Outcome::Ok);
        assert_eq!(read.unwrap(), Some(b"1".to_vec()));

        let committed = handle.commit();
        assert_eq!(crate::status_of(&committed).code, StatusCode::Ok);
        assert_eq!(
            db.get(&ReadOptions::default(), b"a").unwrap(),
            Some(b"1".to_vec())
        );
    }

    #[test]
    fn set_snapshot_depends_on_phase() {
        let db = TransactionDb::open_default();
        db.put(b"k", b"v1").unwrap();

        let mut handle = TransactionHandle::pessimistic(&db);
        handle.set_snapshot(true);
        handle.start();
        db.put(b"k", b"v2").unwrap();
        assert_eq!(handle.get(b"k", false).unwrap(), Some(b"v1".to_vec()));

        // Disarming an active transaction leaves the snapshot attached.
        handle.set_snapshot(false);
        assert_eq!(handle.get(b"k", false).unwrap(), Some(b"v1".to_vec()));

        handle.clear_snapshot();
        assert_eq!(handle.get(b"k", false).unwrap(), Some(b"v2".to_vec()));
        handle.rollback().unwrap();
    }

    #[test]
    fn failed_commit_still_terminates() {
        let db = OptimisticTransactionDb::open_default();
        let mut first = TransactionHandle::optimistic(&db);
        let mut second = TransactionHandle::optimistic(&db);
        first.start();
        second.start();
        first.put(b"k", b"1").unwrap();
        second.put(b"k", b"2").unwrap();

        first.commit().unwrap();
        assert!(matches!(second.commit(), Err(TxError::Conflict(_))));
        assert_eq!(second.phase(), Phase::Terminated);
    }

    #[test]
    #[should_panic(expected = "`get` called on unstarted transaction handle")]
    fn get_before_start_panics() {
        let db = OptimisticTransactionDb::open_default();
        let mut handle = TransactionHandle::optimistic(&db);
        let _ = handle.get(b"k", false);
    }

    #[test]
    #[should_panic(expected = "`put` called on terminated transaction handle")]
    fn put_after_commit_panics() {
        let db = TransactionDb::open_default();
        let mut handle = TransactionHandle::pessimistic(&db);
        handle.start();
        handle.commit().unwrap();
        let _ = handle.put(b"k", b"v");
    }

    #[test]
    #[should_panic(expected = "`start` called on active transaction handle")]
    fn double_start_panics() {
        let db = TransactionDb::open_default();
        let mut handle = TransactionHandle::pessimistic(&db);
        handle.start();
        handle.start();
    }

    #[test]
    #[should_panic(expected = "`lock_timeout` called on active")]
    fn lock_timeout_after_start_panics() {
        let db = TransactionDb::open_default();
        let mut handle = TransactionHandle::pessimistic(&db);
        handle.start();
        handle.lock_timeout(Duration::from_millis(5));
    }
}
