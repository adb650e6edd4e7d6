//! Reference model of one transaction's buffered state.
//!
//! [`TxModel`] tracks what a single uncontended transaction should observe
//! over an initially empty store. [`apply_op`] runs a [`TxOp`] on a real
//! handle and reports the observation in the same shape, so a property
//! test can compare the two step by step.

use crate::generators::TxOp;
use kvtxn_core::{ActiveTx, TxError};
use std::collections::BTreeMap;

/// What an operation observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observed {
    /// The operation succeeded without producing a value.
    Done,
    /// A read returned this value.
    Read(Option<Vec<u8>>),
    /// A savepoint operation found the stack empty.
    EmptySavepointStack,
}

/// Expected buffered state of a transaction.
#[derive(Debug, Clone, Default)]
pub struct TxModel {
    /// Buffered writes; `None` is a buffered deletion.
    overlay: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
    savepoints: Vec<BTreeMap<Vec<u8>, Option<Vec<u8>>>>,
}

impl TxModel {
    /// Creates an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies `op` and returns what it should observe.
    pub fn apply(&mut self, op: &TxOp) -> Observed {
        match op {
            TxOp::Put { key, value } => {
                self.overlay.insert(key.clone(), Some(value.clone()));
                Observed::Done
            }
            TxOp::Delete { key } => {
                self.overlay.insert(key.clone(), None);
                Observed::Done
            }
            TxOp::Get { key, .. } => Observed::Read(self.overlay.get(key).cloned().flatten()),
            TxOp::SetSavepoint => {
                self.savepoints.push(self.overlay.clone());
                Observed::Done
            }
            TxOp::RollbackToSavepoint => match self.savepoints.pop() {
                Some(saved) => {
                    self.overlay = saved;
                    Observed::Done
                }
                None => Observed::EmptySavepointStack,
            },
            TxOp::PopSavepoint => match self.savepoints.pop() {
                Some(_) => Observed::Done,
                None => Observed::EmptySavepointStack,
            },
        }
    }

    /// Values a successful commit should leave in the store.
    pub fn committed_state(&self) -> BTreeMap<Vec<u8>, Vec<u8>> {
        self.overlay
            .iter()
            .filter_map(|(k, v)| v.clone().map(|v| (k.clone(), v)))
            .collect()
    }

    /// Keys touched by buffered writes.
    pub fn written_keys(&self) -> impl Iterator<Item = &[u8]> {
        self.overlay.keys().map(Vec::as_slice)
    }
}

/// Runs `op` on an active handle.
///
/// Errors other than an empty savepoint stack are returned unchanged.
pub fn apply_op(tx: &mut ActiveTx, op: &TxOp) -> Result<Observed, TxError> {
    let observed = match op {
        TxOp::Put { key, value } => tx.put(key, value).map(|()| Observed::Done),
        TxOp::Delete { key } => tx.del(key).map(|()| Observed::Done),
        TxOp::Get { key, for_update } => tx.get(key, *for_update).map(Observed::Read),
        TxOp::SetSavepoint => {
            tx.set_savepoint();
            Ok(Observed::Done)
        }
        TxOp::RollbackToSavepoint => tx.rollback_to_savepoint().map(|()| Observed::Done),
        TxOp::PopSavepoint => tx.pop_savepoint().map(|()| Observed::Done),
    };
    match observed {
        Err(TxError::EmptySavepointStack) => Ok(Observed::EmptySavepointStack),
        other => other,
    }
}
