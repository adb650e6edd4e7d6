//! Error types for transaction handles.

use kvtxn_engine::{EngineError, Status};
use thiserror::Error;

/// Result type for handle operations.
pub type TxResult<T> = Result<T, TxError>;

/// Errors reported by handle operations.
///
/// Each variant that originates in the engine keeps the engine error, so
/// [`TxError::status`] reports the engine-native code and message
/// unchanged. Retrying is left to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TxError {
    /// Another transaction wrote a key this one depends on.
    #[error("transaction conflict: {0}")]
    Conflict(EngineError),

    /// A row lock could not be acquired in time, or the locked key changed
    /// after the transaction snapshot.
    #[error("lock busy: {0}")]
    Busy(EngineError),

    /// Savepoint rollback or pop with no savepoint set.
    #[error("savepoint stack is empty")]
    EmptySavepointStack,

    /// Any other engine failure (corruption, invalid state).
    #[error("engine error: {0}")]
    Engine(EngineError),
}

impl TxError {
    /// Returns the engine-native status for this error.
    #[must_use]
    pub fn status(&self) -> Status {
        match self {
            Self::Conflict(err) | Self::Busy(err) | Self::Engine(err) => err.status(),
            Self::EmptySavepointStack => EngineError::NoSavepoint.status(),
        }
    }

    /// Returns true for errors a caller may resolve by retrying the
    /// whole transaction.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_) | Self::Busy(_))
    }
}

impl From<EngineError> for TxError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::WriteConflict { .. } => Self::Conflict(err),
            EngineError::LockTimeout { .. } | EngineError::SnapshotConflict { .. } => {
                Self::Busy(err)
            }
            EngineError::NoSavepoint => Self::EmptySavepointStack,
            other => Self::Engine(other),
        }
    }
}
