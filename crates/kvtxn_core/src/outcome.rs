//! Classification of handle results for callers that report a status.

use crate::error::{TxError, TxResult};
use kvtxn_engine::Status;

/// Coarse outcome of a handle operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// The operation succeeded.
    Ok,
    /// A lookup found no value.
    NotFound,
    /// The commit lost a write conflict.
    Conflict,
    /// A row lock could not be taken in time.
    Busy,
    /// No savepoint was set.
    EmptySavepointStack,
    /// Any other failure.
    Error,
}

impl Outcome {
    /// Classifies the result of a non-lookup operation.
    #[must_use]
    pub fn of<T>(result: &TxResult<T>) -> Self {
        match result {
            Ok(_) => Self::Ok,
            Err(err) => Self::of_error(err),
        }
    }

    /// Classifies the result of a lookup, separating not-found from errors.
    #[must_use]
    pub fn of_lookup<V>(result: &TxResult<Option<V>>) -> Self {
        match result {
            Ok(Some(_)) => Self::Ok,
            Ok(None) => Self::NotFound,
            Err(err) => Self::of_error(err),
        }
    }

    fn of_error(err: &TxError) -> Self {
        match err {
            TxError::Conflict(_) => Self::Conflict,
            TxError::Busy(_) => Self::Busy,
            TxError::EmptySavepointStack => Self::EmptySavepointStack,
            TxError::Engine(_) => Self::Error,
        }
    }
}

/// Engine-native status of a non-lookup result.
#[must_use]
pub fn status_of<T>(result: &TxResult<T>) -> Status {
    match result {
        Ok(_) => Status::ok(),
        Err(err) => err.status(),
    }
}

/// Engine-native status of a lookup result.
#[must_use]
pub fn lookup_status<V>(result: &TxResult<Option<V>>) -> Status {
    match result {
        Ok(Some(_)) => Status::ok(),
        Ok(None) => Status::not_found(),
        Err(err) => err.status(),
    }
}
