//! Error types and engine-native status codes.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// A key this transaction depends on was written by another transaction.
    ///
    /// Raised by optimistic commit validation.
    #[error("write conflict on key {}", display_key(.key))]
    WriteConflict {
        /// The conflicting key.
        key: Vec<u8>,
    },

    /// A pessimistic transaction locked a key written after its snapshot.
    #[error("key {} changed after snapshot", display_key(.key))]
    SnapshotConflict {
        /// The key that changed.
        key: Vec<u8>,
    },

    /// Timed out waiting for a row lock held by another transaction.
    #[error("timed out after {timeout:?} waiting for lock on key {}", display_key(.key))]
    LockTimeout {
        /// The contended key.
        key: Vec<u8>,
        /// How long the transaction waited.
        timeout: Duration,
    },

    /// The savepoint stack is empty.
    #[error("no savepoint to roll back to or pop")]
    NoSavepoint,

    /// Stored data failed verification.
    #[error("corruption: {message}")]
    Corruption {
        /// Description of the corruption.
        message: String,
    },

    /// Operation not permitted in current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why operation is invalid.
        message: String,
    },
}

impl EngineError {
    /// Creates a corruption error.
    pub fn corruption(message: impl Into<String>) -> Self {
        Self::Corruption {
            message: message.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Returns the engine-native status describing this error.
    #[must_use]
    pub fn status(&self) -> Status {
        let (code, subcode) = match self {
            Self::WriteConflict { .. } | Self::SnapshotConflict { .. } => {
                (StatusCode::Busy, StatusSubcode::None)
            }
            Self::LockTimeout { .. } => (StatusCode::TimedOut, StatusSubcode::LockTimeout),
            Self::NoSavepoint => (StatusCode::NotFound, StatusSubcode::NoSavepoint),
            Self::Corruption { .. } => (StatusCode::Corruption, StatusSubcode::None),
            Self::InvalidOperation { .. } => (StatusCode::InvalidArgument, StatusSubcode::None),
        };
        Status {
            code,
            subcode,
            message: self.to_string(),
        }
    }
}

/// Primary outcome code of an engine operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    /// The operation succeeded.
    Ok,
    /// The key (or savepoint) does not exist.
    NotFound,
    /// A conflicting write was detected.
    Busy,
    /// A wait exceeded its timeout.
    TimedOut,
    /// Stored data is corrupted.
    Corruption,
    /// The request was not valid in the current state.
    InvalidArgument,
}

/// Refinement of a [`StatusCode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusSubcode {
    /// No further detail.
    None,
    /// The wait was for a row lock.
    LockTimeout,
    /// The savepoint stack was empty.
    NoSavepoint,
}

/// Outcome of an engine operation in code, subcode and message form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    /// Primary code.
    pub code: StatusCode,
    /// Secondary code.
    pub subcode: StatusSubcode,
    /// Human-readable message; empty on success.
    pub message: String,
}

impl Status {
    /// A successful status.
    #[must_use]
    pub fn ok() -> Self {
        Self {
            code: StatusCode::Ok,
            subcode: StatusSubcode::None,
            message: String::new(),
        }
    }

    /// A not-found status for a key lookup.
    #[must_use]
    pub fn not_found() -> Self {
        Self {
            code: StatusCode::NotFound,
            subcode: StatusSubcode::None,
            message: String::new(),
        }
    }

    /// Returns true if the status is [`StatusCode::Ok`].
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.code == StatusCode::Ok
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{:?}", self.code)
        } else {
            write!(f, "{:?}: {}", self.code, self.message)
        }
    }
}

/// Renders a key for messages: UTF-8 when printable, hex otherwise.
pub(crate) fn display_key(key: &[u8]) -> String {
    match std::str::from_utf8(key) {
        Ok(s) if s.chars().all(|c| !c.is_control()) => format!("{s:?}"),
        _ => {
            let hex: String = key.iter().map(|b| format!("{b:02x}")).collect();
            format!("0x{hex}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_maps_to_busy() {
        let status = EngineError::WriteConflict { key: b"a".to_vec() }.status();
        assert_eq!(status.code, StatusCode::Busy);
        assert_eq!(status.subcode, StatusSubcode::None);
        assert!(status.message.contains("\"a\""));
    }

    #[test]
    fn snapshot_conflict_maps_to_busy() {
        let status = EngineError::SnapshotConflict { key: vec![0xff] }.status();
        assert_eq!(status.code, StatusCode::Busy);
        assert_eq!(status.subcode, StatusSubcode::None);
        assert!(status.message.contains("0xff"));
    }

    #[test]
    fn lock_timeout_maps_to_timed_out() {
        let err = EngineError::LockTimeout {
            key: b"k".to_vec(),
            timeout: Duration::from_millis(5),
        };
        let status = err.status();
        assert_eq!(status.code, StatusCode::TimedOut);
        assert_eq!(status.subcode, StatusSubcode::LockTimeout);
    }

    #[test]
    fn no_savepoint_maps_to_not_found() {
        let status = EngineError::NoSavepoint.status();
        assert_eq!(status.code, StatusCode::NotFound);
        assert_eq!(status.subcode, StatusSubcode::NoSavepoint);
    }

    #[test]
    fn binary_keys_render_as_hex() {
        assert_eq!(display_key(&[0x00, 0xff]), "0x00ff");
        assert_eq!(display_key(b""), "\"\"");
    }

    #[test]
    fn ok_status_display() {
        assert!(Status::ok().is_ok());
        assert_eq!(Status::ok().to_string(), "Ok");
    }
}
