//! Core type definitions for the engine.

use std::fmt;

/// Unique identifier for a transaction.
///
/// Transaction IDs are monotonically increasing and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransactionId(pub u64);

impl TransactionId {
    /// Creates a new transaction ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "txn:{}", self.0)
    }
}

/// Sequence number for ordering commits.
///
/// Every committed batch receives the next sequence number. A version is
/// visible to a read at sequence `s` when its own sequence is `<= s`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SequenceNumber(pub u64);

impl SequenceNumber {
    /// Creates a new sequence number.
    #[must_use]
    pub const fn new(seq: u64) -> Self {
        Self(seq)
    }

    /// Returns the raw sequence value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns the next sequence number.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for SequenceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "seq:{}", self.0)
    }
}

/// A point-in-time view of the store.
///
/// Reads through a snapshot see exactly the versions committed at or
/// before its sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Snapshot {
    seq: SequenceNumber,
}

impl Snapshot {
    pub(crate) const fn at(seq: SequenceNumber) -> Self {
        Self { seq }
    }

    /// Returns the sequence number the snapshot is pinned to.
    #[must_use]
    pub const fn sequence(&self) -> SequenceNumber {
        self.seq
    }
}

/// Name of the only column family the engine exposes.
pub const DEFAULT_COLUMN_FAMILY: &str = "default";

/// Handle to a column family.
///
/// The engine keeps a single keyspace, so the default family is the only
/// handle that can be obtained.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnFamily {
    name: &'static str,
}

impl ColumnFamily {
    pub(crate) const fn default_family() -> Self {
        Self {
            name: DEFAULT_COLUMN_FAMILY,
        }
    }

    /// Returns the column family name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name
    }
}
