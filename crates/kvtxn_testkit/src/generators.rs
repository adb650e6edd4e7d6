//! Property-based test generators using proptest.
//!
//! Keys are drawn from a small alphabet so generated operation sequences
//! revisit the same keys often.

use proptest::prelude::*;

/// Strategy for keys: up to three bytes from `a..=f`. The empty key is
/// a valid key and is generated too.
pub fn key_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(b'a'..=b'f', 0..=3)
}

/// Strategy for values (arbitrary bytes, possibly empty).
pub fn value_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..64)
}

/// An operation on an active transaction handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxOp {
    /// Buffer a write.
    Put {
        /// Key
        key: Vec<u8>,
        /// Value
        value: Vec<u8>,
    },
    /// Buffer a deletion.
    Delete {
        /// Key
        key: Vec<u8>,
    },
    /// Read a key.
    Get {
        /// Key
        key: Vec<u8>,
        /// Register update intent
        for_update: bool,
    },
    /// Push a savepoint.
    SetSavepoint,
    /// Undo to the newest savepoint and pop it.
    RollbackToSavepoint,
    /// Pop the newest savepoint.
    PopSavepoint,
}

/// Strategy for a single operation, weighted towards data operations.
pub fn tx_op_strategy() -> impl Strategy<Value = TxOp> {
    prop_oneof![
        4 => (key_strategy(), value_strategy())
            .prop_map(|(key, value)| TxOp::Put { key, value }),
        2 => key_strategy().prop_map(|key| TxOp::Delete { key }),
        3 => (key_strategy(), any::<bool>())
            .prop_map(|(key, for_update)| TxOp::Get { key, for_update }),
        1 => Just(TxOp::SetSavepoint),
        1 => Just(TxOp::RollbackToSavepoint),
        1 => Just(TxOp::PopSavepoint),
    ]
}

/// Strategy for a sequence of up to `max_len` operations.
pub fn tx_ops_strategy(max_len: usize) -> impl Strategy<Value = Vec<TxOp>> {
    prop::collection::vec(tx_op_strategy(), 0..=max_len)
}

/// Strategy for writes only: a non-empty list of `(key, value)` pairs.
pub fn writes_strategy(max_len: usize) -> impl Strategy<Value = Vec<(Vec<u8>, Vec<u8>)>> {
    prop::collection::vec((key_strategy(), value_strategy()), 1..=max_len.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::strategy::ValueTree;
    use proptest::test_runner::TestRunner;

    #[test]
    fn keys_stay_in_alphabet() {
        let mut runner = TestRunner::default();
        for _ in 0..64 {
            let key = key_strategy().new_tree(&mut runner).unwrap().current();
            assert!(key.len() <= 3);
            assert!(key.iter().all(|b| (b'a'..=b'f').contains(b)));
        }
    }

    #[test]
    fn op_sequences_respect_max_len() {
        let mut runner = TestRunner::default();
        for _ in 0..16 {
            let ops = tx_ops_strategy(8).new_tree(&mut runner).unwrap().current();
            assert!(ops.len() <= 8);
        }
    }
}
