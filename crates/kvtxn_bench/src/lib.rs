//! Benchmark utilities.

#![warn(missing_docs)]

use kvtxn_engine::{OptimisticTransactionDb, TransactionDb};
use rand::Rng;

/// Generate random value bytes of the specified size.
pub fn random_data(size: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..size).map(|_| rng.gen()).collect()
}

/// Key of record `index`.
pub fn key(index: usize) -> Vec<u8> {
    format!("key:{index:08}").into_bytes()
}

/// Generate `count` key/value pairs with `payload_size`-byte values.
pub fn generate_records(count: usize, payload_size: usize) -> Vec<(Vec<u8>, Vec<u8>)> {
    (0..count).map(|i| (key(i), random_data(payload_size))).collect()
}

/// An optimistic store preloaded with `records`.
pub fn loaded_optimistic(records: &[(Vec<u8>, Vec<u8>)]) -> OptimisticTransactionDb {
    let db = OptimisticTransactionDb::open_default();
    for (k, v) in records {
        db.put(k, v).expect("preload failed");
    }
    db
}

/// A pessimistic store preloaded with `records`.
pub fn loaded_pessimistic(records: &[(Vec<u8>, Vec<u8>)]) -> TransactionDb {
    let db = TransactionDb::open_default();
    for (k, v) in records {
        db.put(k, v).expect("preload failed");
    }
    db
}
