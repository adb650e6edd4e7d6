//! Cursor over a transaction's view.

use crate::transaction::Transaction;
use std::marker::PhantomData;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cursor {
    Unpositioned,
    At(usize),
    Exhausted,
}

/// Key-ordered cursor over a transaction's merged view.
///
/// The iterator borrows its transaction, so it cannot be used after the
/// transaction is committed or rolled back. It starts unpositioned; call
/// one of the `seek*` methods, or use it as a standard [`Iterator`], which
/// starts from the first key.
///
/// The view is copied when the iterator is created, so creation costs time
/// and memory linear in the number of visible keys below
/// [`ReadOptions::iterate_upper_bound`](crate::ReadOptions::iterate_upper_bound).
/// Set the bound to limit the copy.
#[derive(Debug)]
pub struct TxnIterator<'txn> {
    entries: Vec<(Vec<u8>, Vec<u8>)>,
    cursor: Cursor,
    _txn: PhantomData<&'txn Transaction>,
}

impl<'txn> TxnIterator<'txn> {
    pub(crate) fn new(entries: Vec<(Vec<u8>, Vec<u8>)>) -> Self {
        Self {
            entries,
            cursor: Cursor::Unpositioned,
            _txn: PhantomData,
        }
    }

    /// Returns true if the cursor points at an entry.
    #[must_use]
    pub fn valid(&self) -> bool {
        matches!(self.cursor, Cursor::At(_))
    }

    /// Moves to the first entry.
    pub fn seek_to_first(&mut self) {
        self.cursor = self.cursor_at(0);
    }

    /// Moves to the last entry.
    pub fn seek_to_last(&mut self) {
        self.cursor = match self.entries.len() {
            0 => Cursor::Exhausted,
            len => Cursor::At(len - 1),
        };
    }

    /// Moves to the first entry whose key is `>= target`.
    pub fn seek(&mut self, target: &[u8]) {
        let pos = self
            .entries
            .partition_point(|(key, _)| key.as_slice() < target);
        self.cursor = self.cursor_at(pos);
    }

    /// Moves to the last entry whose key is `<= target`.
    pub fn seek_for_prev(&mut self, target: &[u8]) {
        let end = self
            .entries
            .partition_point(|(key, _)| key.as_slice() <= target);
        self.cursor = match end {
            0 => Cursor::Exhausted,
            end => Cursor::At(end - 1),
        };
    }

    /// Moves to the following entry.
    pub fn advance(&mut self) {
        self.cursor = match self.cursor {
            Cursor::At(pos) => self.cursor_at(pos + 1),
            other => other,
        };
    }

    /// Moves to the preceding entry.
    pub fn retreat(&mut self) {
        self.cursor = match self.cursor {
            Cursor::At(0) => Cursor::Exhausted,
            Cursor::At(pos) => Cursor::At(pos - 1),
            other => other,
        };
    }

    /// Key at the cursor.
    #[must_use]
    pub fn key(&self) -> Option<&[u8]> {
        self.current().map(|(key, _)| key.as_slice())
    }

    /// Value at the cursor.
    #[must_use]
    pub fn value(&self) -> Option<&[u8]> {
        self.current().map(|(_, value)| value.as_slice())
    }

    fn current(&self) -> Option<&(Vec<u8>, Vec<u8>)> {
        match self.cursor {
            Cursor::At(pos) => self.entries.get(pos),
            _ => None,
        }
    }

    fn cursor_at(&self, pos: usize) -> Cursor {
        if pos < self.entries.len() {
            Cursor::At(pos)
        } else {
            Cursor::Exhausted
        }
    }
}

impl Iterator for TxnIterator<'_> {
    type Item = (Vec<u8>, Vec<u8>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor == Cursor::Unpositioned {
            self.seek_to_first();
        }
        let item = self.current().cloned();
        self.advance();
        item
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        OptimisticTransactionDb, OptimisticTransactionOptions, ReadOptions, TransactionDb,
        TransactionOptions, WriteOptions,
    };

    fn seeded() -> OptimisticTransactionDb {
        let db = OptimisticTransactionDb::open_default();
        for (k, v) in [(b"a", b"1"), (b"c", b"3"), (b"e", b"5")] {
            db.put(k, v).unwrap();
        }
        db
    }

    #[test]
    fn merges_buffered_writes_over_committed() {
        let db = seeded();
        let mut txn =
            db.begin_transaction(&WriteOptions::default(), &OptimisticTransactionOptions::default());
        txn.put(b"b", b"2").unwrap();
        txn.delete(b"c").unwrap();
        txn.put(b"e", b"50").unwrap();

        let items: Vec<_> = txn.iter(&ReadOptions::default()).unwrap().collect();
        assert_eq!(
            items,
            vec![
                (b"a".to_vec(), b"1".to_vec()),
                (b"b".to_vec(), b"2".to_vec()),
                (b"e".to_vec(), b"50".to_vec()),
            ]
        );
    }

    #[test]
    fn cursor_seek_and_step() {
        let db = seeded();
        let txn =
            db.begin_transaction(&WriteOptions::default(), &OptimisticTransactionOptions::default());
        let mut it = txn.iter(&ReadOptions::default()).unwrap();
        assert!(!it.valid());

        it.seek(b"b");
        assert_eq!(it.key(), Some(&b"c"[..]));
        it.advance();
        assert_eq!(it.value(), Some(&b"5"[..]));
        it.advance();
        assert!(!it.valid());

        it.seek_for_prev(b"d");
        assert_eq!(it.key(), Some(&b"c"[..]));
        it.retreat();
        assert_eq!(it.key(), Some(&b"a"[..]));
        it.retreat();
        assert!(!it.valid());

        it.seek_to_last();
        assert_eq!(it.key(), Some(&b"e"[..]));
        it.seek_for_prev(b"0");
        assert!(!it.valid());
    }

    #[test]
    fn upper_bound_is_exclusive() {
        let db = seeded();
        let mut txn =
            db.begin_transaction(&WriteOptions::default(), &OptimisticTransactionOptions::default());
        txn.put(b"d", b"4").unwrap();
        let opts = ReadOptions {
            iterate_upper_bound: Some(b"d".to_vec()),
            ..ReadOptions::default()
        };
        let keys: Vec<_> = txn.iter(&opts).unwrap().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![b"a".to_vec(), b"c".to_vec()]);
    }

    #[test]
    fn snapshot_view_is_stable() {
        let db = TransactionDb::open_default();
        db.put(b"a", b"1").unwrap();
        let mut txn = db.begin_transaction(
            &WriteOptions::default(),
            &TransactionOptions {
                set_snapshot: true,
                ..TransactionOptions::default()
            },
        );
        db.put(b"b", b"2").unwrap();

        let keys: Vec<_> = txn.iter(&ReadOptions::default()).unwrap().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![b"a".to_vec()]);
        txn.rollback().unwrap();
    }

    #[test]
    fn corrupted_value_fails_verified_iteration() {
        let db = seeded();
        db.inject_corruption(b"c");
        let txn =
            db.begin_transaction(&WriteOptions::default(), &OptimisticTransactionOptions::default());
        assert!(txn.iter(&ReadOptions::default()).is_err());

        let lenient = ReadOptions {
            verify_checksums: false,
            ..ReadOptions::default()
        };
        assert_eq!(txn.iter(&lenient).unwrap().count(), 3);
    }

    #[test]
    fn upper_bound_limits_scan() {
        let db = seeded();
        db.inject_corruption(b"e");
        let txn =
            db.begin_transaction(&WriteOptions::default(), &OptimisticTransactionOptions::default());
        let bounded = ReadOptions {
            iterate_upper_bound: Some(b"d".to_vec()),
            ..ReadOptions::default()
        };
        assert_eq!(txn.iter(&bounded).unwrap().count(), 2);
        assert!(txn.iter(&ReadOptions::default()).is_err());
    }

    #[test]
    fn std_adapters_and_cursor_agree() {
        let db = seeded();
        let txn =
            db.begin_transaction(&WriteOptions::default(), &OptimisticTransactionOptions::default());
        let mut it = txn.iter(&ReadOptions::default()).unwrap();
        it.seek_to_first();
        assert_eq!(it.key(), Some(&b"a"[..]));
        it.advance();
        it.advance();
        assert_eq!(it.key(), Some(&b"e"[..]));
        it.advance();
        assert!(!it.valid());

        let mut it = txn.iter(&ReadOptions::default()).unwrap();
        assert_eq!(it.position(|(key, _)| key == b"c"), Some(1));
        assert_eq!(it.next(), Some((b"e".to_vec(), b"5".to_vec())));
        assert_eq!(it.next(), None);
    }
}
