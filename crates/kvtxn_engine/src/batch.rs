//! Buffered writes of a transaction.

use std::collections::BTreeMap;

/// A buffered write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PendingWrite {
    /// Insert or overwrite the key.
    Put {
        /// New value.
        value: Vec<u8>,
    },
    /// Delete the key.
    Delete,
}

/// Ordered log of buffered writes plus an index of the newest write per key.
///
/// The log keeps every write so savepoints can truncate it; the index is
/// what reads and commit consult.
#[derive(Debug, Default)]
pub(crate) struct WriteBatch {
    log: Vec<(Vec<u8>, PendingWrite)>,
    index: BTreeMap<Vec<u8>, usize>,
}

impl WriteBatch {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn put(&mut self, key: &[u8], value: &[u8]) {
        self.push(key, PendingWrite::Put {
            value: value.to_vec(),
        });
    }

    pub(crate) fn delete(&mut self, key: &[u8]) {
        self.push(key, PendingWrite::Delete);
    }

    /// Newest buffered write for `key`.
    pub(crate) fn get(&self, key: &[u8]) -> Option<&PendingWrite> {
        self.index.get(key).map(|&pos| &self.log[pos].1)
    }

    /// Number of writes in the log, duplicates included.
    pub(crate) fn len(&self) -> usize {
        self.log.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    /// Number of distinct keys written.
    pub(crate) fn key_count(&self) -> usize {
        self.index.len()
    }

    /// Discards every write after the first `len`.
    pub(crate) fn truncate(&mut self, len: usize) {
        if len >= self.log.len() {
            return;
        }
        self.log.truncate(len);
        self.index.clear();
        for (pos, (key, _)) in self.log.iter().enumerate() {
            self.index.insert(key.clone(), pos);
        }
    }

    /// Newest write per key, in key order.
    pub(crate) fn latest(&self) -> impl Iterator<Item = (&[u8], &PendingWrite)> + '_ {
        self.index
            .iter()
            .map(|(key, &pos)| (key.as_slice(), &self.log[pos].1))
    }

    pub(crate) fn clear(&mut self) {
        self.log.clear();
        self.index.clear();
    }

    fn push(&mut self, key: &[u8], write: PendingWrite) {
        self.index.insert(key.to_vec(), self.log.len());
        self.log.push((key.to_vec(), write));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_overwrites_previous() {
        let mut batch = WriteBatch::new();
        batch.put(b"k", b"1");
        batch.put(b"k", b"2");

        assert_eq!(batch.len(), 2);
        assert_eq!(batch.key_count(), 1);
        assert_eq!(
            batch.get(b"k"),
            Some(&PendingWrite::Put {
                value: b"2".to_vec()
            })
        );
    }

    #[test]
    fn delete_records_write() {
        let mut batch = WriteBatch::new();
        batch.put(b"k", b"1");
        batch.delete(b"k");
        assert_eq!(batch.get(b"k"), Some(&PendingWrite::Delete));
    }

    #[test]
    fn truncate_restores_earlier_state() {
        let mut batch = WriteBatch::new();
        batch.put(b"a", b"1");
        let mark = batch.len();
        batch.put(b"a", b"2");
        batch.put(b"b", b"3");

        batch.truncate(mark);

        assert_eq!(
            batch.get(b"a"),
            Some(&PendingWrite::Put {
                value: b"1".to_vec()
            })
        );
        assert!(batch.get(b"b").is_none());
    }

    #[test]
    fn latest_is_key_ordered() {
        let mut batch = WriteBatch::new();
        batch.put(b"c", b"1");
        batch.put(b"a", b"2");
        batch.delete(b"b");

        let keys: Vec<_> = batch.latest().map(|(k, _)| k.to_vec()).collect();
        assert_eq!(keys, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);
    }

    #[test]
    fn clear_empties_batch() {
        let mut batch = WriteBatch::new();
        batch.put(b"a", b"1");
        batch.clear();
        assert!(batch.is_empty());
        assert!(batch.get(b"a").is_none());
    }

    proptest::proptest! {
        #[test]
        fn truncate_matches_replayed_prefix(
            writes in proptest::collection::vec(
                (
                    proptest::collection::vec(b'a'..=b'd', 1..3),
                    proptest::option::of(proptest::collection::vec(0u8..8, 0..4)),
                ),
                0..32,
            ),
            cut in 0usize..40,
        ) {
            let mut batch = WriteBatch::new();
            for (key, value) in &writes {
                match value {
                    Some(v) => batch.put(key, v),
                    None => batch.delete(key),
                }
            }
            batch.truncate(cut);

            let mut replayed = WriteBatch::new();
            for (key, value) in writes.iter().take(cut) {
                match value {
                    Some(v) => replayed.put(key, v),
                    None => replayed.delete(key),
                }
            }

            proptest::prop_assert_eq!(batch.len(), replayed.len());
            let got: Vec<_> = batch.latest().collect();
            let want: Vec<_> = replayed.latest().collect();
            proptest::prop_assert_eq!(got, want);
        }
    }
}
