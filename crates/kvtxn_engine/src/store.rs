//! Multi-version key-value store shared by every transaction on a database.

use crate::checksum::compute_crc32;
use crate::types::SequenceNumber;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicU64, Ordering};

/// One committed version of a key.
#[derive(Debug, Clone)]
struct Version {
    seq: SequenceNumber,
    /// `None` marks a point deletion.
    value: Option<Vec<u8>>,
    checksum: u32,
}

/// Deletion of every key in `[start, end)` committed at `seq`.
#[derive(Debug, Clone)]
struct RangeTombstone {
    start: Vec<u8>,
    end: Vec<u8>,
    seq: SequenceNumber,
}

impl RangeTombstone {
    fn covers(&self, key: &[u8], version_seq: SequenceNumber, read_seq: SequenceNumber) -> bool {
        self.start.as_slice() <= key
            && key < self.end.as_slice()
            && self.seq > version_seq
            && self.seq <= read_seq
    }
}

/// A live value as seen at some read sequence.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LiveVersion<'a> {
    pub(crate) seq: SequenceNumber,
    pub(crate) value: &'a [u8],
    pub(crate) checksum: u32,
}

/// In-memory versioned keyspace.
///
/// Version chains are kept in ascending sequence order. Writers must be
/// serialized by the caller so that sequence numbers are assigned in
/// commit order.
///
/// Nothing is pruned: version chains and range tombstones grow for the
/// life of the store, whether or not any snapshot can still see them.
#[derive(Debug, Default)]
pub(crate) struct VersionedStore {
    data: RwLock<BTreeMap<Vec<u8>, Vec<Version>>>,
    range_tombstones: RwLock<Vec<RangeTombstone>>,
    last_seq: AtomicU64,
}

impl VersionedStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Sequence number of the most recent commit.
    pub(crate) fn latest_sequence(&self) -> SequenceNumber {
        SequenceNumber::new(self.last_seq.load(Ordering::SeqCst))
    }

    /// Sequence number of the newest version of `key`, tombstones included.
    pub(crate) fn latest_version_seq(&self, key: &[u8]) -> Option<SequenceNumber> {
        self.data
            .read()
            .get(key)
            .and_then(|chain| chain.last())
            .map(|v| v.seq)
    }

    /// Runs `f` against the live version of `key` visible at `read_seq`.
    ///
    /// Returns `None` when the key is absent, point-deleted, or (unless
    /// `ignore_range_deletions`) covered by a range tombstone.
    pub(crate) fn with_live_version<R>(
        &self,
        key: &[u8],
        read_seq: SequenceNumber,
        ignore_range_deletions: bool,
        f: impl FnOnce(LiveVersion<'_>) -> R,
    ) -> Option<R> {
        let data = self.data.read();
        let version = data
            .get(key)?
            .iter()
            .rev()
            .find(|v| v.seq <= read_seq)?;
        let value = version.value.as_deref()?;

        if !ignore_range_deletions && self.range_deleted(key, version.seq, read_seq) {
            return None;
        }

        Some(f(LiveVersion {
            seq: version.seq,
            value,
            checksum: version.checksum,
        }))
    }

    /// Collects every live pair visible at `read_seq` below `upper_bound`.
    pub(crate) fn scan(
        &self,
        read_seq: SequenceNumber,
        ignore_range_deletions: bool,
        upper_bound: Option<&[u8]>,
        mut f: impl FnMut(&[u8], LiveVersion<'_>),
    ) {
        let data = self.data.read();
        let upper = match upper_bound {
            Some(bound) => Bound::Excluded(bound),
            None => Bound::Unbounded,
        };
        for (key, chain) in data.range::<[u8], _>((Bound::Unbounded, upper)) {
            let Some(version) = chain.iter().rev().find(|v| v.seq <= read_seq) else {
                continue;
            };
            let Some(value) = version.value.as_deref() else {
                continue;
            };
            if !ignore_range_deletions && self.range_deleted(key, version.seq, read_seq) {
                continue;
            }
            f(
                key,
                LiveVersion {
                    seq: version.seq,
                    value,
                    checksum: version.checksum,
                },
            );
        }
    }

    /// Appends one version per write under a single new sequence number.
    ///
    /// `None` values are point deletions.
    pub(crate) fn apply<'a, I>(&self, writes: I) -> SequenceNumber
    where
        I: IntoIterator<Item = (&'a [u8], Option<&'a [u8]>)>,
    {
        let mut data = self.data.write();
        let seq = self.latest_sequence().next();
        for (key, value) in writes {
            let version = Version {
                seq,
                checksum: value.map_or(0, compute_crc32),
                value: value.map(<[u8]>::to_vec),
            };
            data.entry(key.to_vec()).or_default().push(version);
        }
        self.last_seq.store(seq.as_u64(), Ordering::SeqCst);
        seq
    }

    /// Records a range tombstone over `[start, end)`.
    pub(crate) fn delete_range(&self, start: &[u8], end: &[u8]) -> SequenceNumber {
        let mut tombstones = self.range_tombstones.write();
        let seq = self.latest_sequence().next();
        tombstones.push(RangeTombstone {
            start: start.to_vec(),
            end: end.to_vec(),
            seq,
        });
        self.last_seq.store(seq.as_u64(), Ordering::SeqCst);
        seq
    }

    /// Flips the stored checksum of the newest live version of `key` and
    /// returns that version's sequence number.
    pub(crate) fn corrupt_latest(&self, key: &[u8]) -> Option<SequenceNumber> {
        let mut data = self.data.write();
        match data.get_mut(key).and_then(|chain| chain.last_mut()) {
            Some(version) if version.value.is_some() => {
                version.checksum = !version.checksum;
                Some(version.seq)
            }
            _ => None,
        }
    }

    fn range_deleted(&self, key: &[u8], version_seq: SequenceNumber, read_seq: SequenceNumber) -> bool {
        self.range_tombstones
            .read()
            .iter()
            .any(|rt| rt.covers(key, version_seq, read_seq))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(store: &VersionedStore, key: &[u8], seq: SequenceNumber) -> Option<Vec<u8>> {
        store.with_live_version(key, seq, false, |v| v.value.to_vec())
    }

    #[test]
    fn apply_assigns_increasing_sequences() {
        let store = VersionedStore::new();
        let s1 = store.apply([(&b"a"[..], Some(&b"1"[..]))]);
        let s2 = store.apply([(&b"a"[..], Some(&b"2"[..]))]);
        assert!(s2 > s1);
        assert_eq!(store.latest_sequence(), s2);
    }

    #[test]
    fn reads_see_version_at_sequence() {
        let store = VersionedStore::new();
        let s1 = store.apply([(&b"a"[..], Some(&b"1"[..]))]);
        let s2 = store.apply([(&b"a"[..], Some(&b"2"[..]))]);

        assert_eq!(read(&store, b"a", s1), Some(b"1".to_vec()));
        assert_eq!(read(&store, b"a", s2), Some(b"2".to_vec()));
        assert_eq!(read(&store, b"a", SequenceNumber::new(0)), None);
    }

    #[test]
    fn tombstone_hides_key() {
        let store = VersionedStore::new();
        store.apply([(&b"a"[..], Some(&b"1"[..]))]);
        let s2 = store.apply([(&b"a"[..], None)]);

        assert_eq!(read(&store, b"a", s2), None);
        assert_eq!(store.latest_version_seq(b"a"), Some(s2));
    }

    #[test]
    fn range_tombstone_respects_ignore_flag() {
        let store = VersionedStore::new();
        store.apply([(&b"b"[..], Some(&b"1"[..]))]);
        let seq = store.delete_range(b"a", b"c");

        assert_eq!(read(&store, b"b", seq), None);
        let ignored = store.with_live_version(b"b", seq, true, |v| v.value.to_vec());
        assert_eq!(ignored, Some(b"1".to_vec()));
    }

    #[test]
    fn range_tombstone_does_not_hide_newer_writes() {
        let store = VersionedStore::new();
        store.apply([(&b"b"[..], Some(&b"1"[..]))]);
        store.delete_range(b"a", b"c");
        let s3 = store.apply([(&b"b"[..], Some(&b"2"[..]))]);

        assert_eq!(read(&store, b"b", s3), Some(b"2".to_vec()));
    }

    #[test]
    fn scan_respects_upper_bound() {
        let store = VersionedStore::new();
        let seq = store.apply([
            (&b"a"[..], Some(&b"1"[..])),
            (&b"b"[..], Some(&b"2"[..])),
            (&b"c"[..], Some(&b"3"[..])),
        ]);

        let mut keys = Vec::new();
        store.scan(seq, false, Some(b"c"), |k, _| keys.push(k.to_vec()));
        assert_eq!(keys, vec![b"a".to_vec(), b"b".to_vec()]);
    }

    #[test]
    fn corrupt_latest_changes_checksum() {
        let store = VersionedStore::new();
        let seq = store.apply([(&b"a"[..], Some(&b"1"[..]))]);
        assert_eq!(store.corrupt_latest(b"a"), Some(seq));
        assert_eq!(store.corrupt_latest(b"missing"), None);

        let checksum = store.with_live_version(b"a", seq, false, |v| v.checksum);
        assert_ne!(checksum, Some(compute_crc32(b"1")));
    }

    #[test]
    fn superseded_versions_are_retained() {
        let store = VersionedStore::new();
        let first = store.apply([(&b"a"[..], Some(&b"1"[..]))]);
        for value in [b"2", b"3", b"4"] {
            store.apply([(&b"a"[..], Some(&value[..]))]);
        }
        store.apply([(&b"a"[..], None)]);
        store.delete_range(b"a", b"b");

        assert_eq!(read(&store, b"a", first), Some(b"1".to_vec()));
        assert_eq!(store.data.read()[&b"a"[..]].len(), 5);
        assert_eq!(store.range_tombstones.read().len(), 1);
    }
}
