//! Block cache for recently read values.

use crate::types::SequenceNumber;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;

/// LRU cache of committed values keyed by `(key, version sequence)`.
///
/// Versions are immutable once committed, so an entry never goes stale;
/// it only becomes unreachable once a newer version is read instead.
#[derive(Debug)]
pub(crate) struct BlockCache {
    entries: Mutex<LruCache<(Vec<u8>, SequenceNumber), Vec<u8>>>,
}

impl BlockCache {
    pub(crate) fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub(crate) fn get(&self, key: &[u8], seq: SequenceNumber) -> Option<Vec<u8>> {
        self.entries.lock().get(&(key.to_vec(), seq)).cloned()
    }

    pub(crate) fn insert(&self, key: &[u8], seq: SequenceNumber, value: Vec<u8>) {
        self.entries.lock().put((key.to_vec(), seq), value);
    }

    /// Drops the cached value of one version.
    pub(crate) fn invalidate(&self, key: &[u8], seq: SequenceNumber) {
        self.entries.lock().pop(&(key.to_vec(), seq));
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.lock().len()
    }
}
