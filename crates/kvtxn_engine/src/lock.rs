//! Exclusive per-key row locks for pessimistic transactions.

use crate::error::{EngineError, EngineResult};
use crate::types::TransactionId;
use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Table of row locks.
///
/// A lock is owned by exactly one transaction and is re-entrant for it.
/// Waiters block on a condition variable that is signalled whenever any
/// lock is released.
#[derive(Debug, Default)]
pub(crate) struct LockManager {
    owners: Mutex<HashMap<Vec<u8>, TransactionId>>,
    released: Condvar,
}

impl LockManager {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Locks `key` for `txid`, waiting at most `timeout`.
    ///
    /// Returns `true` if the lock was newly taken and `false` if `txid`
    /// already held it.
    pub(crate) fn acquire(
        &self,
        txid: TransactionId,
        key: &[u8],
        timeout: Duration,
    ) -> EngineResult<bool> {
        // An unrepresentable deadline means wait forever.
        let deadline = Instant::now().checked_add(timeout);
        let mut owners = self.owners.lock();
        loop {
            match owners.get(key) {
                None => {
                    owners.insert(key.to_vec(), txid);
                    return Ok(true);
                }
                Some(&owner) if owner == txid => return Ok(false),
                Some(_) => {}
            }

            match deadline {
                Some(deadline) => {
                    if Instant::now() >= deadline {
                        return Err(EngineError::LockTimeout {
                            key: key.to_vec(),
                            timeout,
                        });
                    }
                    self.released.wait_until(&mut owners, deadline);
                }
                None => self.released.wait(&mut owners),
            }
        }
    }

    /// Releases the given keys if `txid` holds them.
    pub(crate) fn release<'a, I>(&self, txid: TransactionId, keys: I)
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        let mut owners = self.owners.lock();
        let mut released_any = false;
        for key in keys {
            if owners.get(key) == Some(&txid) {
                owners.remove(key);
                released_any = true;
            }
        }
        drop(owners);
        if released_any {
            self.released.notify_all();
        }
    }

    /// Returns the transaction holding `key`, if any.
    pub(crate) fn holder(&self, key: &[u8]) -> Option<TransactionId> {
        self.owners.lock().get(key).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    const T1: TransactionId = TransactionId::new(1);
    const T2: TransactionId = TransactionId::new(2);

    #[test]
    fn acquire_is_reentrant() {
        let locks = LockManager::new();
        assert!(locks.acquire(T1, b"k", Duration::ZERO).unwrap());
        assert!(!locks.acquire(T1, b"k", Duration::ZERO).unwrap());
        assert_eq!(locks.holder(b"k"), Some(T1));
    }

    #[test]
    fn contended_lock_times_out() {
        let locks = LockManager::new();
        locks.acquire(T1, b"k", Duration::ZERO).unwrap();

        let err = locks
            .acquire(T2, b"k", Duration::from_millis(20))
            .unwrap_err();
        assert!(matches!(err, EngineError::LockTimeout { .. }));
    }

    #[test]
    fn release_only_affects_owner() {
        let locks = LockManager::new();
        locks.acquire(T1, b"k", Duration::ZERO).unwrap();
        locks.release(T2, [&b"k"[..]]);
        assert_eq!(locks.holder(b"k"), Some(T1));

        locks.release(T1, [&b"k"[..]]);
        assert_eq!(locks.holder(b"k"), None);
    }

    #[test]
    fn waiter_wakes_on_release() {
        let locks = Arc::new(LockManager::new());
        locks.acquire(T1, b"k", Duration::ZERO).unwrap();

        let waiter = {
            let locks = Arc::clone(&locks);
            thread::spawn(move || locks.acquire(T2, b"k", Duration::from_secs(5)))
        };

        thread::sleep(Duration::from_millis(20));
        locks.release(T1, [&b"k"[..]]);

        assert!(waiter.join().unwrap().unwrap());
        assert_eq!(locks.holder(b"k"), Some(T2));
    }
}
