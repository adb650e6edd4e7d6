//! Stress tests for kvtxn.
//!
//! Many threads increment shared counters through transaction handles.
//! Whatever the interleaving, the counters must add up to the number of
//! committed transactions.

use crate::fixtures::TestStore;
use kvtxn_core::{Outcome, TxResult};
use rand::Rng;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Transactions attempted.
    pub attempted: usize,
    /// Transactions committed.
    pub committed: usize,
    /// Commits rejected with a write conflict.
    pub conflicts: usize,
    /// Lock waits that timed out.
    pub busy: usize,
    /// Any other failure.
    pub failed: usize,
    /// Total duration.
    pub duration: Duration,
    /// Committed transactions per second.
    pub commits_per_second: f64,
}

impl StressTestResult {
    fn new(counts: &Counts, duration: Duration) -> Self {
        let committed = counts.committed.load(Ordering::Relaxed);
        let conflicts = counts.conflicts.load(Ordering::Relaxed);
        let busy = counts.busy.load(Ordering::Relaxed);
        let failed = counts.failed.load(Ordering::Relaxed);
        let commits_per_second = if duration.as_secs_f64() > 0.0 {
            committed as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            attempted: committed + conflicts + busy + failed,
            committed,
            conflicts,
            busy,
            failed,
            duration,
            commits_per_second,
        }
    }

    /// Prints a summary of the test.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {} ===", name);
        println!("Attempted: {}", self.attempted);
        println!("Committed: {}", self.committed);
        println!("Conflicts: {}", self.conflicts);
        println!("Busy: {}", self.busy);
        println!("Failed: {}", self.failed);
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} commits/sec", self.commits_per_second);
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of concurrent threads.
    pub threads: usize,
    /// Transactions attempted by each thread.
    pub transactions_per_thread: usize,
    /// Number of distinct counter keys.
    pub key_count: usize,
    /// Attach a snapshot when each transaction starts.
    pub snapshot: bool,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            threads: 4,
            transactions_per_thread: 250,
            key_count: 4,
            snapshot: false,
        }
    }
}

#[derive(Default)]
struct Counts {
    committed: AtomicUsize,
    conflicts: AtomicUsize,
    busy: AtomicUsize,
    failed: AtomicUsize,
}

impl Counts {
    fn record<T>(&self, result: &TxResult<T>) {
        let counter = match Outcome::of(result) {
            Outcome::Ok => &self.committed,
            Outcome::Conflict => &self.conflicts,
            Outcome::Busy => &self.busy,
            _ => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Key of counter `index`.
pub fn counter_key(index: usize) -> Vec<u8> {
    format!("counter:{index:04}").into_bytes()
}

/// Sum of all counters in `store`.
pub fn counter_total(store: &TestStore, key_count: usize) -> u64 {
    (0..key_count)
        .map(|i| store.committed(&counter_key(i)).map_or(0, |v| decode(&v)))
        .sum()
}

fn decode(value: &[u8]) -> u64 {
    let mut bytes = [0u8; 8];
    let len = value.len().min(8);
    bytes[..len].copy_from_slice(&value[..len]);
    u64::from_le_bytes(bytes)
}

fn increment(store: &TestStore, key: &[u8], snapshot: bool) -> TxResult<()> {
    let mut pending = store.pending();
    pending.stage_snapshot(snapshot);
    let mut tx = pending.start();

    let current = tx.get(key, true)?.map_or(0, |v| decode(&v));
    tx.put(key, &(current + 1).to_le_bytes())?;
    tx.commit()?;
    Ok(())
}

/// Runs read-modify-write increments on random counters from many threads.
pub fn stress_counter_increments(store: &TestStore, config: &StressConfig) -> StressTestResult {
    let counts = Arc::new(Counts::default());
    let start = Instant::now();

    let handles: Vec<_> = (0..config.threads)
        .map(|_| {
            let store = store.clone();
            let counts = Arc::clone(&counts);
            let config = config.clone();

            thread::spawn(move || {
                let mut rng = rand::thread_rng();
                for _ in 0..config.transactions_per_thread {
                    let key = counter_key(rng.gen_range(0..config.key_count.max(1)));
                    counts.record(&increment(&store, &key, config.snapshot));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    let result = StressTestResult::new(&counts, start.elapsed());
    debug!(
        mode = ?store.mode(),
        committed = result.committed,
        conflicts = result.conflicts,
        busy = result.busy,
        "counter stress finished"
    );
    result
}

/// Increments one counter from many threads, retrying conflicts and lock
/// timeouts until each thread has committed its share.
///
/// Returns the number of retries.
pub fn stress_retrying_increments(store: &TestStore, config: &StressConfig) -> usize {
    let retries = Arc::new(AtomicUsize::new(0));
    let key = counter_key(0);

    let handles: Vec<_> = (0..config.threads)
        .map(|_| {
            let store = store.clone();
            let retries = Arc::clone(&retries);
            let key = key.clone();
            let per_thread = config.transactions_per_thread;
            let snapshot = config.snapshot;

            thread::spawn(move || {
                let mut done = 0;
                while done < per_thread {
                    match increment(&store, &key, snapshot) {
                        Ok(()) => done += 1,
                        Err(err) if err.is_retryable() => {
                            retries.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(err) => panic!("increment failed: {err}"),
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    retries.load(Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::for_each_mode;

    #[test]
    fn test_counter_increments_add_up() {
        for_each_mode(|store| {
            let config = StressConfig {
                threads: 4,
                transactions_per_thread: 100,
                key_count: 2,
                snapshot: false,
            };
            let result = stress_counter_increments(&store, &config);
            assert_eq!(result.attempted, 400);
            assert_eq!(result.failed, 0);
            assert_eq!(counter_total(&store, 2), result.committed as u64);
        });
    }

    #[test]
    fn test_retrying_increments_lose_nothing() {
        for_each_mode(|store| {
            let config = StressConfig {
                threads: 4,
                transactions_per_thread: 50,
                key_count: 1,
                snapshot: true,
            };
            stress_retrying_increments(&store, &config);
            assert_eq!(counter_total(&store, 1), 200);
        });
    }
}
