//! Stress tests for layerkv.
//!
//! These tests verify behavior under heavy load and concurrent access
//! through [`SharedStore`].

use layerkv_core::{Batch, SharedStore, StoreError, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total operations performed.
    pub total_ops: usize,
    /// Successful operations.
    pub successful_ops: usize,
    /// Failed operations.
    pub failed_ops: usize,
    /// Total duration.
    pub duration: Duration,
    /// Operations per second.
    pub ops_per_second: f64,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(successful: usize, failed: usize, duration: Duration) -> Self {
        let total = successful + failed;
        let ops_per_second = if duration.as_secs_f64() > 0.0 {
            total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total_ops: total,
            successful_ops: successful,
            failed_ops: failed,
            duration,
            ops_per_second,
        }
    }

    /// Prints a summary of the test.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {} ===", name);
        println!("Total operations: {}", self.total_ops);
        println!("Successful: {}", self.successful_ops);
        println!("Failed: {}", self.failed_ops);
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} ops/sec", self.ops_per_second);
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of operations per thread.
    pub operations: usize,
    /// Number of concurrent threads.
    pub threads: usize,
    /// Number of distinct keys.
    pub key_count: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            operations: 1_000,
            threads: 4,
            key_count: 100,
        }
    }
}

/// Run a sequential direct-write stress test.
pub fn stress_sequential_writes(store: &SharedStore, config: &StressConfig) -> StressTestResult {
    let start = Instant::now();
    let mut successful = 0usize;
    let mut failed = 0usize;

    for i in 0..config.operations {
        match store.set(format!("key_{}", i % config.key_count), i as i64) {
            Ok(()) => successful += 1,
            Err(_) => failed += 1,
        }
    }

    StressTestResult::new(successful, failed, start.elapsed())
}

/// Run concurrent batches, each writing a pair of keys that must always
/// be observed together.
///
/// Every thread also reads the pairs of the others and counts a failure
/// whenever one half is visible without the other.
pub fn stress_concurrent_pairs(store: &SharedStore, config: &StressConfig) -> StressTestResult {
    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let start = Instant::now();

    let handles: Vec<_> = (0..config.threads)
        .map(|t| {
            let store = store.clone();
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);
            let config = config.clone();

            thread::spawn(move || {
                for i in 0..config.operations {
                    let slot = (t * config.operations + i) % config.key_count;
                    let batch = Batch::new()
                        .set(format!("pair_{slot}.left"), i as i64)
                        .set(format!("pair_{slot}.right"), i as i64);
                    let written = store.batch(batch).is_ok();

                    let probe = (slot + 1) % config.key_count;
                    let consistent = store.read(|s| {
                        let left = s.get(&format!("pair_{probe}.left")).ok();
                        let right = s.get(&format!("pair_{probe}.right")).ok();
                        left == right
                    });

                    if written && consistent {
                        successful.fetch_add(1, Ordering::Relaxed);
                    } else {
                        failed.fetch_add(1, Ordering::Relaxed);
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        if handle.join().is_err() {
            failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    )
}

/// Run nested transactions that each roll back their inner level.
///
/// Only the outer level's write may survive each round.
pub fn stress_nested_rollbacks(store: &SharedStore, config: &StressConfig) -> StressTestResult {
    let start = Instant::now();
    let mut successful = 0usize;
    let mut failed = 0usize;

    for i in 0..config.operations {
        let key = format!("nested_{}", i % config.key_count);
        let result = store.write(|s| -> Result<bool, StoreError> {
            s.begin();
            s.set(key.clone(), i as i64)?;
            s.begin();
            s.set(key.clone(), -1)?;
            s.set("scratch", true)?;
            s.rollback()?;
            s.commit()?;
            Ok(s.get(&key)? == Value::Integer(i as i64) && !s.contains("scratch"))
        });
        match result {
            Ok(true) => successful += 1,
            _ => failed += 1,
        }
    }

    StressTestResult::new(successful, failed, start.elapsed())
}

#[cfg(test)]
mod tests {
    use super::*;
    use layerkv_core::Store;

    fn small_config() -> StressConfig {
        StressConfig {
            operations: 100,
            threads: 4,
            key_count: 10,
        }
    }

    fn shared() -> SharedStore {
        SharedStore::new(Store::in_memory().unwrap())
    }

    #[test]
    fn sequential_writes() {
        let store = shared();
        let result = stress_sequential_writes(&store, &small_config());
        assert_eq!(result.failed_ops, 0);
        assert_eq!(store.keys().len(), 10);
    }

    #[test]
    fn concurrent_pairs_stay_consistent() {
        let store = shared();
        let result = stress_concurrent_pairs(&store, &small_config());
        assert_eq!(result.failed_ops, 0);
        assert_eq!(result.total_ops, 400);
        assert_eq!(store.depth(), 0);
    }

    #[test]
    fn nested_rollbacks() {
        let store = shared();
        let result = stress_nested_rollbacks(&store, &small_config());
        assert_eq!(result.failed_ops, 0);
        assert!(!store.keys().contains(&"scratch".to_string()));
    }
}
