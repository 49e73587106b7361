//! Failure injection and crash recovery testing.
//!
//! [`FailingBackend`] wraps an in-memory backend and fails loads or
//! persists on demand, which drives the store's revert paths.
//! [`CrashRecoveryHarness`] works on real files and checks what a reopened
//! store sees after an interrupted or failed write.
//!
//! ## Scenarios
//!
//! 1. **Persist fails on root commit** - base unchanged, transaction kept
//! 2. **Process ends with open transactions** - nothing of them survives
//! 3. **Stale temp file from an interrupted persist** - ignored on reopen
//! 4. **Corrupted snapshot file** - open fails instead of loading garbage

use layerkv_codec::Snapshot;
use layerkv_core::{Store, StoreError};
use layerkv_storage::{FileBackend, InMemoryBackend, StorageBackend, StorageError, StorageResult};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// A storage backend that fails on demand.
///
/// By default it behaves exactly like [`InMemoryBackend`].
#[derive(Debug)]
pub struct FailingBackend {
    inner: InMemoryBackend,
    fail_persists: AtomicU64,
    persists_before_failure: AtomicU64,
    fail_loads: AtomicBool,
    persist_attempts: AtomicU64,
}

impl Default for FailingBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl FailingBackend {
    /// Creates a backend holding an empty snapshot.
    pub fn new() -> Self {
        Self::wrap(InMemoryBackend::new())
    }

    /// Creates a backend holding `snapshot`.
    pub fn with_snapshot(snapshot: &Snapshot) -> StorageResult<Self> {
        Ok(Self::wrap(InMemoryBackend::with_snapshot(snapshot)?))
    }

    fn wrap(inner: InMemoryBackend) -> Self {
        Self {
            inner,
            fail_persists: AtomicU64::new(0),
            persists_before_failure: AtomicU64::new(u64::MAX),
            fail_loads: AtomicBool::new(false),
            persist_attempts: AtomicU64::new(0),
        }
    }

    /// Makes the next persist fail.
    pub fn fail_next_persist(&self) {
        self.fail_next_persists(1);
    }

    /// Makes the next `count` persists fail.
    pub fn fail_next_persists(&self, count: u64) {
        self.fail_persists.store(count, Ordering::SeqCst);
    }

    /// Lets `count` more persists succeed, then fails every one after.
    pub fn fail_after(&self, count: u64) {
        self.persists_before_failure.store(count, Ordering::SeqCst);
    }

    /// Sets whether loads fail.
    pub fn set_fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    /// Clears every injected failure.
    pub fn heal(&self) {
        self.fail_persists.store(0, Ordering::SeqCst);
        self.persists_before_failure.store(u64::MAX, Ordering::SeqCst);
        self.fail_loads.store(false, Ordering::SeqCst);
    }

    /// Returns how many persists were attempted, failed ones included.
    pub fn persist_attempts(&self) -> u64 {
        self.persist_attempts.load(Ordering::SeqCst)
    }

    /// Returns how many persists succeeded.
    pub fn persist_count(&self) -> u64 {
        self.inner.persist_count()
    }

    /// Returns the last successfully persisted snapshot.
    pub fn persisted(&self) -> StorageResult<Snapshot> {
        self.inner.load()
    }

    fn take_failure(&self) -> bool {
        let pending = self
            .fail_persists
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if pending {
            return true;
        }
        self.persists_before_failure
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n != u64::MAX && n > 0).then(|| n - 1)
            })
            .map_or_else(|n| n == 0, |_| false)
    }
}

impl StorageBackend for FailingBackend {
    fn load(&self) -> StorageResult<Snapshot> {
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(StorageError::backend("simulated load failure"));
        }
        self.inner.load()
    }

    fn persist(&self, snapshot: &Snapshot) -> StorageResult<()> {
        self.persist_attempts.fetch_add(1, Ordering::SeqCst);
        if self.take_failure() {
            return Err(StorageError::backend("simulated persist failure"));
        }
        self.inner.persist(snapshot)
    }

    fn describe(&self) -> String {
        "failing-memory".to_string()
    }
}

/// Result of a crash recovery scenario.
#[derive(Debug, Clone)]
pub struct CrashRecoveryResult {
    /// Whether the scenario passed.
    pub passed: bool,
    /// Description of what was tested.
    pub description: String,
    /// Keys expected after recovery.
    pub expected_keys: usize,
    /// Keys found after recovery.
    pub actual_keys: usize,
    /// Any error message.
    pub error: Option<String>,
}

impl CrashRecoveryResult {
    /// Creates a passing result.
    pub fn pass(description: &str, keys: usize) -> Self {
        Self {
            passed: true,
            description: description.to_string(),
            expected_keys: keys,
            actual_keys: keys,
            error: None,
        }
    }

    /// Creates a failing result.
    pub fn fail(description: &str, expected: usize, actual: usize, error: &str) -> Self {
        Self {
            passed: false,
            description: description.to_string(),
            expected_keys: expected,
            actual_keys: actual,
            error: Some(error.to_string()),
        }
    }
}

/// Test harness for crash recovery scenarios on a real snapshot file.
pub struct CrashRecoveryHarness {
    /// Path to the snapshot file.
    pub path: PathBuf,
}

impl CrashRecoveryHarness {
    /// Creates a harness for a snapshot file inside `dir`.
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join("crash.lkv"),
        }
    }

    /// Opens a store over the snapshot file.
    pub fn open(&self) -> Result<Store, StoreError> {
        let backend = FileBackend::open(&self.path).map_err(StoreError::StorageReadFailed)?;
        Store::open(Arc::new(backend))
    }

    /// Commits `count` keys, leaves more in an open transaction, and drops
    /// the store without closing it.
    pub fn test_open_transaction_discarded(&self, count: usize) -> CrashRecoveryResult {
        let description = "open transaction discarded on restart";
        let run = || -> Result<usize, StoreError> {
            {
                let mut store = self.open()?;
                store.begin();
                for i in 0..count {
                    store.set(format!("committed_{i}"), i as i64)?;
                }
                store.commit()?;

                store.begin();
                store.set("pending", true)?;
                store.begin();
                store.set("pending_nested", true)?;
            }
            let store = self.open()?;
            if store.contains("pending") || store.contains("pending_nested") {
                return Err(StoreError::invalid_state("uncommitted key survived"));
            }
            Ok(store.keys().len())
        };
        check(description, count, run())
    }

    /// Leaves a temp file behind as an interrupted persist would, then
    /// checks a reopened store still sees the last complete snapshot.
    pub fn test_stale_temp_file(&self, count: usize) -> CrashRecoveryResult {
        let description = "stale temp file ignored on restart";
        let run = || -> Result<usize, StoreError> {
            {
                let mut store = self.open()?;
                for i in 0..count {
                    store.set(format!("key_{i}"), i as i64)?;
                }
            }
            std::fs::write(self.temp_path(), b"half-written snapshot")
                .map_err(|e| StoreError::StorageWriteFailed(e.into()))?;
            Ok(self.open()?.keys().len())
        };
        check(description, count, run())
    }

    /// Flips a byte in the snapshot file and checks that opening fails.
    pub fn test_corrupted_snapshot(&self) -> CrashRecoveryResult {
        let description = "corrupted snapshot rejected";
        let corrupt = || -> std::io::Result<()> {
            let mut bytes = std::fs::read(&self.path)?;
            if let Some(last) = bytes.last_mut() {
                *last ^= 0xFF;
            }
            std::fs::write(&self.path, bytes)
        };

        let prepared = self.open().and_then(|mut store| store.set("k", "v"));
        if let Err(e) = prepared {
            return CrashRecoveryResult::fail(description, 0, 0, &e.to_string());
        }
        if let Err(e) = corrupt() {
            return CrashRecoveryResult::fail(description, 0, 0, &e.to_string());
        }

        match self.open() {
            Err(StoreError::StorageReadFailed(_)) => CrashRecoveryResult::pass(description, 0),
            Err(e) => CrashRecoveryResult::fail(description, 0, 0, &e.to_string()),
            Ok(store) => CrashRecoveryResult::fail(
                description,
                0,
                store.keys().len(),
                "corrupted snapshot was loaded",
            ),
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

fn check(
    description: &str,
    expected: usize,
    result: Result<usize, StoreError>,
) -> CrashRecoveryResult {
    match result {
        Ok(actual) if actual == expected => CrashRecoveryResult::pass(description, actual),
        Ok(actual) => CrashRecoveryResult::fail(description, expected, actual, "key count mismatch"),
        Err(e) => CrashRecoveryResult::fail(description, expected, 0, &e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use layerkv_codec::Value;
    use tempfile::TempDir;

    #[test]
    fn fail_next_persist_is_one_shot() {
        let backend = FailingBackend::new();
        backend.fail_next_persist();

        assert!(backend.persist(&Snapshot::new()).is_err());
        assert!(backend.persist(&Snapshot::new()).is_ok());
        assert_eq!(backend.persist_attempts(), 2);
        assert_eq!(backend.persist_count(), 1);
    }

    #[test]
    fn fail_after_counts_successes() {
        let backend = FailingBackend::new();
        backend.fail_after(2);

        assert!(backend.persist(&Snapshot::new()).is_ok());
        assert!(backend.persist(&Snapshot::new()).is_ok());
        assert!(backend.persist(&Snapshot::new()).is_err());
        assert!(backend.persist(&Snapshot::new()).is_err());

        backend.heal();
        assert!(backend.persist(&Snapshot::new()).is_ok());
    }

    #[test]
    fn failed_load_fails_open() {
        let backend = Arc::new(FailingBackend::new());
        backend.set_fail_loads(true);
        assert!(matches!(
            Store::open(backend),
            Err(StoreError::StorageReadFailed(_))
        ));
    }

    #[test]
    fn failed_commit_then_retry() {
        let backend = Arc::new(FailingBackend::new());
        let mut store = Store::open(backend.clone()).unwrap();

        store.begin();
        store.set("a", 1).unwrap();
        backend.fail_next_persist();

        assert!(store.commit().unwrap_err().is_storage());
        assert!(store.committed().is_empty());
        assert!(backend.persisted().unwrap().is_empty());

        store.commit().unwrap();
        assert_eq!(backend.persisted().unwrap().get("a"), Some(&Value::Integer(1)));
    }

    #[test]
    fn crash_scenarios_pass() {
        let temp_dir = TempDir::new().unwrap();
        let harness = |name: &str| CrashRecoveryHarness::new(&temp_dir.path().join(name));

        let results = [
            harness("open_txn").test_open_transaction_discarded(5),
            harness("stale_temp").test_stale_temp_file(3),
            harness("corrupt").test_corrupted_snapshot(),
        ];
        for result in results {
            assert!(result.passed, "{}: {:?}", result.description, result.error);
        }
    }
}
