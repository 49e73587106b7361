//! Test fixtures and store helpers.
//!
//! Provides convenience functions for setting up test stores
//! and common test scenarios.

use crate::crash::FailingBackend;
use layerkv_core::{Config, FileBackend, InMemoryBackend, StorageBackend, Store};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// File name of the snapshot inside a file-backed fixture's directory.
pub const SNAPSHOT_FILE: &str = "store.lkv";

/// A test store with automatic cleanup.
pub struct TestStore {
    /// The store instance.
    pub store: Store,
    /// The temporary directory (kept alive to prevent cleanup).
    temp_dir: Option<TempDir>,
}

impl TestStore {
    /// Creates a new in-memory test store.
    pub fn memory() -> Self {
        Self::over(Arc::new(InMemoryBackend::new()))
    }

    /// Creates a new in-memory test store with explicit configuration.
    pub fn memory_with_config(config: Config) -> Self {
        Self {
            store: Store::open_with_config(Arc::new(InMemoryBackend::new()), config)
                .expect("Failed to open in-memory store"),
            temp_dir: None,
        }
    }

    /// Creates a test store over a backend that fails on demand.
    pub fn failing() -> (Self, Arc<FailingBackend>) {
        let backend = Arc::new(FailingBackend::new());
        (Self::over(backend.clone()), backend)
    }

    /// Creates a new file-based test store in a fresh temp directory.
    pub fn file() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = open_file_store(&temp_dir.path().join(SNAPSHOT_FILE));
        Self {
            store,
            temp_dir: Some(temp_dir),
        }
    }

    fn over(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            store: Store::open(backend).expect("Failed to open store"),
            temp_dir: None,
        }
    }

    /// Returns the snapshot path if file-based, None if in-memory.
    pub fn path(&self) -> Option<PathBuf> {
        self.temp_dir.as_ref().map(|d| d.path().join(SNAPSHOT_FILE))
    }

    /// Drops the store and opens a fresh one over the same file, as a
    /// process restart would. Open transactions are lost.
    ///
    /// # Panics
    ///
    /// Panics for in-memory stores.
    pub fn restart(self) -> Self {
        let Self { store, temp_dir } = self;
        let temp_dir = temp_dir.expect("Only file-based stores can restart");
        drop(store);

        let store = open_file_store(&temp_dir.path().join(SNAPSHOT_FILE));
        Self {
            store,
            temp_dir: Some(temp_dir),
        }
    }
}

fn open_file_store(path: &Path) -> Store {
    let backend = FileBackend::open(path).expect("Failed to create file backend");
    Store::open(Arc::new(backend)).expect("Failed to open file store")
}

impl std::ops::Deref for TestStore {
    type Target = Store;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

impl std::ops::DerefMut for TestStore {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.store
    }
}

/// Runs a test with a temporary in-memory store.
///
/// # Example
///
/// ```rust
/// use layerkv_testkit::with_temp_store;
///
/// with_temp_store(|store| {
///     store.set("k", 1).unwrap();
///     assert!(store.contains("k"));
/// });
/// ```
pub fn with_temp_store<F, R>(f: F) -> R
where
    F: FnOnce(&mut Store) -> R,
{
    let mut test_store = TestStore::memory();
    f(&mut test_store.store)
}

/// Runs a test with a temporary file-based store.
pub fn with_file_store<F, R>(f: F) -> R
where
    F: FnOnce(&mut Store, &Path) -> R,
{
    let mut test_store = TestStore::file();
    let path = test_store
        .path()
        .expect("File store should have a path");
    f(&mut test_store.store, &path)
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;

    /// Creates a store with `count` committed keys `key_0..key_{count-1}`.
    pub fn populated_store(count: usize) -> TestStore {
        let mut test_store = TestStore::memory();
        test_store.begin();
        for i in 0..count {
            test_store
                .set(format!("key_{i}"), i as i64)
                .expect("Failed to set key");
        }
        test_store.commit().expect("Failed to commit");
        test_store
    }

    /// Creates a store with `depth` nested transactions, each setting
    /// `"level"` to its depth.
    pub fn nested_store(depth: usize) -> TestStore {
        let mut test_store = TestStore::memory();
        for level in 1..=depth {
            test_store.begin();
            test_store
                .set("level", level as i64)
                .expect("Failed to set level");
        }
        test_store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use layerkv_codec::Value;

    #[test]
    fn memory_store_starts_empty() {
        let test_store = TestStore::memory();
        assert!(test_store.keys().is_empty());
        assert!(test_store.path().is_none());
    }

    #[test]
    fn with_temp_store_runs_closure() {
        let depth = with_temp_store(|store| {
            store.begin();
            store.depth()
        });
        assert_eq!(depth, 1);
    }

    #[test]
    fn file_store_survives_restart() {
        let mut test_store = TestStore::file();
        test_store.set("direct", "persisted").unwrap();
        test_store.begin();
        test_store.set("txn", 1).unwrap();
        test_store.commit().unwrap();
        test_store.begin();
        test_store.set("lost", true).unwrap();

        let test_store = test_store.restart();
        assert_eq!(test_store.keys(), vec!["direct", "txn"]);
        assert_eq!(test_store.get("direct").unwrap(), Value::from("persisted"));
        assert_eq!(test_store.depth(), 0);
    }

    #[test]
    fn with_file_store_exposes_path() {
        with_file_store(|store, path| {
            store.set("k", 1).unwrap();
            assert!(path.exists());
        });
    }

    #[test]
    fn populated_scenario() {
        let test_store = scenarios::populated_store(10);
        assert_eq!(test_store.committed().len(), 10);
    }

    #[test]
    fn nested_scenario() {
        let mut test_store = scenarios::nested_store(3);
        assert_eq!(test_store.get("level").unwrap(), Value::Integer(3));
        test_store.rollback().unwrap();
        assert_eq!(test_store.get("level").unwrap(), Value::Integer(2));
    }

    #[test]
    fn failing_fixture_shares_backend() {
        let (mut test_store, backend) = TestStore::failing();
        backend.fail_next_persist();
        assert!(test_store.set("k", 1).is_err());
        assert!(test_store.set("k", 1).is_ok());
    }
}
