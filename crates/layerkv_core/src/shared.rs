//! Thread-safe store handle.

use crate::batch::{Batch, BatchOutcome};
use crate::config::Config;
use crate::error::StoreResult;
use crate::store::{Store, StoreStatus};
use crate::types::TransactionInfo;
use layerkv_codec::Value;
use layerkv_storage::StorageBackend;
use parking_lot::RwLock;
use std::sync::Arc;

/// A cloneable handle to a [`Store`] shared between threads.
///
/// All handles see one transaction stack. Each call holds the lock for its
/// whole duration, so a commit or batch is observed either not at all or
/// completely; reads take the shared lock and may run in parallel.
///
/// Use [`SharedStore::write`] to run several operations under one lock.
#[derive(Clone)]
pub struct SharedStore {
    inner: Arc<RwLock<Store>>,
}

impl SharedStore {
    /// Wraps an open store.
    #[must_use]
    pub fn new(store: Store) -> Self {
        Self {
            inner: Arc::new(RwLock::new(store)),
        }
    }

    /// Opens a shared store over a backend.
    ///
    /// # Errors
    ///
    /// Returns `StorageReadFailed` if the backend cannot load its snapshot.
    pub fn open(backend: Arc<dyn StorageBackend>, config: Config) -> StoreResult<Self> {
        Store::open_with_config(backend, config).map(Self::new)
    }

    /// Gets the value visible for a key.
    pub fn get(&self, key: &str) -> StoreResult<Value> {
        self.inner.read().get(key)
    }

    /// Sets a key in the current scope.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> StoreResult<()> {
        self.inner.write().set(key, value)
    }

    /// Deletes a key in the current scope.
    pub fn delete(&self, key: &str) -> StoreResult<()> {
        self.inner.write().delete(key)
    }

    /// Begins a nested transaction.
    pub fn begin(&self) -> TransactionInfo {
        self.inner.write().begin()
    }

    /// Commits the innermost transaction.
    pub fn commit(&self) -> StoreResult<()> {
        self.inner.write().commit()
    }

    /// Rolls back the innermost transaction.
    pub fn rollback(&self) -> StoreResult<()> {
        self.inner.write().rollback()
    }

    /// Applies a batch all-or-nothing.
    pub fn batch(&self, batch: Batch) -> StoreResult<BatchOutcome> {
        self.inner.write().batch(batch)
    }

    /// Reports the open transactions.
    #[must_use]
    pub fn status(&self) -> StoreStatus {
        self.inner.read().status()
    }

    /// Returns the number of open transactions.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.inner.read().depth()
    }

    /// Returns every visible key, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.inner.read().keys()
    }

    /// Runs a closure with shared access to the store.
    pub fn read<R>(&self, f: impl FnOnce(&Store) -> R) -> R {
        f(&*self.inner.read())
    }

    /// Runs a closure with exclusive access to the store.
    pub fn write<R>(&self, f: impl FnOnce(&mut Store) -> R) -> R {
        f(&mut *self.inner.write())
    }
}

impl std::fmt::Debug for SharedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedStore")
            .field("handles", &Arc::strong_count(&self.inner))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use layerkv_storage::InMemoryBackend;
    use std::thread;

    fn create_shared() -> SharedStore {
        SharedStore::new(Store::in_memory().unwrap())
    }

    #[test]
    fn handles_share_one_stack() {
        let a = create_shared();
        let b = a.clone();

        a.begin();
        b.set("k", 1).unwrap();
        assert_eq!(a.get("k").unwrap(), Value::Integer(1));
        assert_eq!(b.depth(), 1);

        a.rollback().unwrap();
        assert!(b.get("k").is_err());
    }

    #[test]
    fn concurrent_batches_are_atomic() {
        let backend = Arc::new(InMemoryBackend::new());
        let store = SharedStore::open(backend.clone(), Config::default()).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                thread::spawn(move || {
                    let batch = Batch::new()
                        .set(format!("t{i}.a"), i)
                        .set(format!("t{i}.b"), i);
                    store.batch(batch).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.keys().len(), 16);
        assert_eq!(store.depth(), 0);
        assert_eq!(backend.persist_count(), 8);
    }

    #[test]
    fn write_groups_operations() {
        let store = create_shared();

        let depth = store.write(|s| {
            s.begin();
            s.set("a", 1)?;
            s.commit()?;
            Ok::<_, crate::StoreError>(s.depth())
        });

        assert_eq!(depth.unwrap(), 0);
        assert_eq!(store.read(|s| s.committed().len()), 1);
    }
}
