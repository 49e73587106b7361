//! Async store handle for tokio runtimes.

use crate::batch::{Batch, BatchOutcome};
use crate::config::Config;
use crate::error::{StoreError, StoreResult};
use crate::store::{Store, StoreStatus};
use crate::types::{TransactionId, TransactionInfo};
use layerkv_codec::Value;
use layerkv_storage::StorageBackend;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// A cloneable async handle to a [`Store`].
///
/// Operations that may touch storage (`set`, `delete`, `commit`, `batch`)
/// run on the blocking pool while holding an owned write lock. The lock
/// moves into the blocking task, so dropping the returned future never
/// interrupts the operation halfway: the store ends up either fully
/// updated and persisted, or unchanged.
#[derive(Clone)]
pub struct AsyncStore {
    inner: Arc<RwLock<Store>>,
}

impl AsyncStore {
    /// Wraps an open store.
    #[must_use]
    pub fn new(store: Store) -> Self {
        Self {
            inner: Arc::new(RwLock::new(store)),
        }
    }

    /// Opens a store over a backend, loading it on the blocking pool.
    ///
    /// # Errors
    ///
    /// Returns `StorageReadFailed` if the backend cannot load its snapshot,
    /// and `TaskFailed` if the loading task panicked.
    pub async fn open(backend: Arc<dyn StorageBackend>, config: Config) -> StoreResult<Self> {
        tokio::task::spawn_blocking(move || Store::open_with_config(backend, config))
            .await
            .map_err(|e| StoreError::task_failed(e.to_string()))?
            .map(Self::new)
    }

    /// Gets the value visible for a key.
    pub async fn get(&self, key: &str) -> StoreResult<Value> {
        self.inner.read().await.get(key)
    }

    /// Sets a key in the current scope.
    pub async fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> StoreResult<()> {
        let (key, value) = (key.into(), value.into());
        self.run_exclusive(move |store| store.set(key, value)).await
    }

    /// Deletes a key in the current scope.
    pub async fn delete(&self, key: impl Into<String>) -> StoreResult<()> {
        let key = key.into();
        self.run_exclusive(move |store| store.delete(&key)).await
    }

    /// Begins a nested transaction.
    pub async fn begin(&self) -> TransactionInfo {
        self.inner.write().await.begin()
    }

    /// Commits the innermost transaction.
    pub async fn commit(&self) -> StoreResult<()> {
        self.run_exclusive(Store::commit).await
    }

    /// Rolls back the innermost transaction.
    pub async fn rollback(&self) -> StoreResult<()> {
        self.inner.write().await.rollback()
    }

    /// Commits the transaction `id`, which must be the innermost one.
    pub async fn commit_transaction(&self, id: TransactionId) -> StoreResult<()> {
        self.run_exclusive(move |store| store.commit_transaction(id)).await
    }

    /// Rolls back the transaction `id`, which must be the innermost one.
    pub async fn rollback_transaction(&self, id: TransactionId) -> StoreResult<()> {
        self.inner.write().await.rollback_transaction(id)
    }

    /// Returns true if any transaction is open.
    pub async fn has_active_transaction(&self) -> bool {
        self.inner.read().await.has_active_transaction()
    }

    /// Returns the id of the innermost open transaction.
    pub async fn current_transaction_id(&self) -> Option<TransactionId> {
        self.inner.read().await.current_transaction_id()
    }

    /// Rolls back every open transaction and returns how many were
    /// discarded.
    ///
    /// Other handles stay usable; the committed state is untouched.
    pub async fn close(&self) -> usize {
        let mut store = self.inner.write().await;
        let mut discarded = 0;
        while store.rollback().is_ok() {
            discarded += 1;
        }
        info!(discarded, "async store closed");
        discarded
    }

    /// Applies a batch all-or-nothing.
    pub async fn batch(&self, batch: Batch) -> StoreResult<BatchOutcome> {
        self.run_exclusive(move |store| store.batch(batch)).await
    }

    /// Reports the open transactions.
    pub async fn status(&self) -> StoreStatus {
        self.inner.read().await.status()
    }

    /// Returns the number of open transactions.
    pub async fn depth(&self) -> usize {
        self.inner.read().await.depth()
    }

    /// Returns every visible key, sorted.
    pub async fn keys(&self) -> Vec<String> {
        self.inner.read().await.keys()
    }

    /// Runs a closure with exclusive access on the blocking pool.
    ///
    /// The closure runs to completion even if the returned future is
    /// dropped.
    ///
    /// # Errors
    ///
    /// Returns the closure's error, or `TaskFailed` if it panicked.
    pub async fn run_exclusive<R, F>(&self, f: F) -> StoreResult<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut Store) -> StoreResult<R> + Send + 'static,
    {
        let mut guard = Arc::clone(&self.inner).write_owned().await;
        tokio::task::spawn_blocking(move || f(&mut *guard))
            .await
            .map_err(|e| StoreError::task_failed(e.to_string()))?
    }
}

impl std::fmt::Debug for AsyncStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncStore")
            .field("handles", &Arc::strong_count(&self.inner))
            .finish_non_exhaustive()
    }
}
