//! Store facade: base mapping, transaction stack, and persistence.

use crate::batch::{Batch, BatchOp, BatchOutcome};
use crate::config::Config;
use crate::error::{StoreError, StoreResult};
use crate::transaction::{Entry, TransactionStack, TransactionState};
use crate::types::{TransactionId, TransactionInfo};
use layerkv_codec::{Snapshot, Value};
use layerkv_storage::{InMemoryBackend, StorageBackend};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The transactional key-value store.
///
/// `Store` owns the committed base mapping and the stack of open
/// transactions. Every operation acts on the top of the stack, or on the
/// base mapping when no transaction is open:
///
/// - Reads resolve through the open transactions, innermost first, then
///   the base mapping
/// - Writes land in the top transaction's overlay; with no transaction open
///   they go straight to the base mapping and are persisted at once
/// - `commit` folds the top overlay into the one below; committing the
///   outermost transaction persists the new base mapping
/// - `rollback` drops the top overlay
///
/// Failed operations leave the stack and the base mapping untouched. In
/// particular a root commit whose persist fails reverts the base mapping
/// and keeps the transaction open, so the caller can retry or roll back.
///
/// # Example
///
/// ```rust
/// use layerkv_core::{Store, Value};
///
/// let mut store = Store::in_memory().unwrap();
///
/// store.begin();
/// store.set("a", 50).unwrap();
/// store.begin();
/// store.set("a", 60).unwrap();
/// assert_eq!(store.get("a").unwrap(), Value::from(60));
///
/// store.rollback().unwrap();
/// assert_eq!(store.get("a").unwrap(), Value::from(50));
///
/// store.commit().unwrap();
/// assert_eq!(store.committed().get("a"), Some(&Value::from(50)));
/// ```
pub struct Store {
    /// Configuration.
    config: Config,
    /// Committed state, mirrors what the backend last persisted.
    base: Snapshot,
    /// Open transactions.
    stack: TransactionStack,
    /// Durable home of `base`.
    backend: Arc<dyn StorageBackend>,
}

/// One level of [`StoreStatus`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelStatus {
    /// 1-based depth.
    pub depth: usize,
    /// Transaction ID.
    pub id: TransactionId,
    /// Transaction state; always active while on the stack.
    pub state: TransactionState,
    /// Number of keys written or deleted at this level.
    pub pending_writes: usize,
}

impl LevelStatus {
    /// Checks if the level is active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == TransactionState::Active
    }
}

/// Snapshot of the transaction stack for introspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStatus {
    /// Number of open transactions.
    pub depth: usize,
    /// Open transactions, outermost first.
    pub levels: Vec<LevelStatus>,
}

impl StoreStatus {
    /// Checks if any transaction is open.
    #[must_use]
    pub fn has_active_transaction(&self) -> bool {
        self.depth > 0
    }

    /// Returns the innermost open transaction.
    #[must_use]
    pub fn current(&self) -> Option<&LevelStatus> {
        self.levels.last()
    }
}

impl Store {
    /// Opens a store over a backend with default configuration.
    ///
    /// The backend's snapshot becomes the base mapping.
    ///
    /// # Errors
    ///
    /// Returns `StorageReadFailed` if the backend cannot load its snapshot.
    pub fn open(backend: Arc<dyn StorageBackend>) -> StoreResult<Self> {
        Self::open_with_config(backend, Config::default())
    }

    /// Opens a store over a backend with explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns `StorageReadFailed` if the backend cannot load its snapshot.
    pub fn open_with_config(backend: Arc<dyn StorageBackend>, config: Config) -> StoreResult<Self> {
        let base = backend.load().map_err(|e| {
            warn!(backend = %backend.describe(), error = %e, "failed to load base mapping");
            StoreError::StorageReadFailed(e)
        })?;

        info!(backend = %backend.describe(), keys = base.len(), "store opened");

        Ok(Self {
            config,
            base,
            stack: TransactionStack::new(),
            backend,
        })
    }

    /// Opens an empty store over a fresh in-memory backend.
    ///
    /// # Errors
    ///
    /// Never fails in practice; the signature matches [`Store::open`].
    pub fn in_memory() -> StoreResult<Self> {
        Self::open(Arc::new(InMemoryBackend::new()))
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the backend handle.
    #[must_use]
    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.backend
    }

    // ---------------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------------

    /// Gets the value visible for a key in the current scope.
    ///
    /// # Errors
    ///
    /// Returns `KeyNotFound` if no layer holds the key or a tombstone hides it.
    pub fn get(&self, key: &str) -> StoreResult<Value> {
        self.stack.resolve(key, &self.base).cloned()
    }

    /// Checks if a key is visible in the current scope.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.stack.resolve(key, &self.base).is_ok()
    }

    /// Returns every key visible in the current scope, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.stack.visible_keys(&self.base)
    }

    /// Returns the committed base mapping.
    ///
    /// Pending writes of open transactions are not included.
    #[must_use]
    pub fn committed(&self) -> &Snapshot {
        &self.base
    }

    // ---------------------------------------------------------------------
    // Writes
    // ---------------------------------------------------------------------

    /// Sets a key in the current scope.
    ///
    /// With no transaction open the write goes straight to the base mapping
    /// and is persisted before returning.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKey` for empty or over-long keys, and
    /// `StorageWriteFailed` if a direct write cannot be persisted (the base
    /// mapping is reverted).
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> StoreResult<()> {
        let key = key.into();
        self.validate_key(&key)?;
        let value = value.into();

        if self.stack.is_empty() {
            return self.write_base(vec![(key, Entry::Present(value))]);
        }
        self.stack.top_mut()?.write(key, value)
    }

    /// Deletes a key in the current scope.
    ///
    /// Inside a transaction this installs a tombstone that hides the key
    /// from this scope and its children. With no transaction open the key
    /// is removed from the base mapping and the change persisted.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKey` for empty or over-long keys, `KeyNotFound` if
    /// the key is not visible (unless `strict_delete` is off), and
    /// `StorageWriteFailed` if a direct delete cannot be persisted.
    pub fn delete(&mut self, key: &str) -> StoreResult<()> {
        self.validate_key(key)?;
        if self.config.strict_delete && !self.contains(key) {
            return Err(StoreError::key_not_found(key));
        }

        if self.stack.is_empty() {
            return self.write_base(vec![(key.to_string(), Entry::Tombstone)]);
        }
        self.stack.top_mut()?.remove(key)
    }

    // ---------------------------------------------------------------------
    // Transactions
    // ---------------------------------------------------------------------

    /// Begins a transaction nested in the current scope.
    pub fn begin(&mut self) -> TransactionInfo {
        let txn = self.stack.push();
        let info = TransactionInfo {
            id: txn.id(),
            depth: txn.depth(),
        };
        debug!(id = %info.id, depth = info.depth, "transaction begun");
        info
    }

    /// Commits the innermost transaction.
    ///
    /// A nested commit merges the overlay into the parent transaction. A
    /// root commit merges it into the base mapping and persists the result.
    ///
    /// # Errors
    ///
    /// Returns `NoActiveTransaction` if no transaction is open, and
    /// `StorageWriteFailed` if a root commit cannot be persisted; in that
    /// case the base mapping is unchanged and the transaction stays open.
    pub fn commit(&mut self) -> StoreResult<()> {
        let top = self.stack.top()?;
        let (id, depth) = (top.id(), top.depth());

        if depth == 1 {
            let changes: Vec<(String, Entry)> = top
                .overlay()
                .entries()
                .map(|(k, e)| (k.clone(), e.clone()))
                .collect();
            let writes = changes.len();
            self.apply_to_base(changes, true)?;

            let mut txn = self.stack.pop()?;
            txn.mark_committed()?;
            debug!(%id, writes, "root transaction committed");
            return Ok(());
        }

        let mut txn = self.stack.pop()?;
        txn.mark_committed()?;
        let overlay = txn.into_overlay();
        let writes = overlay.len();
        self.stack.top_mut()?.absorb(overlay)?;
        debug!(%id, depth, writes, "nested transaction committed");
        Ok(())
    }

    /// Rolls back the innermost transaction, discarding its writes.
    ///
    /// # Errors
    ///
    /// Returns `NoActiveTransaction` if no transaction is open.
    pub fn rollback(&mut self) -> StoreResult<()> {
        let mut txn = self.stack.pop()?;
        txn.mark_rolled_back()?;
        debug!(
            id = %txn.id(),
            depth = txn.depth(),
            discarded = txn.overlay().len(),
            "transaction rolled back"
        );
        Ok(())
    }

    /// Commits the transaction with the given ID, which must be on top.
    ///
    /// # Errors
    ///
    /// Returns `NoActiveTransaction` if no transaction is open,
    /// `InvalidTransactionState` if `id` is finished or not on top, and
    /// whatever [`Store::commit`] returns.
    pub fn commit_transaction(&mut self, id: TransactionId) -> StoreResult<()> {
        self.ensure_top(id, "commit")?;
        self.commit()
    }

    /// Rolls back the transaction with the given ID, which must be on top.
    ///
    /// # Errors
    ///
    /// Returns `NoActiveTransaction` if no transaction is open and
    /// `InvalidTransactionState` if `id` is finished or not on top.
    pub fn rollback_transaction(&mut self, id: TransactionId) -> StoreResult<()> {
        self.ensure_top(id, "roll back")?;
        self.rollback()
    }

    /// Returns the number of open transactions.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.stack.depth()
    }

    /// Checks if a transaction is open.
    #[must_use]
    pub fn has_active_transaction(&self) -> bool {
        !self.stack.is_empty()
    }

    /// Returns the ID of the innermost open transaction.
    #[must_use]
    pub fn current_transaction_id(&self) -> Option<TransactionId> {
        self.stack.top().ok().map(|t| t.id())
    }

    /// Reports the open transactions.
    #[must_use]
    pub fn status(&self) -> StoreStatus {
        let levels: Vec<LevelStatus> = self
            .stack
            .iter()
            .map(|t| LevelStatus {
                depth: t.depth(),
                id: t.id(),
                state: t.state(),
                pending_writes: t.overlay().len(),
            })
            .collect();
        StoreStatus {
            depth: levels.len(),
            levels,
        }
    }

    // ---------------------------------------------------------------------
    // Batches
    // ---------------------------------------------------------------------

    /// Applies a batch of writes all-or-nothing.
    ///
    /// The operations run in order inside an implicit transaction nested in
    /// the current scope. If every operation succeeds that transaction is
    /// committed (persisting when no outer transaction is open); otherwise
    /// it is rolled back and the first failure is returned.
    ///
    /// # Errors
    ///
    /// Returns the first operation's error, or the commit's error.
    pub fn batch(&mut self, batch: Batch) -> StoreResult<BatchOutcome> {
        if batch.is_empty() {
            return Ok(BatchOutcome { applied: 0 });
        }

        let implicit_depth = self.stack.push().depth();
        let mut applied = 0;

        for (index, op) in batch.into_iter().enumerate() {
            if let Err(e) = self.apply_op(op) {
                debug!(index, error = %e, "batch operation failed, discarding batch");
                self.discard_implicit(implicit_depth)?;
                return Err(e);
            }
            applied += 1;
        }

        if let Err(e) = self.commit() {
            self.discard_implicit(implicit_depth)?;
            return Err(e);
        }

        debug!(applied, "batch applied");
        Ok(BatchOutcome { applied })
    }

    fn apply_op(&mut self, op: BatchOp) -> StoreResult<()> {
        match op {
            BatchOp::Set { key, value } => self.set(key, value),
            BatchOp::Delete { key } => self.delete(&key),
        }
    }

    fn discard_implicit(&mut self, depth: usize) -> StoreResult<()> {
        if self.stack.depth() != depth {
            return Err(StoreError::invalid_state(format!(
                "batch transaction expected at depth {depth}, stack depth is {}",
                self.stack.depth()
            )));
        }
        self.stack.pop()?.mark_rolled_back()
    }

    // ---------------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------------

    /// Closes the store, rolling back any open transactions.
    ///
    /// Returns how many transactions were discarded.
    pub fn close(mut self) -> usize {
        let mut discarded = 0;
        while let Ok(mut txn) = self.stack.pop() {
            if let Err(e) = txn.mark_rolled_back() {
                warn!(id = %txn.id(), error = %e, "discarding transaction in unexpected state");
            }
            discarded += 1;
        }
        info!(backend = %self.backend.describe(), discarded, "store closed");
        discarded
    }

    // ---------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------

    fn validate_key(&self, key: &str) -> StoreResult<()> {
        if key.is_empty() {
            return Err(StoreError::invalid_key(key, "key must not be empty"));
        }
        if key.len() > self.config.max_key_len {
            return Err(StoreError::invalid_key(
                key,
                format!(
                    "key is {} bytes, maximum is {}",
                    key.len(),
                    self.config.max_key_len
                ),
            ));
        }
        Ok(())
    }

    fn ensure_top(&self, id: TransactionId, action: &str) -> StoreResult<()> {
        let top = self.stack.top()?;
        if top.id() == id {
            return Ok(());
        }
        match self.stack.position(id) {
            Some(depth) => Err(StoreError::invalid_state(format!(
                "cannot {action} {id} at depth {depth}: depth {} is on top",
                top.depth()
            ))),
            None => Err(StoreError::invalid_state(format!(
                "cannot {action} {id}: transaction is no longer open"
            ))),
        }
    }

    fn write_base(&mut self, changes: Vec<(String, Entry)>) -> StoreResult<()> {
        let persist = self.config.persist_direct_writes;
        self.apply_to_base(changes, persist)
    }

    /// Applies changes to the base mapping, optionally persisting.
    ///
    /// On persist failure every change is undone before returning, so no
    /// caller ever sees a partially applied base mapping.
    fn apply_to_base(&mut self, changes: Vec<(String, Entry)>, persist: bool) -> StoreResult<()> {
        let mut undo: Vec<(String, Option<Value>)> = Vec::with_capacity(changes.len());
        for (key, entry) in changes {
            let previous = match entry {
                Entry::Present(value) => self.base.insert(key.clone(), value),
                Entry::Tombstone => self.base.remove(&key),
            };
            undo.push((key, previous));
        }

        if !persist {
            return Ok(());
        }

        if let Err(e) = self.backend.persist(&self.base) {
            warn!(
                backend = %self.backend.describe(),
                error = %e,
                changes = undo.len(),
                "persist failed, reverting base mapping"
            );
            for (key, previous) in undo.into_iter().rev() {
                match previous {
                    Some(value) => {
                        self.base.insert(key, value);
                    }
                    None => {
                        self.base.remove(&key);
                    }
                }
            }
            return Err(StoreError::StorageWriteFailed(e));
        }
        Ok(())
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("backend", &self.backend.describe())
            .field("committed_keys", &self.base.len())
            .field("depth", &self.stack.depth())
            .finish_non_exhaustive()
    }
}
