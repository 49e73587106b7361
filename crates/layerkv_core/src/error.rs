//! Error types for layerkv core.

use crate::transaction::TransactionState;
use layerkv_storage::StorageError;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in store operations.
///
/// Every error is local to the call that produced it: the transaction stack
/// and the base mapping are left exactly as they were before the call.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The key is not present in any visible layer, or a tombstone hides it.
    #[error("key not found: {key}")]
    KeyNotFound {
        /// The key that was looked up.
        key: String,
    },

    /// `commit` or `rollback` was called with an empty transaction stack.
    #[error("no active transaction")]
    NoActiveTransaction,

    /// A write was attempted against a finished transaction.
    #[error("transaction not active: {state}")]
    TransactionNotActive {
        /// State the transaction is in.
        state: TransactionState,
    },

    /// A state transition was attempted out of order.
    #[error("invalid transaction state: {message}")]
    InvalidTransactionState {
        /// Description of the violated rule.
        message: String,
    },

    /// The key was rejected before touching any layer.
    #[error("invalid key {key:?}: {reason}")]
    InvalidKey {
        /// The rejected key.
        key: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Persisting the base mapping failed; the in-memory state was reverted.
    #[error("storage write failed: {0}")]
    StorageWriteFailed(#[source] StorageError),

    /// Loading the base mapping failed while opening the store.
    #[error("storage read failed: {0}")]
    StorageReadFailed(#[source] StorageError),

    /// A background task running a store operation panicked or was aborted.
    #[error("store task failed: {message}")]
    TaskFailed {
        /// Description of the failure.
        message: String,
    },
}

impl StoreError {
    /// Creates a key not found error.
    pub fn key_not_found(key: impl Into<String>) -> Self {
        Self::KeyNotFound { key: key.into() }
    }

    /// Creates an invalid transaction state error.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidTransactionState {
            message: message.into(),
        }
    }

    /// Creates an invalid key error.
    pub fn invalid_key(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidKey {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Creates a task failed error.
    pub fn task_failed(message: impl Into<String>) -> Self {
        Self::TaskFailed {
            message: message.into(),
        }
    }

    /// Returns true for errors caused by the storage backend.
    #[must_use]
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            Self::StorageWriteFailed(_) | Self::StorageReadFailed(_)
        )
    }
}
