//! # layerkv core
//!
//! Transactional key-value store with nested transactions.
//!
//! This crate provides:
//! - [`Store`], the single-owner store facade
//! - Nested transactions with read-your-own-writes and tombstone deletes
//! - All-or-nothing [`Batch`] writes
//! - [`SharedStore`] and (with the `async` feature) [`AsyncStore`] handles
//!
//! Committed state lives in a [`StorageBackend`]; only the outermost
//! commit, or a write made with no transaction open, reaches it.
//!
//! ## Example
//!
//! ```rust
//! use layerkv_core::{Store, Value};
//!
//! let mut store = Store::in_memory().unwrap();
//! store.set("user", "Alice").unwrap();
//!
//! store.begin();
//! store.delete("user").unwrap();
//! assert!(store.get("user").is_err());
//! store.rollback().unwrap();
//!
//! assert_eq!(store.get("user").unwrap(), Value::from("Alice"));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

#[cfg(feature = "async")]
mod async_store;
mod batch;
mod config;
mod error;
mod shared;
mod store;
mod transaction;
mod types;

#[cfg(feature = "async")]
pub use async_store::AsyncStore;
pub use batch::{Batch, BatchOp, BatchOutcome};
pub use config::{Config, DEFAULT_MAX_KEY_LEN};
pub use error::{StoreError, StoreResult};
pub use shared::SharedStore;
pub use store::{LevelStatus, Store, StoreStatus};
pub use transaction::{Entry, Overlay, Scope, Transaction, TransactionStack, TransactionState};
pub use types::{TransactionId, TransactionInfo};

pub use layerkv_codec::{Snapshot, Value};
pub use layerkv_storage::{
    FileBackend, FileOptions, InMemoryBackend, StorageBackend, StorageError, StorageResult,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
