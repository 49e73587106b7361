//! # layerkv storage
//!
//! Storage backend trait and implementations for layerkv.
//!
//! This crate provides the persistence layer beneath the transaction
//! engine. Backends store **whole snapshots** of the committed base
//! mapping - they know nothing about transactions, overlays, or
//! tombstones.
//!
//! ## Design Principles
//!
//! - Backends load and persist complete snapshots, nothing finer
//! - A successful persist is durable and replaces the previous snapshot
//! - A failed persist leaves the previous snapshot loadable
//! - Must be `Send + Sync` for concurrent access
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - For testing and ephemeral stores
//! - [`FileBackend`] - Single-file persistence with atomic replace
//!
//! ## Example
//!
//! ```rust
//! use layerkv_codec::{Snapshot, Value};
//! use layerkv_storage::{InMemoryBackend, StorageBackend};
//!
//! let backend = InMemoryBackend::new();
//! let mut snapshot = backend.load().unwrap();
//! snapshot.insert("hello".to_string(), Value::from("world"));
//! backend.persist(&snapshot).unwrap();
//! assert_eq!(backend.load().unwrap().len(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::{FileBackend, FileOptions};
pub use memory::InMemoryBackend;
pub use layerkv_codec::Snapshot;
