//! Storage backend trait definition.

use crate::error::StorageResult;
use layerkv_codec::Snapshot;
use std::sync::Arc;

/// Durable home of the committed base mapping.
///
/// Backends see whole snapshots only. They have no notion of transactions,
/// overlays, or tombstones: the store hands them the fully merged base
/// mapping and expects it back unchanged from the next `load`.
///
/// # Invariants
///
/// - `load` returns the snapshot passed to the last successful `persist`,
///   or an empty snapshot if nothing was ever persisted
/// - `persist` replaces the previous snapshot as a whole; a failed `persist`
///   leaves the previous snapshot loadable
/// - Backends must be `Send + Sync` so a store can be shared across threads
///
/// # Implementors
///
/// - [`super::InMemoryBackend`] - For testing
/// - [`super::FileBackend`] - For persistent storage
pub trait StorageBackend: Send + Sync {
    /// Loads the last persisted snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the persisted data cannot be read or decoded.
    fn load(&self) -> StorageResult<Snapshot>;

    /// Durably replaces the persisted snapshot.
    ///
    /// After this returns successfully the snapshot survives process
    /// termination and is what the next `load` returns.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be encoded or written.
    fn persist(&self, snapshot: &Snapshot) -> StorageResult<()>;

    /// Short human-readable description used in log lines.
    fn describe(&self) -> String {
        String::from("storage")
    }
}

impl<T: StorageBackend + ?Sized> StorageBackend for Arc<T> {
    fn load(&self) -> StorageResult<Snapshot> {
        (**self).load()
    }

    fn persist(&self, snapshot: &Snapshot) -> StorageResult<()> {
        (**self).persist(snapshot)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

impl<T: StorageBackend + ?Sized> StorageBackend for Box<T> {
    fn load(&self) -> StorageResult<Snapshot> {
        (**self).load()
    }

    fn persist(&self, snapshot: &Snapshot) -> StorageResult<()> {
        (**self).persist(snapshot)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
