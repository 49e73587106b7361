//! In-memory storage backend for testing.

use crate::backend::StorageBackend;
use crate::error::StorageResult;
use layerkv_codec::{decode_snapshot, encode_snapshot, Snapshot};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

/// An in-memory storage backend.
///
/// Snapshots are kept as encoded frames, so everything persisted here goes
/// through the same codec as the file backend. Suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral stores that don't need persistence
///
/// # Thread Safety
///
/// This backend is thread-safe and can be shared across threads.
///
/// # Example
///
/// ```rust
/// use layerkv_codec::{Snapshot, Value};
/// use layerkv_storage::{InMemoryBackend, StorageBackend};
///
/// let backend = InMemoryBackend::new();
/// let mut snapshot = Snapshot::new();
/// snapshot.insert("k".to_string(), Value::Integer(1));
/// backend.persist(&snapshot).unwrap();
/// assert_eq!(backend.load().unwrap(), snapshot);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    data: RwLock<Vec<u8>>,
    persist_count: AtomicU64,
}

impl InMemoryBackend {
    /// Creates a new empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new in-memory backend preloaded with a snapshot.
    ///
    /// Useful for testing recovery scenarios.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be encoded.
    pub fn with_snapshot(snapshot: &Snapshot) -> StorageResult<Self> {
        Ok(Self {
            data: RwLock::new(encode_snapshot(snapshot)?),
            persist_count: AtomicU64::new(0),
        })
    }

    /// Returns a copy of the encoded frame currently held.
    #[must_use]
    pub fn data(&self) -> Vec<u8> {
        self.data.read().clone()
    }

    /// Returns how many times `persist` has succeeded.
    #[must_use]
    pub fn persist_count(&self) -> u64 {
        self.persist_count.load(Ordering::SeqCst)
    }

    /// Forgets everything persisted so far.
    pub fn clear(&self) {
        self.data.write().clear();
    }
}

impl StorageBackend for InMemoryBackend {
    fn load(&self) -> StorageResult<Snapshot> {
        Ok(decode_snapshot(&self.data.read())?)
    }

    fn persist(&self, snapshot: &Snapshot) -> StorageResult<()> {
        let frame = encode_snapshot(snapshot)?;
        *self.data.write() = frame;
        self.persist_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn describe(&self) -> String {
        String::from("memory")
    }
}
