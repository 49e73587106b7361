//! Per-transaction overlay of pending writes.

use layerkv_codec::Value;
use std::collections::HashMap;

/// Logical value at a key inside an overlay.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    /// The key holds this value.
    Present(Value),
    /// The key is deleted; lower layers must not be consulted.
    Tombstone,
}

impl Entry {
    /// Returns the value if present.
    #[must_use]
    pub fn value(&self) -> Option<&Value> {
        match self {
            Entry::Present(v) => Some(v),
            Entry::Tombstone => None,
        }
    }

    /// Checks if this entry is a tombstone.
    #[must_use]
    pub fn is_tombstone(&self) -> bool {
        matches!(self, Entry::Tombstone)
    }
}

/// The keys written or deleted in one transaction scope.
///
/// An overlay holds exactly the keys touched since its transaction began.
/// A later write to the same key replaces the earlier entry, so a `put`
/// after a `delete` revives the key and a `delete` after a `put` hides it.
#[derive(Debug, Default, Clone)]
pub struct Overlay {
    entries: HashMap<String, Entry>,
}

impl Overlay {
    /// Creates an empty overlay.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up the entry for a key in this overlay only.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Entry> {
        self.entries.get(key)
    }

    /// Records a value for a key.
    pub fn put(&mut self, key: impl Into<String>, value: Value) {
        self.entries.insert(key.into(), Entry::Present(value));
    }

    /// Records a tombstone for a key.
    pub fn delete(&mut self, key: impl Into<String>) {
        self.entries.insert(key.into(), Entry::Tombstone);
    }

    /// Iterates over all touched keys, in no particular order.
    pub fn entries(&self) -> impl Iterator<Item = (&String, &Entry)> {
        self.entries.iter()
    }

    /// Merges a child overlay into this one.
    ///
    /// Every child entry overwrites whatever this overlay held for the key.
    /// Tombstones stay tombstones: the parent still sits above lower layers
    /// that may hold the key.
    pub fn merge_from(&mut self, child: Overlay) {
        self.entries.extend(child.entries);
    }

    /// Returns the number of touched keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Checks if no key has been touched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IntoIterator for Overlay {
    type Item = (String, Entry);
    type IntoIter = std::collections::hash_map::IntoIter<String, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
