//! Store configuration.

/// Default upper bound on key length, in bytes.
pub const DEFAULT_MAX_KEY_LEN: usize = 255;

/// Configuration for opening a store.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum key length in bytes. Keys must also be non-empty.
    pub max_key_len: usize,

    /// Whether deleting a key that does not resolve is a `KeyNotFound` error.
    ///
    /// When false, such deletes still install a tombstone and succeed.
    pub strict_delete: bool,

    /// Whether writes made with no open transaction are persisted at once.
    ///
    /// When false they only update the in-memory base mapping and reach
    /// storage with the next root commit.
    pub persist_direct_writes: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_key_len: DEFAULT_MAX_KEY_LEN,
            strict_delete: true,
            persist_direct_writes: true,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum key length.
    #[must_use]
    pub const fn max_key_len(mut self, len: usize) -> Self {
        self.max_key_len = len;
        self
    }

    /// Sets whether deleting an unresolved key fails.
    #[must_use]
    pub const fn strict_delete(mut self, value: bool) -> Self {
        self.strict_delete = value;
        self
    }

    /// Sets whether direct writes persist immediately.
    #[must_use]
    pub const fn persist_direct_writes(mut self, value: bool) -> Self {
        self.persist_direct_writes = value;
        self
    }
}
