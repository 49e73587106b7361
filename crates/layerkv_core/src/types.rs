//! Core type definitions for layerkv.

use std::fmt;
use uuid::Uuid;

/// Unique identifier for a transaction.
///
/// Identifiers are random UUIDs assigned by `begin` and never reused. They
/// let a caller that held on to a transaction detect that it is no longer
/// the one on top of the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransactionId(Uuid);

impl TransactionId {
    /// Creates a new random transaction ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a transaction ID from a UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "txn:{}", self.0)
    }
}

/// What `begin` hands back: the new transaction's identity and position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionInfo {
    /// Identifier of the new transaction.
    pub id: TransactionId,
    /// 1-based depth in the transaction stack.
    pub depth: usize,
}
