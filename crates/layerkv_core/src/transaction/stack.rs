//! The ordered stack of open transactions.

use crate::error::{StoreError, StoreResult};
use crate::transaction::overlay::Entry;
use crate::transaction::state::{Scope, Transaction};
use crate::types::TransactionId;
use layerkv_codec::{Snapshot, Value};
use std::collections::BTreeSet;

/// Open transactions, outermost first.
///
/// The transaction at index `i` has depth `i + 1` and reads through the one
/// at index `i - 1` (or the base mapping for index 0). Only the top may be
/// popped, which is what enforces stack discipline for commit and rollback.
#[derive(Debug, Default)]
pub struct TransactionStack {
    frames: Vec<Transaction>,
}

impl TransactionStack {
    /// Creates an empty stack.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of open transactions.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Checks if no transaction is open.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Opens a new transaction on top of the current one.
    pub fn push(&mut self) -> &Transaction {
        let depth = self.frames.len() + 1;
        let parent = match self.frames.len() {
            0 => Scope::Base,
            n => Scope::Transaction(n),
        };
        self.frames.push(Transaction::new(depth, parent));
        &self.frames[depth - 1]
    }

    /// Removes the top transaction.
    pub(crate) fn pop(&mut self) -> StoreResult<Transaction> {
        self.frames.pop().ok_or(StoreError::NoActiveTransaction)
    }

    /// Returns the top transaction.
    pub fn top(&self) -> StoreResult<&Transaction> {
        self.frames.last().ok_or(StoreError::NoActiveTransaction)
    }

    /// Returns the top transaction mutably.
    pub(crate) fn top_mut(&mut self) -> StoreResult<&mut Transaction> {
        self.frames.last_mut().ok_or(StoreError::NoActiveTransaction)
    }

    /// Returns the transaction at a 1-based depth.
    #[must_use]
    pub fn at(&self, depth: usize) -> Option<&Transaction> {
        depth.checked_sub(1).and_then(|i| self.frames.get(i))
    }

    /// Finds the depth of an open transaction.
    #[must_use]
    pub fn position(&self, id: TransactionId) -> Option<usize> {
        self.frames.iter().position(|t| t.id() == id).map(|i| i + 1)
    }

    /// Iterates from the outermost to the innermost transaction.
    pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
        self.frames.iter()
    }

    /// Resolves a key from the top of the stack, falling back to `base`.
    ///
    /// # Errors
    ///
    /// Returns `KeyNotFound` if the key does not resolve at any layer.
    pub fn resolve<'a>(&'a self, key: &str, base: &'a Snapshot) -> StoreResult<&'a Value> {
        match self.frames.last() {
            Some(top) => top.read(key, self, base),
            None => base.get(key).ok_or_else(|| StoreError::key_not_found(key)),
        }
    }

    /// Returns every key visible from the top of the stack, sorted.
    #[must_use]
    pub fn visible_keys(&self, base: &Snapshot) -> Vec<String> {
        let mut keys: BTreeSet<&str> = base.keys().map(String::as_str).collect();
        for txn in &self.frames {
            for (key, entry) in txn.overlay().entries() {
                match entry {
                    Entry::Present(_) => {
                        keys.insert(key.as_str());
                    }
                    Entry::Tombstone => {
                        keys.remove(key.as_str());
                    }
                }
            }
        }
        keys.into_iter().map(str::to_string).collect()
    }
}
