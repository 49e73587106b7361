//! Transaction state.

use crate::error::{StoreError, StoreResult};
use crate::transaction::overlay::{Entry, Overlay};
use crate::transaction::stack::TransactionStack;
use crate::types::TransactionId;
use layerkv_codec::{Snapshot, Value};
use std::fmt;

/// State of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Transaction is open and accepts writes.
    Active,
    /// Transaction has been committed into its parent scope.
    Committed,
    /// Transaction has been rolled back.
    RolledBack,
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Active => "active",
            Self::Committed => "committed",
            Self::RolledBack => "rolled back",
        })
    }
}

/// The scope a transaction reads through once its own overlay misses.
///
/// Parents are referenced by position in the stack, never owned, so a
/// child can resolve through its parent but never write into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// The store's committed base mapping.
    Base,
    /// The transaction at this 1-based depth.
    Transaction(usize),
}

/// One level of the transaction stack.
///
/// Holds the pending writes of a single scope. Writes never escape the
/// overlay until the transaction is committed into its parent.
#[derive(Debug)]
pub struct Transaction {
    /// Transaction ID.
    id: TransactionId,
    /// 1-based position in the stack.
    depth: usize,
    /// Where reads fall through to.
    parent: Scope,
    /// Current state.
    state: TransactionState,
    /// Pending writes and tombstones.
    overlay: Overlay,
}

impl Transaction {
    /// Creates a new active transaction.
    pub(crate) fn new(depth: usize, parent: Scope) -> Self {
        Self {
            id: TransactionId::new(),
            depth,
            parent,
            state: TransactionState::Active,
            overlay: Overlay::new(),
        }
    }

    /// Returns the transaction ID.
    #[must_use]
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Returns the 1-based depth.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Returns the parent scope.
    #[must_use]
    pub fn parent(&self) -> Scope {
        self.parent
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Checks if the transaction is still active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == TransactionState::Active
    }

    /// Returns the pending writes of this scope.
    #[must_use]
    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    /// Resolves a key as seen from this transaction.
    ///
    /// Checks this overlay, then each enclosing scope in turn, and finally
    /// the base mapping. The first entry found decides: a value is returned,
    /// a tombstone means not found.
    ///
    /// # Errors
    ///
    /// Returns `KeyNotFound` if no layer holds the key or a tombstone hides
    /// it, and `InvalidTransactionState` if a parent reference points
    /// outside the stack.
    pub fn read<'a>(
        &'a self,
        key: &str,
        stack: &'a TransactionStack,
        base: &'a Snapshot,
    ) -> StoreResult<&'a Value> {
        let mut current = self;
        loop {
            match current.overlay.get(key) {
                Some(Entry::Present(value)) => return Ok(value),
                Some(Entry::Tombstone) => return Err(StoreError::key_not_found(key)),
                None => {}
            }
            current = match current.parent {
                Scope::Base => {
                    return base.get(key).ok_or_else(|| StoreError::key_not_found(key));
                }
                Scope::Transaction(depth) => stack.at(depth).ok_or_else(|| {
                    StoreError::invalid_state(format!(
                        "transaction at depth {} refers to missing parent at depth {depth}",
                        current.depth
                    ))
                })?,
            };
        }
    }

    /// Records a value for a key.
    pub fn write(&mut self, key: impl Into<String>, value: Value) -> StoreResult<()> {
        self.ensure_active()?;
        self.overlay.put(key, value);
        Ok(())
    }

    /// Records a tombstone for a key.
    pub fn remove(&mut self, key: impl Into<String>) -> StoreResult<()> {
        self.ensure_active()?;
        self.overlay.delete(key);
        Ok(())
    }

    /// Folds a committed child's overlay into this one.
    pub(crate) fn absorb(&mut self, child: Overlay) -> StoreResult<()> {
        self.ensure_active()?;
        self.overlay.merge_from(child);
        Ok(())
    }

    /// Marks the transaction as committed.
    pub(crate) fn mark_committed(&mut self) -> StoreResult<()> {
        self.transition(TransactionState::Committed)
    }

    /// Marks the transaction as rolled back.
    pub(crate) fn mark_rolled_back(&mut self) -> StoreResult<()> {
        self.transition(TransactionState::RolledBack)
    }

    /// Gives up the overlay once the transaction is finished.
    pub(crate) fn into_overlay(self) -> Overlay {
        self.overlay
    }

    fn transition(&mut self, to: TransactionState) -> StoreResult<()> {
        if self.state != TransactionState::Active {
            return Err(StoreError::invalid_state(format!(
                "{} cannot become {to}: already {}",
                self.id, self.state
            )));
        }
        self.state = to;
        Ok(())
    }

    /// Ensures the transaction is active.
    fn ensure_active(&self) -> StoreResult<()> {
        match self.state {
            TransactionState::Active => Ok(()),
            state => Err(StoreError::TransactionNotActive { state }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_txn() -> Transaction {
        Transaction::new(1, Scope::Base)
    }

    #[test]
    fn new_transaction_is_active() {
        let txn = create_txn();
        assert!(txn.is_active());
        assert_eq!(txn.state(), TransactionState::Active);
        assert_eq!(txn.depth(), 1);
        assert_eq!(txn.parent(), Scope::Base);
    }

    #[test]
    fn write_records_entry() {
        let mut txn = create_txn();
        txn.write("a", Value::Integer(1)).unwrap();

        assert_eq!(txn.overlay().len(), 1);
        assert_eq!(
            txn.overlay().get("a"),
            Some(&Entry::Present(Value::Integer(1)))
        );
    }

    #[test]
    fn remove_records_tombstone() {
        let mut txn = create_txn();
        txn.remove("a").unwrap();
        assert_eq!(txn.overlay().get("a"), Some(&Entry::Tombstone));
    }

    #[test]
    fn read_falls_through_to_base() {
        let txn = create_txn();
        let stack = TransactionStack::new();
        let mut base = Snapshot::new();
        base.insert("a".to_string(), Value::Integer(7));

        assert_eq!(txn.read("a", &stack, &base).unwrap(), &Value::Integer(7));
        assert!(matches!(
            txn.read("b", &stack, &base),
            Err(StoreError::KeyNotFound { .. })
        ));
    }

    #[test]
    fn tombstone_hides_base_value() {
        let mut txn = create_txn();
        let stack = TransactionStack::new();
        let mut base = Snapshot::new();
        base.insert("a".to_string(), Value::Integer(7));

        txn.remove("a").unwrap();
        assert!(matches!(
            txn.read("a", &stack, &base),
            Err(StoreError::KeyNotFound { .. })
        ));
    }

    #[test]
    fn dangling_parent_is_invalid_state() {
        let txn = Transaction::new(3, Scope::Transaction(2));
        let stack = TransactionStack::new();
        let base = Snapshot::new();

        assert!(matches!(
            txn.read("a", &stack, &base),
            Err(StoreError::InvalidTransactionState { .. })
        ));
    }

    #[test]
    fn cannot_write_after_commit() {
        let mut txn = create_txn();
        txn.mark_committed().unwrap();

        let result = txn.write("a", Value::Null);
        assert!(matches!(
            result,
            Err(StoreError::TransactionNotActive {
                state: TransactionState::Committed
            })
        ));
    }

    #[test]
    fn cannot_remove_after_rollback() {
        let mut txn = create_txn();
        txn.mark_rolled_back().unwrap();

        let result = txn.remove("a");
        assert!(matches!(
            result,
            Err(StoreError::TransactionNotActive {
                state: TransactionState::RolledBack
            })
        ));
    }

    #[test]
    fn cannot_commit_twice() {
        let mut txn = create_txn();
        txn.mark_committed().unwrap();

        assert!(matches!(
            txn.mark_committed(),
            Err(StoreError::InvalidTransactionState { .. })
        ));
        assert_eq!(txn.state(), TransactionState::Committed);
    }

    #[test]
    fn cannot_roll_back_after_commit() {
        let mut txn = create_txn();
        txn.mark_committed().unwrap();

        assert!(matches!(
            txn.mark_rolled_back(),
            Err(StoreError::InvalidTransactionState { .. })
        ));
    }

    #[test]
    fn absorb_requires_active() {
        let mut txn = create_txn();
        txn.mark_rolled_back().unwrap();

        let mut child = Overlay::new();
        child.put("a", Value::Null);
        assert!(txn.absorb(child).is_err());
        assert!(txn.overlay().is_empty());
    }
}
