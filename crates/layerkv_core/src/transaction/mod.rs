//! Nested transactions.
//!
//! Each open transaction owns an [`Overlay`] of pending writes and
//! tombstones. Transactions live on a [`TransactionStack`]; each one reads
//! through the transaction below it and, at the bottom, the committed base
//! mapping. Committing folds the top overlay into the one below (or into
//! the base), rolling back drops it.

mod overlay;
mod stack;
mod state;

pub use overlay::{Entry, Overlay};
pub use stack::TransactionStack;
pub use state::{Scope, Transaction, TransactionState};
