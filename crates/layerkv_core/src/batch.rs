//! All-or-nothing groups of writes.

use layerkv_codec::Value;

/// A single write inside a [`Batch`].
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOp {
    /// Set a key to a value.
    Set {
        /// Key to write.
        key: String,
        /// Value to store.
        value: Value,
    },
    /// Delete a key.
    Delete {
        /// Key to delete.
        key: String,
    },
}

impl BatchOp {
    /// Returns the key this operation touches.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            BatchOp::Set { key, .. } | BatchOp::Delete { key } => key,
        }
    }
}

/// An ordered list of writes applied as one unit by [`crate::Store::batch`].
///
/// ```rust
/// use layerkv_core::{Batch, Store, Value};
///
/// let mut store = Store::in_memory().unwrap();
/// let batch = Batch::new().set("a", 1).set("b", 2).delete("a");
/// store.batch(batch).unwrap();
///
/// assert!(store.get("a").is_err());
/// assert_eq!(store.get("b").unwrap(), Value::from(2));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    ops: Vec<BatchOp>,
}

impl Batch {
    /// Creates an empty batch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a set operation.
    #[must_use]
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(BatchOp::Set {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    /// Appends a delete operation.
    #[must_use]
    pub fn delete(mut self, key: impl Into<String>) -> Self {
        self.push(BatchOp::Delete { key: key.into() });
        self
    }

    /// Appends an operation.
    pub fn push(&mut self, op: BatchOp) {
        self.ops.push(op);
    }

    /// Returns the number of operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Checks if the batch has no operations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Iterates over the operations in order.
    pub fn iter(&self) -> impl Iterator<Item = &BatchOp> {
        self.ops.iter()
    }
}

impl FromIterator<BatchOp> for Batch {
    fn from_iter<I: IntoIterator<Item = BatchOp>>(iter: I) -> Self {
        Self {
            ops: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Batch {
    type Item = BatchOp;
    type IntoIter = std::vec::IntoIter<BatchOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.into_iter()
    }
}

/// Result of a successful batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Number of operations applied.
    pub applied: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_keeps_order() {
        let batch = Batch::new().set("a", 1).delete("b").set("c", "x");

        let keys: Vec<_> = batch.iter().map(BatchOp::key).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
        assert_eq!(batch.len(), 3);
        assert!(!batch.is_empty());
    }

    #[test]
    fn collect_from_ops() {
        let batch: Batch = vec![
            BatchOp::Delete { key: "k".into() },
            BatchOp::Set {
                key: "k".into(),
                value: Value::Null,
            },
        ]
        .into_iter()
        .collect();

        assert_eq!(batch, Batch::new().delete("k").set("k", ()));
    }
}
