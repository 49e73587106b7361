//! Reference model for model-based testing.
//!
//! [`Model`] keeps one plain map per open transaction and resolves reads by
//! scanning them from the innermost out. It is slow and obviously correct;
//! property tests run the same operations against a [`Store`] and the model
//! and compare every outcome.

use crate::generators::StoreOp;
use layerkv_codec::{Snapshot, Value};
use layerkv_core::{Batch, BatchOp, Store, StoreError, StoreResult};
use std::collections::BTreeMap;

/// The observable result of one operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Succeeded without a value.
    Ok,
    /// A read returned a value.
    Value(Value),
    /// A batch applied this many operations.
    Applied(usize),
    /// Failed with this kind of error.
    Err(ErrorKind),
}

/// Error kinds compared between the store and the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Key did not resolve.
    KeyNotFound,
    /// No transaction was open.
    NoActiveTransaction,
    /// Anything else.
    Other,
}

impl ErrorKind {
    fn of(error: &StoreError) -> Self {
        match error {
            StoreError::KeyNotFound { .. } => Self::KeyNotFound,
            StoreError::NoActiveTransaction => Self::NoActiveTransaction,
            _ => Self::Other,
        }
    }
}

fn outcome<T>(result: StoreResult<T>, ok: impl FnOnce(T) -> Outcome) -> Outcome {
    match result {
        Ok(value) => ok(value),
        Err(e) => Outcome::Err(ErrorKind::of(&e)),
    }
}

/// Applies an operation to a store and records its outcome.
pub fn apply_to_store(store: &mut Store, op: &StoreOp) -> Outcome {
    match op {
        StoreOp::Set { key, value } => outcome(store.set(key.clone(), value.clone()), |()| Outcome::Ok),
        StoreOp::Delete { key } => outcome(store.delete(key), |()| Outcome::Ok),
        StoreOp::Get { key } => outcome(store.get(key), Outcome::Value),
        StoreOp::Begin => {
            store.begin();
            Outcome::Ok
        }
        StoreOp::Commit => outcome(store.commit(), |()| Outcome::Ok),
        StoreOp::Rollback => outcome(store.rollback(), |()| Outcome::Ok),
        StoreOp::Batch(ops) => {
            let batch: Batch = ops.iter().cloned().collect();
            outcome(store.batch(batch), |o| Outcome::Applied(o.applied))
        }
    }
}

/// Layered reference implementation of the store's semantics.
#[derive(Debug, Clone, Default)]
pub struct Model {
    base: Snapshot,
    /// One map per open transaction; `None` marks a deletion.
    layers: Vec<BTreeMap<String, Option<Value>>>,
}

impl Model {
    /// Creates an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of open transactions.
    pub fn depth(&self) -> usize {
        self.layers.len()
    }

    /// Returns the committed mapping.
    pub fn committed(&self) -> &Snapshot {
        &self.base
    }

    /// Resolves a key the slow way.
    pub fn get(&self, key: &str) -> Option<&Value> {
        for layer in self.layers.iter().rev() {
            if let Some(entry) = layer.get(key) {
                return entry.as_ref();
            }
        }
        self.base.get(key)
    }

    /// Returns every visible key and value.
    pub fn visible(&self) -> Snapshot {
        let mut view = self.base.clone();
        for layer in &self.layers {
            for (key, entry) in layer {
                match entry {
                    Some(value) => view.insert(key.clone(), value.clone()),
                    None => view.remove(key),
                };
            }
        }
        view
    }

    /// Applies an operation and records its outcome.
    pub fn apply(&mut self, op: &StoreOp) -> Outcome {
        match op {
            StoreOp::Set { key, value } => {
                self.write(key, Some(value.clone()));
                Outcome::Ok
            }
            StoreOp::Delete { key } => self.delete(key),
            StoreOp::Get { key } => match self.get(key) {
                Some(value) => Outcome::Value(value.clone()),
                None => Outcome::Err(ErrorKind::KeyNotFound),
            },
            StoreOp::Begin => {
                self.layers.push(BTreeMap::new());
                Outcome::Ok
            }
            StoreOp::Commit => self.commit(),
            StoreOp::Rollback => match self.layers.pop() {
                Some(_) => Outcome::Ok,
                None => Outcome::Err(ErrorKind::NoActiveTransaction),
            },
            StoreOp::Batch(ops) => self.batch(ops),
        }
    }

    fn write(&mut self, key: &str, entry: Option<Value>) {
        match (self.layers.last_mut(), entry) {
            (Some(layer), entry) => {
                layer.insert(key.to_string(), entry);
            }
            (None, Some(value)) => {
                self.base.insert(key.to_string(), value);
            }
            (None, None) => {
                self.base.remove(key);
            }
        }
    }

    fn delete(&mut self, key: &str) -> Outcome {
        if self.get(key).is_none() {
            return Outcome::Err(ErrorKind::KeyNotFound);
        }
        self.write(key, None);
        Outcome::Ok
    }

    fn commit(&mut self) -> Outcome {
        let Some(top) = self.layers.pop() else {
            return Outcome::Err(ErrorKind::NoActiveTransaction);
        };
        for (key, entry) in top {
            self.write(&key, entry);
        }
        Outcome::Ok
    }

    fn batch(&mut self, ops: &[BatchOp]) -> Outcome {
        if ops.is_empty() {
            return Outcome::Applied(0);
        }
        let saved = self.clone();
        self.layers.push(BTreeMap::new());
        for op in ops {
            let result = match op {
                BatchOp::Set { key, value } => {
                    self.write(key, Some(value.clone()));
                    Outcome::Ok
                }
                BatchOp::Delete { key } => self.delete(key),
            };
            if result != Outcome::Ok {
                *self = saved;
                return result;
            }
        }
        self.commit();
        Outcome::Applied(ops.len())
    }
}

/// Runs `ops` against a fresh in-memory store and a model in lockstep.
///
/// Returns a description of the first divergence.
pub fn check_against_model(ops: &[StoreOp]) -> Result<(), String> {
    let mut store = Store::in_memory().map_err(|e| e.to_string())?;
    let mut model = Model::new();

    for (step, op) in ops.iter().enumerate() {
        let actual = apply_to_store(&mut store, op);
        let expected = model.apply(op);
        if actual != expected {
            return Err(format!(
                "step {step} {op:?}: store gave {actual:?}, model gave {expected:?}"
            ));
        }
        if store.depth() != model.depth() {
            return Err(format!(
                "step {step} {op:?}: depth {} vs {}",
                store.depth(),
                model.depth()
            ));
        }
        if store.committed() != model.committed() {
            return Err(format!("step {step} {op:?}: committed state diverged"));
        }
        let visible: Snapshot = store
            .keys()
            .into_iter()
            .filter_map(|k| store.get(&k).ok().map(|v| (k, v)))
            .collect();
        if visible != model.visible() {
            return Err(format!("step {step} {op:?}: visible state diverged"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crash::FailingBackend;
    use crate::generators::{operation_sequence_strategy, PropTestConfig};
    use layerkv_core::StorageBackend;
    use proptest::prelude::*;
    use std::sync::Arc;

    #[test]
    fn model_follows_worked_example() {
        let ops = vec![
            StoreOp::Begin,
            StoreOp::Set {
                key: "a".into(),
                value: Value::Integer(50),
            },
            StoreOp::Begin,
            StoreOp::Set {
                key: "a".into(),
                value: Value::Integer(60),
            },
            StoreOp::Rollback,
            StoreOp::Commit,
        ];

        let mut model = Model::new();
        for op in &ops {
            model.apply(op);
        }
        assert_eq!(model.committed().get("a"), Some(&Value::Integer(50)));
        assert_eq!(check_against_model(&ops), Ok(()));
    }

    #[test]
    fn failed_batch_restores_model() {
        let mut model = Model::new();
        let outcome = model.apply(&StoreOp::Batch(vec![
            BatchOp::Set {
                key: "a".into(),
                value: Value::Null,
            },
            BatchOp::Delete { key: "b".into() },
        ]));

        assert_eq!(outcome, Outcome::Err(ErrorKind::KeyNotFound));
        assert!(model.visible().is_empty());
        assert_eq!(model.depth(), 0);
    }

    proptest! {
        #![proptest_config(PropTestConfig::default().to_proptest_config())]

        #[test]
        fn store_matches_model(ops in operation_sequence_strategy(1, 60)) {
            if let Err(divergence) = check_against_model(&ops) {
                prop_assert!(false, "{}", divergence);
            }
        }

        #[test]
        fn backend_holds_committed_state(ops in operation_sequence_strategy(1, 40)) {
            let backend = Arc::new(FailingBackend::new());
            let mut store = Store::open(backend.clone()).unwrap();

            for op in &ops {
                apply_to_store(&mut store, op);
                prop_assert_eq!(&backend.persisted().unwrap(), store.committed());
            }

            let reopened = Store::open(backend.clone() as Arc<dyn StorageBackend>).unwrap();
            prop_assert_eq!(reopened.committed(), store.committed());
            prop_assert_eq!(reopened.depth(), 0);
        }

        #[test]
        fn failed_persists_never_change_committed_state(
            ops in operation_sequence_strategy(1, 40),
        ) {
            let backend = Arc::new(FailingBackend::new());
            let mut store = Store::open(backend.clone()).unwrap();

            for op in &ops {
                let before = store.committed().clone();
                let depth = store.depth();
                backend.fail_next_persist();

                if let Outcome::Err(_) = apply_to_store(&mut store, op) {
                    prop_assert_eq!(store.committed(), &before);
                    prop_assert_eq!(store.depth(), depth);
                }
                backend.heal();
                prop_assert_eq!(&backend.persisted().unwrap(), store.committed());
            }
        }
    }
}
