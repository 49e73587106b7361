//! Property-based test generators using proptest.
//!
//! Provides strategies for generating keys, values, and operation
//! sequences against a store.

use layerkv_codec::Value;
use layerkv_core::BatchOp;
use proptest::prelude::*;

/// Strategy for keys drawn from a small alphabet, so operations collide.
pub fn key_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-e]").expect("Invalid regex")
}

/// Strategy for valid keys of any allowed length.
pub fn wide_key_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z0-9_.:-]{1,64}").expect("Invalid regex")
}

/// Strategy for scalar values.
pub fn scalar_value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Integer),
        (-1.0e9f64..1.0e9).prop_map(Value::Float),
        "[a-z ]{0,12}".prop_map(Value::Text),
        prop::collection::vec(any::<u8>(), 0..8).prop_map(Value::Bytes),
    ]
}

/// Strategy for values, including nested arrays and maps.
pub fn value_strategy() -> impl Strategy<Value = Value> {
    scalar_value_strategy().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,4}", inner, 0..4).prop_map(Value::Map),
        ]
    })
}

/// An operation against a store.
#[derive(Debug, Clone)]
pub enum StoreOp {
    /// Set a key
    Set {
        /// Key
        key: String,
        /// Value
        value: Value,
    },
    /// Delete a key
    Delete {
        /// Key
        key: String,
    },
    /// Get a key
    Get {
        /// Key
        key: String,
    },
    /// Begin a transaction
    Begin,
    /// Commit the innermost transaction
    Commit,
    /// Roll back the innermost transaction
    Rollback,
    /// Apply a batch
    Batch(Vec<BatchOp>),
}

/// Strategy for a single batch operation.
pub fn batch_op_strategy() -> impl Strategy<Value = BatchOp> {
    prop_oneof![
        2 => (key_strategy(), scalar_value_strategy())
            .prop_map(|(key, value)| BatchOp::Set { key, value }),
        1 => key_strategy().prop_map(|key| BatchOp::Delete { key }),
    ]
}

/// Strategy for generating store operations.
pub fn store_op_strategy() -> impl Strategy<Value = StoreOp> {
    prop_oneof![
        4 => (key_strategy(), scalar_value_strategy())
            .prop_map(|(key, value)| StoreOp::Set { key, value }),
        2 => key_strategy().prop_map(|key| StoreOp::Delete { key }),
        3 => key_strategy().prop_map(|key| StoreOp::Get { key }),
        2 => Just(StoreOp::Begin),
        1 => Just(StoreOp::Commit),
        1 => Just(StoreOp::Rollback),
        1 => prop::collection::vec(batch_op_strategy(), 0..5).prop_map(StoreOp::Batch),
    ]
}

/// Strategy for generating a sequence of operations.
pub fn operation_sequence_strategy(
    min_ops: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<StoreOp>> {
    prop::collection::vec(store_op_strategy(), min_ops..max_ops)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 1024,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
