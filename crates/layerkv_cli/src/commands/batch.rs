//! Batch command: apply a JSON file of writes all-or-nothing.

use super::json;
use crate::error::CliResult;
use layerkv_core::{Batch, BatchOp, BatchOutcome, Store};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

/// One operation as written in a batch file.
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase", deny_unknown_fields)]
pub enum OpRecord {
    /// `{"op": "set", "key": "k", "value": <json>}`
    Set {
        /// Key to write.
        key: String,
        /// Value as JSON.
        value: serde_json::Value,
    },
    /// `{"op": "delete", "key": "k"}`
    Delete {
        /// Key to delete.
        key: String,
    },
}

impl From<OpRecord> for BatchOp {
    fn from(record: OpRecord) -> Self {
        match record {
            OpRecord::Set { key, value } => BatchOp::Set {
                key,
                value: json::from_json(value),
            },
            OpRecord::Delete { key } => BatchOp::Delete { key },
        }
    }
}

/// Parses a JSON array of operations into a batch.
pub fn parse_batch(text: &str) -> CliResult<Batch> {
    let records: Vec<OpRecord> = serde_json::from_str(text)?;
    Ok(records.into_iter().map(BatchOp::from).collect())
}

/// Runs the batch command.
pub fn run(store: &mut Store, file: &Path) -> CliResult<BatchOutcome> {
    let text = std::fs::read_to_string(file)?;
    let batch = parse_batch(&text)?;
    let outcome = store.batch(batch)?;

    info!(file = %file.display(), applied = outcome.applied, "batch applied");
    println!("Applied {} operations", outcome.applied);
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CliError;
    use layerkv_core::{StoreError, Value};

    #[test]
    fn parses_mixed_operations() {
        let batch = parse_batch(
            r#"[
                {"op": "set", "key": "a", "value": {"n": 1}},
                {"op": "delete", "key": "b"}
            ]"#,
        )
        .unwrap();

        let ops: Vec<_> = batch.into_iter().collect();
        assert_eq!(ops.len(), 2);
        assert!(matches!(&ops[0], BatchOp::Set { key, value }
            if key == "a" && value.get("n") == Some(&Value::Integer(1))));
        assert!(matches!(&ops[1], BatchOp::Delete { key } if key == "b"));
    }

    #[test]
    fn rejects_unknown_operations() {
        assert!(parse_batch(r#"[{"op": "rename", "key": "a"}]"#).is_err());
        assert!(parse_batch(r#"[{"op": "delete", "key": "a", "extra": 1}]"#).is_err());
        assert!(parse_batch(r#"{"op": "delete", "key": "a"}"#).is_err());
    }

    #[test]
    fn failing_batch_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("ops.json");
        std::fs::write(
            &file,
            r#"[{"op": "set", "key": "a", "value": 1}, {"op": "delete", "key": "ghost"}]"#,
        )
        .unwrap();

        let mut store = Store::in_memory().unwrap();
        let result = run(&mut store, &file);

        assert!(matches!(
            result,
            Err(CliError::Store(StoreError::KeyNotFound { .. }))
        ));
        assert!(store.keys().is_empty());
    }
}
