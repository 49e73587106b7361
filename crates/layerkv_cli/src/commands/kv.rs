//! Single-key commands: get, set, delete, list.

use super::json;
use crate::error::{CliError, CliResult};
use layerkv_core::Store;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;

/// Output of the list command in JSON form.
#[derive(Debug, Serialize)]
pub struct Listing {
    /// Number of keys.
    pub count: usize,
    /// Every key with its value.
    pub entries: BTreeMap<String, serde_json::Value>,
}

/// Prints the value of a key as JSON.
pub fn get(store: &Store, key: &str, out: &mut impl Write) -> CliResult<()> {
    let value = store.get(key)?;
    writeln!(out, "{}", json::render(&value))?;
    Ok(())
}

/// Sets a key from JSON text, persisting immediately.
pub fn set(store: &mut Store, key: &str, value: &str) -> CliResult<()> {
    let value = json::parse_value(value)?;
    store.set(key, value)?;
    Ok(())
}

/// Deletes a key, persisting immediately.
pub fn delete(store: &mut Store, key: &str) -> CliResult<()> {
    store.delete(key)?;
    Ok(())
}

/// Prints every visible key and value.
pub fn list(store: &Store, format: &str, out: &mut impl Write) -> CliResult<()> {
    let mut entries = BTreeMap::new();
    for key in store.keys() {
        let value = store.get(&key)?;
        entries.insert(key, json::to_json(&value));
    }

    match format {
        "json" => {
            let listing = Listing {
                count: entries.len(),
                entries,
            };
            writeln!(out, "{}", serde_json::to_string_pretty(&listing)?)?;
        }
        "text" => {
            for (key, value) in &entries {
                writeln!(out, "{key} = {value}")?;
            }
            writeln!(out, "({} keys)", entries.len())?;
        }
        other => {
            return Err(CliError::usage(format!(
                "unknown format {other:?}, expected text or json"
            )));
        }
    }
    Ok(())
}
