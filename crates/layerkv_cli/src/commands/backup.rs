//! Backup and restore commands.
//!
//! Both work on the snapshot file directly through [`FileBackend`], so the
//! copy is validated and written with the same atomic replace as a commit.

use crate::error::CliResult;
use layerkv_core::FileBackend;
use std::path::Path;
use tracing::info;

/// Copies the store at `db_path` to `output_path`.
pub fn create(db_path: &Path, output_path: &Path) -> CliResult<usize> {
    info!("Creating backup of {:?}", db_path);

    let backend = FileBackend::open(db_path)?;
    let keys = backend.backup_to(output_path)?;

    println!("✓ Backup created successfully");
    println!("  Path: {:?}", output_path);
    println!("  Keys: {keys}");

    Ok(keys)
}

/// Replaces the store at `db_path` with the snapshot in `input_path`.
///
/// The backup is decoded and verified before anything is overwritten.
pub fn restore(db_path: &Path, input_path: &Path) -> CliResult<usize> {
    info!("Restoring {:?} from {:?}", db_path, input_path);

    let backend = FileBackend::open(db_path)?;
    let keys = backend.restore_from(input_path)?;

    println!("✓ Store restored successfully");
    println!("  Path: {:?}", db_path);
    println!("  Keys restored: {keys}");

    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::open_store;
    use layerkv_core::Value;

    #[test]
    fn backup_then_restore() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("store.lkv");
        let copy = dir.path().join("backup.lkv");

        {
            let mut store = open_store(&db).unwrap();
            store.set("a", 1).unwrap();
            store.set("b", 2).unwrap();
        }
        assert_eq!(create(&db, &copy).unwrap(), 2);

        {
            let mut store = open_store(&db).unwrap();
            store.delete("a").unwrap();
            store.set("c", 3).unwrap();
        }
        assert_eq!(restore(&db, &copy).unwrap(), 2);

        let store = open_store(&db).unwrap();
        assert_eq!(store.keys(), vec!["a", "b"]);
        assert_eq!(store.get("a").unwrap(), Value::Integer(1));
    }

    #[test]
    fn restore_rejects_corrupt_backup() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("store.lkv");
        let bad = dir.path().join("bad.lkv");
        std::fs::write(&bad, b"definitely not a snapshot").unwrap();

        {
            let mut store = open_store(&db).unwrap();
            store.set("keep", true).unwrap();
        }

        assert!(restore(&db, &bad).is_err());
        assert_eq!(open_store(&db).unwrap().keys(), vec!["keep"]);
    }
}
