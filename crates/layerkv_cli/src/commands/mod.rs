//! CLI command implementations.

pub mod backup;
pub mod batch;
pub mod json;
pub mod kv;
pub mod shell;

use crate::error::CliResult;
use layerkv_core::{FileBackend, Store};
use std::path::Path;
use std::sync::Arc;

/// Opens a file-backed store at `path`, creating it if missing.
pub fn open_store(path: &Path) -> CliResult<Store> {
    let backend = FileBackend::open(path)?;
    Ok(Store::open(Arc::new(backend))?)
}
