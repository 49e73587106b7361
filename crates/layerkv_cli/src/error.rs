//! Error types for the CLI.

use layerkv_core::{StorageError, StoreError};
use std::io;
use thiserror::Error;

/// Result type for CLI commands.
pub type CliResult<T> = Result<T, CliError>;

/// Errors reported by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// A store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A storage operation outside the store failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Input was not valid JSON, or not the expected shape.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Reading input or writing output failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The command line or a shell line was malformed.
    #[error("{0}")]
    Usage(String),
}

impl CliError {
    /// Creates a usage error.
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage(message.into())
    }
}
