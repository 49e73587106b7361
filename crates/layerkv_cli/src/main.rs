//! layerkv CLI
//!
//! Command-line access to a file-backed layerkv store.
//!
//! # Commands
//!
//! - `get` / `set` / `delete` / `list` - Single-key access, persisted at once
//! - `batch` - Apply a JSON file of writes all-or-nothing
//! - `backup` / `restore` - Copy the snapshot file out and back in
//! - `shell` - Line-oriented session with nested transactions

mod commands;
mod error;

use clap::{Parser, Subcommand};
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// layerkv command-line tools.
#[derive(Parser)]
#[command(name = "layerkv")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the store file
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the value of a key as JSON
    Get {
        /// Key to read
        key: String,
    },

    /// Set a key to a JSON value
    Set {
        /// Key to write
        key: String,
        /// Value as JSON, e.g. '"text"', '42' or '{"a": 1}'
        value: String,
    },

    /// Delete a key
    Delete {
        /// Key to delete
        key: String,
    },

    /// List every key and value
    List {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Apply a JSON array of operations all-or-nothing
    Batch {
        /// File holding [{"op": "set", "key": ..., "value": ...}, {"op": "delete", "key": ...}]
        file: PathBuf,
    },

    /// Copy the store to a backup file
    Backup {
        /// Destination file
        output: PathBuf,
    },

    /// Replace the store with a backup file
    Restore {
        /// Backup file to restore
        input: PathBuf,
    },

    /// Start an interactive session
    Shell,

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let stdout = io::stdout();

    match cli.command {
        Commands::Get { key } => {
            let path = cli.path.ok_or("Store path required for get")?;
            let store = commands::open_store(&path)?;
            commands::kv::get(&store, &key, &mut stdout.lock())?;
        }
        Commands::Set { key, value } => {
            let path = cli.path.ok_or("Store path required for set")?;
            let mut store = commands::open_store(&path)?;
            commands::kv::set(&mut store, &key, &value)?;
        }
        Commands::Delete { key } => {
            let path = cli.path.ok_or("Store path required for delete")?;
            let mut store = commands::open_store(&path)?;
            commands::kv::delete(&mut store, &key)?;
        }
        Commands::List { format } => {
            let path = cli.path.ok_or("Store path required for list")?;
            let store = commands::open_store(&path)?;
            commands::kv::list(&store, &format, &mut stdout.lock())?;
        }
        Commands::Batch { file } => {
            let path = cli.path.ok_or("Store path required for batch")?;
            let mut store = commands::open_store(&path)?;
            commands::batch::run(&mut store, &file)?;
        }
        Commands::Backup { output } => {
            let path = cli.path.ok_or("Store path required for backup")?;
            commands::backup::create(&path, &output)?;
        }
        Commands::Restore { input } => {
            let path = cli.path.ok_or("Store path required for restore")?;
            commands::backup::restore(&path, &input)?;
        }
        Commands::Shell => {
            let path = cli.path.ok_or("Store path required for shell")?;
            let mut store = commands::open_store(&path)?;
            let stdin = io::stdin();
            let prompt = stdin.is_terminal().then_some("layerkv> ");
            commands::shell::run(&mut store, stdin.lock(), &mut stdout.lock(), prompt)?;

            let discarded = store.close();
            if discarded > 0 {
                tracing::warn!(discarded, "session ended with open transactions");
            }
        }
        Commands::Version => {
            println!("layerkv CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("layerkv core v{}", layerkv_core::VERSION);
        }
    }

    Ok(())
}
