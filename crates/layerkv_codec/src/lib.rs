//! # layerkv codec
//!
//! Value model and snapshot encoding for layerkv.
//!
//! This crate provides:
//! - [`Value`], the tagged variant stored under each key
//! - [`Snapshot`], the whole committed key/value mapping
//! - A checksummed, versioned frame around the CBOR encoding of a snapshot
//!
//! ## Usage
//!
//! ```
//! use layerkv_codec::{decode_snapshot, encode_snapshot, Snapshot, Value};
//!
//! let mut snapshot = Snapshot::new();
//! snapshot.insert("answer".to_string(), Value::Integer(42));
//!
//! let bytes = encode_snapshot(&snapshot).unwrap();
//! let decoded = decode_snapshot(&bytes).unwrap();
//! assert_eq!(snapshot, decoded);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod decoder;
mod encoder;
mod error;
mod value;

use std::collections::BTreeMap;

pub use decoder::decode_snapshot;
pub use encoder::{compute_crc32, encode_snapshot, SNAPSHOT_MAGIC, SNAPSHOT_VERSION};
pub use error::{CodecError, CodecResult};
pub use value::Value;

/// The committed key/value mapping, ordered by key.
pub type Snapshot = BTreeMap<String, Value>;
