//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur during encoding or decoding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Failed to encode a snapshot to CBOR.
    #[error("encoding failed: {message}")]
    EncodingFailed {
        /// Description of the encoding error.
        message: String,
    },

    /// Failed to decode CBOR bytes.
    #[error("decoding failed: {message}")]
    DecodingFailed {
        /// Description of the decoding error.
        message: String,
    },

    /// Input ended before the frame was complete.
    #[error("unexpected end of input: need {needed} bytes, have {available}")]
    UnexpectedEof {
        /// Bytes required to continue.
        needed: usize,
        /// Bytes actually available.
        available: usize,
    },

    /// Frame does not start with the snapshot magic.
    #[error("invalid magic bytes: {found:02x?}")]
    InvalidMagic {
        /// The four bytes found at the start of the input.
        found: [u8; 4],
    },

    /// Frame was written by an unknown format version.
    #[error("unsupported snapshot version {version}")]
    UnsupportedVersion {
        /// Version found in the header.
        version: u16,
    },

    /// Stored checksum does not match the frame contents.
    #[error("checksum mismatch: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        /// Checksum stored in the frame.
        expected: u32,
        /// Checksum computed over the frame.
        actual: u32,
    },

    /// Bytes left over after the frame.
    #[error("{count} trailing bytes after snapshot frame")]
    TrailingBytes {
        /// Number of unexpected bytes.
        count: usize,
    },
}

impl CodecError {
    /// Create an encoding failed error.
    pub fn encoding_failed(message: impl Into<String>) -> Self {
        Self::EncodingFailed {
            message: message.into(),
        }
    }

    /// Create a decoding failed error.
    pub fn decoding_failed(message: impl Into<String>) -> Self {
        Self::DecodingFailed {
            message: message.into(),
        }
    }
}
