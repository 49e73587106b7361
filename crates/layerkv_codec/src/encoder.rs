//! Snapshot frame encoder.
//!
//! A persisted snapshot is a single frame:
//!
//! ```text
//! | magic (4) | version (2) | reserved (2) | payload_len (8) | payload | crc32 (4) |
//! ```
//!
//! All integers are little-endian. The payload is the CBOR encoding of the
//! snapshot map. The CRC covers the header and the payload.

use crate::error::{CodecError, CodecResult};
use crate::Snapshot;

/// Magic bytes identifying a snapshot frame.
pub const SNAPSHOT_MAGIC: [u8; 4] = *b"LKVS";

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u16 = 1;

/// Size of the fixed frame header in bytes.
pub const HEADER_SIZE: usize = 16;

/// Size of the trailing checksum in bytes.
pub const TRAILER_SIZE: usize = 4;

/// Encodes a snapshot into a checksummed frame.
///
/// # Errors
///
/// Returns an error if the CBOR serializer rejects the snapshot.
pub fn encode_snapshot(snapshot: &Snapshot) -> CodecResult<Vec<u8>> {
    let mut payload = Vec::new();
    ciborium::into_writer(snapshot, &mut payload)
        .map_err(|e| CodecError::encoding_failed(e.to_string()))?;

    let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len() + TRAILER_SIZE);
    frame.extend_from_slice(&SNAPSHOT_MAGIC);
    frame.extend_from_slice(&SNAPSHOT_VERSION.to_le_bytes());
    frame.extend_from_slice(&0u16.to_le_bytes());
    frame.extend_from_slice(&(payload.len() as u64).to_le_bytes());
    frame.extend_from_slice(&payload);

    let crc = compute_crc32(&frame);
    frame.extend_from_slice(&crc.to_le_bytes());

    Ok(frame)
}

/// Computes CRC32 (IEEE polynomial) of the given data.
pub fn compute_crc32(data: &[u8]) -> u32 {
    const CRC32_TABLE: [u32; 256] = {
        let mut table = [0u32; 256];
        let mut i = 0;
        while i < 256 {
            let mut crc = i as u32;
            let mut j = 0;
            while j < 8 {
                if crc & 1 != 0 {
                    crc = (crc >> 1) ^ 0xEDB8_8320;
                } else {
                    crc >>= 1;
                }
                j += 1;
            }
            table[i] = crc;
            i += 1;
        }
        table
    };

    let mut crc = 0xFFFF_FFFF_u32;
    for &byte in data {
        let index = ((crc ^ u32::from(byte)) & 0xFF) as usize;
        crc = (crc >> 8) ^ CRC32_TABLE[index];
    }
    !crc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Value;

    #[test]
    fn crc32_known_value() {
        assert_eq!(compute_crc32(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn crc32_empty() {
        assert_eq!(compute_crc32(b""), 0);
    }

    #[test]
    fn frame_layout() {
        let mut snapshot = Snapshot::new();
        snapshot.insert("a".to_string(), Value::Integer(1));

        let frame = encode_snapshot(&snapshot).unwrap();
        assert_eq!(&frame[0..4], &SNAPSHOT_MAGIC);
        assert_eq!(u16::from_le_bytes([frame[4], frame[5]]), SNAPSHOT_VERSION);

        let mut len_bytes = [0u8; 8];
        len_bytes.copy_from_slice(&frame[8..16]);
        let payload_len = u64::from_le_bytes(len_bytes) as usize;
        assert_eq!(frame.len(), HEADER_SIZE + payload_len + TRAILER_SIZE);
    }

    #[test]
    fn encoding_is_deterministic() {
        let mut first = Snapshot::new();
        first.insert("b".to_string(), Value::from("two"));
        first.insert("a".to_string(), Value::from(1));

        let mut second = Snapshot::new();
        second.insert("a".to_string(), Value::from(1));
        second.insert("b".to_string(), Value::from("two"));

        assert_eq!(
            encode_snapshot(&first).unwrap(),
            encode_snapshot(&second).unwrap()
        );
    }
}
