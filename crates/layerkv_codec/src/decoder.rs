//! Snapshot frame decoder.

use crate::encoder::{compute_crc32, HEADER_SIZE, SNAPSHOT_MAGIC, SNAPSHOT_VERSION, TRAILER_SIZE};
use crate::error::{CodecError, CodecResult};
use crate::Snapshot;

/// Decodes a frame produced by [`crate::encode_snapshot`].
///
/// An empty input decodes to an empty snapshot, so a freshly created
/// file needs no special casing by callers.
///
/// # Errors
///
/// Returns an error if the frame is truncated, carries the wrong magic or
/// version, fails its checksum, or the payload is not a valid snapshot.
pub fn decode_snapshot(bytes: &[u8]) -> CodecResult<Snapshot> {
    if bytes.is_empty() {
        return Ok(Snapshot::new());
    }

    if bytes.len() < HEADER_SIZE + TRAILER_SIZE {
        return Err(CodecError::UnexpectedEof {
            needed: HEADER_SIZE + TRAILER_SIZE,
            available: bytes.len(),
        });
    }

    let mut magic = [0u8; 4];
    magic.copy_from_slice(&bytes[0..4]);
    if magic != SNAPSHOT_MAGIC {
        return Err(CodecError::InvalidMagic { found: magic });
    }

    let version = u16::from_le_bytes([bytes[4], bytes[5]]);
    if version != SNAPSHOT_VERSION {
        return Err(CodecError::UnsupportedVersion { version });
    }

    let mut len_bytes = [0u8; 8];
    len_bytes.copy_from_slice(&bytes[8..16]);
    let payload_len = usize::try_from(u64::from_le_bytes(len_bytes))
        .map_err(|_| CodecError::decoding_failed("payload length exceeds address space"))?;

    let frame_len = HEADER_SIZE
        .checked_add(payload_len)
        .and_then(|n| n.checked_add(TRAILER_SIZE))
        .ok_or_else(|| CodecError::decoding_failed("payload length overflow"))?;

    if bytes.len() < frame_len {
        return Err(CodecError::UnexpectedEof {
            needed: frame_len,
            available: bytes.len(),
        });
    }
    if bytes.len() > frame_len {
        return Err(CodecError::TrailingBytes {
            count: bytes.len() - frame_len,
        });
    }

    let body_end = HEADER_SIZE + payload_len;
    let mut crc_bytes = [0u8; 4];
    crc_bytes.copy_from_slice(&bytes[body_end..frame_len]);
    let expected = u32::from_le_bytes(crc_bytes);
    let actual = compute_crc32(&bytes[..body_end]);
    if expected != actual {
        return Err(CodecError::ChecksumMismatch { expected, actual });
    }

    ciborium::from_reader(&bytes[HEADER_SIZE..body_end])
        .map_err(|e| CodecError::decoding_failed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{encode_snapshot, Value};

    fn sample() -> Snapshot {
        let mut snapshot = Snapshot::new();
        snapshot.insert("user".to_string(), Value::from("Alice"));
        snapshot.insert("age".to_string(), Value::from(30));
        snapshot.insert(
            "prefs".to_string(),
            Value::map([("theme", "dark"), ("language", "en")]),
        );
        snapshot.insert("ratio".to_string(), Value::Float(0.25));
        snapshot.insert("blob".to_string(), Value::Bytes(vec![0, 1, 2, 255]));
        snapshot.insert("nothing".to_string(), Value::Null);
        snapshot
    }

    #[test]
    fn decodes_what_was_encoded() {
        let snapshot = sample();
        let frame = encode_snapshot(&snapshot).unwrap();
        assert_eq!(decode_snapshot(&frame).unwrap(), snapshot);
    }

    #[test]
    fn empty_input_is_empty_snapshot() {
        assert!(decode_snapshot(&[]).unwrap().is_empty());
    }

    #[test]
    fn truncated_frame_fails() {
        let frame = encode_snapshot(&sample()).unwrap();
        let result = decode_snapshot(&frame[..frame.len() - 1]);
        assert!(matches!(result, Err(CodecError::UnexpectedEof { .. })));

        let result = decode_snapshot(&frame[..3]);
        assert!(matches!(result, Err(CodecError::UnexpectedEof { .. })));
    }

    #[test]
    fn bad_magic_fails() {
        let mut frame = encode_snapshot(&sample()).unwrap();
        frame[0] = b'X';
        assert!(matches!(
            decode_snapshot(&frame),
            Err(CodecError::InvalidMagic { .. })
        ));
    }

    #[test]
    fn unknown_version_fails() {
        let mut frame = encode_snapshot(&sample()).unwrap();
        frame[4] = 9;
        assert!(matches!(
            decode_snapshot(&frame),
            Err(CodecError::UnsupportedVersion { version: 9 })
        ));
    }

    #[test]
    fn flipped_payload_bit_fails_checksum() {
        let mut frame = encode_snapshot(&sample()).unwrap();
        frame[HEADER_SIZE + 2] ^= 0x01;
        assert!(matches!(
            decode_snapshot(&frame),
            Err(CodecError::ChecksumMismatch { .. })
        ));
    }

    proptest::proptest! {
        #[test]
        fn any_single_byte_corruption_is_detected(
            index in 0usize..1024,
            mask in 1u8..=255,
        ) {
            let mut frame = encode_snapshot(&sample()).unwrap();
            let index = index % frame.len();
            frame[index] ^= mask;
            proptest::prop_assert!(decode_snapshot(&frame).is_err());
        }
    }

    #[test]
    fn trailing_bytes_fail() {
        let mut frame = encode_snapshot(&sample()).unwrap();
        frame.push(0);
        assert_eq!(
            decode_snapshot(&frame),
            Err(CodecError::TrailingBytes { count: 1 })
        );
    }
}
