use bytes::{BufMut, Bytes, BytesMut};
use crc::{Crc, CRC_16_KERMIT};
use tracing::{trace, warn};

use crate::error::{FrameError, Result};

/// Leading magic of every frame.
pub const PREFIX_MAGIC: [u8; 4] = *b"KBSP";

/// Protocol version marker following the magic.
pub const PROTOCOL_VERSION: [u8; 4] = *b" v1:";

/// Full 8-byte frame prefix: magic followed by version.
pub const PREFIX: [u8; 8] = *b"KBSP v1:";

/// Trailer magic closing every frame.
pub const TRAILER: [u8; 2] = *b"\r\n";

/// Byte that ends a discard run in the assembler.
pub const RESYNC_BYTE: u8 = b'\n';

/// Header: prefix (8) + message id (2) + payload length (2) = 12 bytes.
pub const HEADER_SIZE: usize = 12;

/// Footer: checksum (2) + trailer (2) = 4 bytes.
pub const FOOTER_SIZE: usize = 4;

/// Size of a frame with an empty payload.
pub const MIN_FRAME_SIZE: usize = HEADER_SIZE + FOOTER_SIZE;

/// Largest frame the protocol allows on the wire.
pub const MAX_FRAME_SIZE: usize = 255;

/// Largest payload that fits in a frame.
pub const MAX_PAYLOAD_SIZE: usize = MAX_FRAME_SIZE - MIN_FRAME_SIZE;

const KBSP_CRC: Crc<u16> = Crc::<u16>::new(&CRC_16_KERMIT);

/// What to do with a frame whose embedded checksum is wrong.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChecksumPolicy {
    /// Reject the frame.
    #[default]
    Enforce,
    /// Log a warning and accept the frame anyway.
    Permissive,
}

/// Configuration for frame assembly and validation.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Accumulated bytes beyond this length are discarded. Default: 255.
    pub max_frame_size: usize,
    /// Checksum handling. Default: enforce.
    pub checksum_policy: ChecksumPolicy,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_frame_size: MAX_FRAME_SIZE,
            checksum_policy: ChecksumPolicy::default(),
        }
    }
}

/// A structurally valid frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Message type id from the header.
    pub message_id: u16,
    /// Payload length as declared in the header. Informational only.
    pub declared_len: u16,
    /// Bytes between header and footer.
    pub payload: Bytes,
    /// Checksum carried in the footer.
    pub checksum: u16,
}

impl Frame {
    /// The total wire size of this frame.
    pub fn wire_size(&self) -> usize {
        MIN_FRAME_SIZE + self.payload.len()
    }

    /// True when the declared length agrees with the actual payload.
    pub fn length_consistent(&self) -> bool {
        usize::from(self.declared_len) == self.payload.len()
    }
}

/// CRC-16/KERMIT (reflected CCITT polynomial, zero init) as used by KBSP.
pub fn checksum(bytes: &[u8]) -> u16 {
    KBSP_CRC.checksum(bytes)
}

/// Encode a frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────────┬──────────┬──────────┬─────────┬──────────┬─────────┐
/// │ Prefix (8B)  │ Id       │ Length   │ Payload │ CRC-16   │ Trailer │
/// │ "KBSP v1:"   │ (2B LE)  │ (2B LE)  │         │ (2B LE)  │ "\r\n"  │
/// └──────────────┴──────────┴──────────┴─────────┴──────────┴─────────┘
/// ```
pub fn encode_frame(message_id: u16, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if payload.len() > MAX_PAYLOAD_SIZE {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_PAYLOAD_SIZE,
        });
    }

    let start = dst.len();
    dst.reserve(MIN_FRAME_SIZE + payload.len());
    dst.put_slice(&PREFIX);
    dst.put_u16_le(message_id);
    dst.put_u16_le(payload.len() as u16);
    dst.put_slice(payload);
    let crc = checksum(&dst[start..]);
    dst.put_u16_le(crc);
    dst.put_slice(&TRAILER);
    Ok(())
}

/// Check a candidate frame cut by the assembler and split it into fields.
///
/// The payload is whatever lies between the fixed-size header and footer;
/// the declared length is not consulted.
pub fn validate_frame(raw: Bytes, config: &FrameConfig) -> Result<Frame> {
    if raw.len() < MIN_FRAME_SIZE {
        return Err(FrameError::Truncated {
            len: raw.len(),
            min: MIN_FRAME_SIZE,
        });
    }
    if raw[..PREFIX.len()] != PREFIX {
        return Err(FrameError::InvalidPrefix);
    }
    let footer_at = raw.len() - FOOTER_SIZE;
    if raw[footer_at + 2..] != TRAILER {
        return Err(FrameError::InvalidTrailer);
    }

    let message_id = u16::from_le_bytes([raw[8], raw[9]]);
    let declared_len = u16::from_le_bytes([raw[10], raw[11]]);
    let embedded = u16::from_le_bytes([raw[footer_at], raw[footer_at + 1]]);
    let computed = checksum(&raw[..footer_at]);

    if embedded != computed {
        match config.checksum_policy {
            ChecksumPolicy::Enforce => {
                return Err(FrameError::ChecksumMismatch {
                    expected: embedded,
                    actual: computed,
                });
            }
            ChecksumPolicy::Permissive => {
                warn!(
                    message_id,
                    embedded, computed, "accepting frame with bad checksum"
                );
            }
        }
    }

    let frame = Frame {
        message_id,
        declared_len,
        payload: raw.slice(HEADER_SIZE..footer_at),
        checksum: embedded,
    };
    if !frame.length_consistent() {
        trace!(
            message_id,
            declared_len,
            actual = frame.payload.len(),
            "declared payload length differs"
        );
    }
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(message_id: u16, payload: &[u8]) -> Bytes {
        let mut buf = BytesMut::new();
        encode_frame(message_id, payload, &mut buf).unwrap();
        buf.freeze()
    }

    #[test]
    fn checksum_matches_kermit_check_value() {
        assert_eq!(checksum(b"123456789"), 0x2189);
    }

    #[test]
    fn prefix_is_magic_then_version() {
        assert_eq!(PREFIX[..4], PREFIX_MAGIC);
        assert_eq!(PREFIX[4..], PROTOCOL_VERSION);
    }

    #[test]
    fn encode_lays_out_header_and_footer() {
        let wire = encoded(0x84, &[0xAA, 0xBB]);

        assert_eq!(wire.len(), MIN_FRAME_SIZE + 2);
        assert_eq!(&wire[..8], b"KBSP v1:");
        assert_eq!(&wire[8..10], &[0x84, 0x00]);
        assert_eq!(&wire[10..12], &[0x02, 0x00]);
        assert_eq!(&wire[12..14], &[0xAA, 0xBB]);
        let crc = checksum(&wire[..14]).to_le_bytes();
        assert_eq!(&wire[14..16], &crc);
        assert_eq!(&wire[16..], b"\r\n");
    }

    #[test]
    fn validate_extracts_fields() {
        let wire = encoded(0x10, b"payload");
        let frame = validate_frame(wire, &FrameConfig::default()).unwrap();

        assert_eq!(frame.message_id, 0x10);
        assert_eq!(frame.declared_len, 7);
        assert_eq!(frame.payload.as_ref(), b"payload");
        assert!(frame.length_consistent());
        assert_eq!(frame.wire_size(), MIN_FRAME_SIZE + 7);
    }

    #[test]
    fn validate_empty_payload() {
        let frame = validate_frame(encoded(0x81, b""), &FrameConfig::default()).unwrap();
        assert_eq!(frame.message_id, 0x81);
        assert!(frame.payload.is_empty());
    }

    #[test]
    fn validate_rejects_short_input() {
        let err = validate_frame(Bytes::from_static(b"KBSP v1:\r\n"), &FrameConfig::default())
            .unwrap_err();
        assert!(matches!(err, FrameError::Truncated { len: 10, .. }));
    }

    #[test]
    fn validate_rejects_bad_prefix_and_trailer() {
        let mut wire = encoded(0x01, b"x").to_vec();
        wire[0] = b'X';
        assert_eq!(
            validate_frame(Bytes::from(wire), &FrameConfig::default()),
            Err(FrameError::InvalidPrefix)
        );

        let mut wire = encoded(0x01, b"x").to_vec();
        let last = wire.len() - 1;
        wire[last] = b'!';
        assert_eq!(
            validate_frame(Bytes::from(wire), &FrameConfig::default()),
            Err(FrameError::InvalidTrailer)
        );
    }

    #[test]
    fn enforce_policy_rejects_corrupted_payload() {
        let mut wire = encoded(0x01, b"abcd").to_vec();
        wire[HEADER_SIZE + 1] ^= 0xFF;

        let err = validate_frame(Bytes::from(wire), &FrameConfig::default()).unwrap_err();
        assert!(matches!(err, FrameError::ChecksumMismatch { .. }));
    }

    #[test]
    fn permissive_policy_accepts_corrupted_payload() {
        let mut wire = encoded(0x01, b"abcd").to_vec();
        wire[HEADER_SIZE + 1] ^= 0xFF;

        let config = FrameConfig {
            checksum_policy: ChecksumPolicy::Permissive,
            ..FrameConfig::default()
        };
        let frame = validate_frame(Bytes::from(wire), &config).unwrap();
        assert_eq!(frame.payload.as_ref(), &[b'a', b'b' ^ 0xFF, b'c', b'd']);
    }

    #[test]
    fn declared_length_is_informational() {
        let mut wire = encoded(0x12, b"abc").to_vec();
        wire[10] = 0x40;
        let crc = checksum(&wire[..HEADER_SIZE + 3]).to_le_bytes();
        wire[HEADER_SIZE + 3..HEADER_SIZE + 5].copy_from_slice(&crc);

        let frame = validate_frame(Bytes::from(wire), &FrameConfig::default()).unwrap();
        assert_eq!(frame.payload.as_ref(), b"abc");
        assert_eq!(frame.declared_len, 0x40);
        assert!(!frame.length_consistent());
    }

    #[test]
    fn encode_rejects_oversized_payload() {
        let mut buf = BytesMut::new();
        let err = encode_frame(0x01, &[0u8; MAX_PAYLOAD_SIZE + 1], &mut buf).unwrap_err();
        assert_eq!(
            err,
            FrameError::PayloadTooLarge {
                size: MAX_PAYLOAD_SIZE + 1,
                max: MAX_PAYLOAD_SIZE
            }
        );
        assert!(buf.is_empty());
    }

    #[test]
    fn encode_largest_payload_fills_max_frame() {
        let wire = encoded(0x01, &[0x41; MAX_PAYLOAD_SIZE]);
        assert_eq!(wire.len(), MAX_FRAME_SIZE);
    }

    #[test]
    fn encode_appends_to_existing_buffer() {
        let mut buf = BytesMut::from(&b"junk"[..]);
        encode_frame(0x81, b"", &mut buf).unwrap();
        let frame = validate_frame(buf.freeze().slice(4..), &FrameConfig::default()).unwrap();
        assert_eq!(frame.message_id, 0x81);
    }
}
