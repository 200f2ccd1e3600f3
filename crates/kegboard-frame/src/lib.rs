//! Kegboard Serial Protocol (KBSP v1) framing.
//!
//! Every message travels in a frame:
//! - a 12-byte header: the 8-byte prefix `"KBSP v1:"`, a 2-byte
//!   little-endian message id and a 2-byte little-endian payload length
//! - the payload
//! - a 4-byte footer: a CRC-16 over header and payload, then `"\r\n"`
//!
//! [`FrameAssembler`] cuts frames out of a raw byte stream and recovers from
//! corruption; [`validate_frame`] checks a cut frame and extracts its fields.

pub mod assembler;
pub mod codec;
pub mod error;

pub use assembler::FrameAssembler;
pub use codec::{
    checksum, encode_frame, validate_frame, ChecksumPolicy, Frame, FrameConfig, FOOTER_SIZE,
    HEADER_SIZE, MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE, MIN_FRAME_SIZE, PREFIX, PREFIX_MAGIC,
    PROTOCOL_VERSION, RESYNC_BYTE, TRAILER,
};
pub use error::{FrameError, Result};
