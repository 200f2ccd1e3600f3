/// Errors that can occur during frame encoding and validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// The candidate is shorter than an empty frame.
    #[error("frame too short ({len} bytes, min {min})")]
    Truncated { len: usize, min: usize },

    /// The candidate does not start with the protocol prefix.
    #[error("invalid frame prefix (expected \"KBSP v1:\")")]
    InvalidPrefix,

    /// The candidate does not end with the trailer magic.
    #[error("invalid frame trailer (expected \"\\r\\n\")")]
    InvalidTrailer,

    /// The embedded checksum does not match the computed one.
    #[error("checksum mismatch (frame 0x{expected:04x}, computed 0x{actual:04x})")]
    ChecksumMismatch { expected: u16, actual: u16 },

    /// The payload does not fit in a frame.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, FrameError>;
