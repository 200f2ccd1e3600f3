use bytes::{BufMut, Bytes, BytesMut};
use tracing::{debug, trace};

use crate::codec::{FrameConfig, MAX_FRAME_SIZE, MIN_FRAME_SIZE, PREFIX, RESYNC_BYTE, TRAILER};

/// Cuts candidate frames out of a raw byte stream.
///
/// Bytes are accumulated until the buffer ends with the trailer. A buffer that
/// grows past the maximum frame size, or stops matching the protocol prefix,
/// is thrown away and the assembler skips input until the next `'\n'`.
/// Delivered frames are structurally bounded but not yet checksummed; pass
/// them to [`crate::validate_frame`].
///
/// Output does not depend on how the input is chunked.
#[derive(Debug, Clone)]
pub struct FrameAssembler {
    buf: BytesMut,
    state: AssemblerState,
    max_frame_size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AssemblerState {
    Accumulating,
    Discarding,
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameAssembler {
    /// Create an assembler with the protocol maximum frame size.
    pub fn new() -> Self {
        Self::with_max_frame_size(MAX_FRAME_SIZE)
    }

    /// Create an assembler using the limits in `config`.
    pub fn with_config(config: &FrameConfig) -> Self {
        Self::with_max_frame_size(config.max_frame_size)
    }

    fn with_max_frame_size(max_frame_size: usize) -> Self {
        let max_frame_size = max_frame_size.max(MIN_FRAME_SIZE);
        Self {
            buf: BytesMut::with_capacity(max_frame_size + 1),
            state: AssemblerState::Accumulating,
            max_frame_size,
        }
    }

    /// Feed one byte. Returns a complete candidate frame when this byte
    /// finished one.
    pub fn push(&mut self, byte: u8) -> Option<Bytes> {
        if self.state == AssemblerState::Discarding {
            if byte == RESYNC_BYTE {
                trace!("resynchronized");
                self.state = AssemblerState::Accumulating;
            }
            return None;
        }

        self.buf.put_u8(byte);
        let len = self.buf.len();

        if len > self.max_frame_size {
            self.discard("frame exceeds maximum size");
            return None;
        }

        let checked = len.min(PREFIX.len());
        if self.buf[..checked] != PREFIX[..checked] {
            self.discard("prefix mismatch");
            return None;
        }

        if len >= MIN_FRAME_SIZE && self.buf.ends_with(&TRAILER) {
            trace!(len, "frame complete");
            return Some(self.buf.split().freeze());
        }

        None
    }

    /// Feed a burst of bytes in order, returning every frame completed.
    pub fn extend(&mut self, bytes: &[u8]) -> Vec<Bytes> {
        bytes.iter().filter_map(|&byte| self.push(byte)).collect()
    }

    /// Drop any partial frame and leave the discarding state.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.state = AssemblerState::Accumulating;
    }

    /// Number of bytes in the partial frame.
    pub fn buffered_len(&self) -> usize {
        self.buf.len()
    }

    /// True while skipping input up to the next resync byte.
    pub fn is_discarding(&self) -> bool {
        self.state == AssemblerState::Discarding
    }

    fn discard(&mut self, reason: &'static str) {
        debug!(dropped = self.buf.len(), reason, "discarding partial frame");
        self.buf.clear();
        self.state = AssemblerState::Discarding;
    }
}
