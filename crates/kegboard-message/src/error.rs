use kegboard_frame::FrameError;

use crate::field::FieldType;

/// Errors that can occur while building, encoding or decoding messages.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MessageError {
    /// No schema is registered for the message type id.
    #[error("unknown message type 0x{0:04x}")]
    UnknownMessage(u16),

    /// The message schema has no field with this name.
    #[error("message {message} has no field named {field:?}")]
    Schema { message: &'static str, field: String },

    /// A value of the wrong wire type was assigned to a field.
    #[error("field {message}.{field} holds {expected}, got {actual}")]
    FieldType {
        message: &'static str,
        field: &'static str,
        expected: FieldType,
        actual: FieldType,
    },

    /// A string or bytes value does not fit in one TLV entry.
    #[error("value for {message}.{field} is {len} bytes (max {max})")]
    ValueTooLong {
        message: &'static str,
        field: &'static str,
        len: usize,
        max: usize,
    },

    /// A fixed-width field arrived with the wrong width.
    #[error("field {message}.{field} must be {expected} bytes, got {actual}")]
    Format {
        message: &'static str,
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A TLV entry runs past the end of the payload.
    #[error("{message} payload truncated at offset {offset}")]
    Truncated { message: &'static str, offset: usize },

    /// A typed view was requested from a message of another type.
    #[error("expected {expected} message, got {actual}")]
    WrongKind {
        expected: &'static str,
        actual: &'static str,
    },

    /// Framing failed while encoding.
    #[error(transparent)]
    Frame(#[from] FrameError),
}

pub type Result<T> = std::result::Result<T, MessageError>;
