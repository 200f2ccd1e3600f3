/// Errors that can occur in device session operations.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] kegboard_transport::TransportError),

    /// `open` or `attach` was called on an open session.
    #[error("device already open")]
    AlreadyOpen,

    /// The session has no transport; call `open` first.
    #[error("device not open; call open() first")]
    NotOpen,

    /// Message building or encoding error.
    #[error("message error: {0}")]
    Message(#[from] kegboard_message::MessageError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] kegboard_frame::FrameError),
}

pub type Result<T> = std::result::Result<T, DeviceError>;
