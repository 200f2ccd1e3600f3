use std::path::PathBuf;

/// Errors that can occur in kegboard transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open the serial port at the requested speed.
    #[error("failed to open {path} at {speed} baud: {source}")]
    Open {
        path: PathBuf,
        speed: u32,
        source: serialport::Error,
    },

    /// Failed to open a capture file for replay.
    #[error("failed to open capture {path}: {source}")]
    OpenFile {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An I/O error occurred on the transport stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The serial driver reported an error.
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// Serial port enumeration failed.
    #[error("device discovery failed: {0}")]
    Discovery(serialport::Error),

    /// A write was attempted on a capture replay.
    #[error("capture replay {path} is read-only")]
    ReadOnly { path: PathBuf },
}

pub type Result<T> = std::result::Result<T, TransportError>;
