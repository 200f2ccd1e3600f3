//! Session layer for talking to a kegboard.
//!
//! [`Device`] owns the transport, reassembles frames from the byte stream,
//! decodes them into [`kegboard_message::Message`]s and sends commands.
//! Frames that are corrupt, of an unknown type, or malformed are dropped
//! inside the read path; callers only ever see whole, decoded messages.

pub mod device;
pub mod discovery;
pub mod error;
pub mod handshake;

pub use device::{Device, DeviceConfig, RegistryHandle, DEFAULT_POLL_INTERVAL, DEFAULT_READ_CHUNK};
pub use discovery::{get_device, open_first, wait_for_device};
pub use error::{DeviceError, Result};
pub use handshake::HandshakeConfig;
