//! Byte transports for kegboard devices.
//!
//! This is the lowest layer of the kegboard stack. It provides:
//! - the [`Transport`] trait the device session reads from and writes to
//! - [`DeviceStream`], backed by a serial port or a capture file
//! - serial port discovery by path pattern
//!
//! Nothing here knows about frames; bytes go in and out unchanged.

pub mod discovery;
pub mod error;
pub mod fake;
pub mod traits;

pub use discovery::{find_devices, matches_pattern, DEFAULT_DEVICE_PATTERNS};
pub use error::{Result, TransportError};
pub use fake::FakeTransport;
pub use traits::{fallback_read_timeout, DeviceStream, Transport, DEFAULT_SPEED};
