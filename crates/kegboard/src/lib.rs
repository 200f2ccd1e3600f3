//! Talk to a kegboard controller over the Kegboard Serial Protocol (KBSP v1).
//!
//! # Crate Structure
//!
//! - [`transport`]: byte pipes to the board (serial port, capture replay,
//!   in-memory fake) and device path discovery
//! - [`frame`]: wire layout, CRC-16 checksum and stream reassembly
//! - [`message`]: message schemas, TLV payload codec and registry
//! - [`device`]: the device session, commands and the ping/hello handshake
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use kegboard::device::{Device, DEFAULT_POLL_INTERVAL};
//!
//! let mut device = Device::new();
//! device.open("/dev/ttyUSB0", kegboard::transport::DEFAULT_SPEED)?;
//! if let Some(hello) = device.handshake(5)? {
//!     println!("{hello}");
//! }
//! while let Some(message) = device.read(Some(Duration::from_secs(5)), DEFAULT_POLL_INTERVAL)? {
//!     println!("{message}");
//! }
//! # Ok::<(), kegboard::device::DeviceError>(())
//! ```

/// Re-export transport types.
pub mod transport {
    pub use kegboard_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use kegboard_frame::*;
}

/// Re-export message types.
pub mod message {
    pub use kegboard_message::*;
}

/// Re-export device session types.
pub mod device {
    pub use kegboard_device::*;
}
