//! Typed messages for the Kegboard Serial Protocol.
//!
//! A KBSP payload is a run of tag-length-value entries. Each message type
//! has a [`MessageSchema`] naming its fields, their tags and wire types.
//! [`Registry`] maps message type ids to schemas and decodes validated
//! frames; [`Message`] builds commands and encodes them into frames.
//!
//! ```
//! use kegboard_message::{Message, MessageKind, Registry};
//!
//! let wire = Message::set_output(2, 1).to_frame_bytes()?;
//! let frame = kegboard_frame::validate_frame(wire, &Default::default())?;
//! let message = Registry::builtin().decode(&frame)?;
//! assert!(message.is(MessageKind::SetOutput));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod error;
pub mod field;
pub mod message;
pub mod registry;
pub mod schema;

pub use error::{MessageError, Result};
pub use field::{FieldSpec, FieldType, FieldValue, MAX_VALUE_LEN};
pub use message::{Hello, Message};
pub use registry::Registry;
pub use schema::{Direction, MessageKind, MessageSchema, BUILTIN_SCHEMAS};
