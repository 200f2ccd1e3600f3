use std::fmt;

use bytes::{Bytes, BytesMut};
use kegboard_frame::encode_frame;
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::{MessageError, Result};
use crate::field::{FieldValue, MAX_VALUE_LEN};
use crate::schema::{MessageKind, MessageSchema};

/// One KBSP message: a schema plus the values set for its fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    schema: &'static MessageSchema,
    values: Vec<Option<FieldValue>>,
}

impl Message {
    /// Create a message with no fields set.
    pub fn new(schema: &'static MessageSchema) -> Self {
        Self {
            schema,
            values: vec![None; schema.fields.len()],
        }
    }

    /// Create an empty message of a built-in type.
    pub fn of(kind: MessageKind) -> Self {
        Self::new(kind.schema())
    }

    /// Ping command; the board answers with a hello report.
    pub fn ping() -> Self {
        Self::of(MessageKind::Ping)
    }

    /// Command switching output `output_id` to `output_mode`.
    pub fn set_output(output_id: u8, output_mode: u8) -> Self {
        let mut message = Self::of(MessageKind::SetOutput);
        message.values[0] = Some(FieldValue::U8(output_id));
        message.values[1] = Some(FieldValue::U8(output_mode));
        message
    }

    /// Command storing a new serial number on the board.
    pub fn set_serial_number(serial_number: &str) -> Result<Self> {
        let mut message = Self::of(MessageKind::SetSerialNumber);
        message.set("serial_number", serial_number)?;
        Ok(message)
    }

    pub fn schema(&self) -> &'static MessageSchema {
        self.schema
    }

    pub fn id(&self) -> u16 {
        self.schema.id
    }

    pub fn name(&self) -> &'static str {
        self.schema.name
    }

    /// The built-in kind, if this is a built-in message type.
    ///
    /// A custom schema registered under a built-in id has no kind.
    pub fn kind(&self) -> Option<MessageKind> {
        MessageKind::from_id(self.schema.id)
            .filter(|kind| std::ptr::eq(kind.schema(), self.schema))
    }

    pub fn is(&self, kind: MessageKind) -> bool {
        self.kind() == Some(kind)
    }

    /// Assign a field by name.
    ///
    /// Fails when the schema has no such field, when the value's wire type
    /// differs from the field's, or when the value cannot fit in one entry.
    pub fn set(&mut self, name: &str, value: impl Into<FieldValue>) -> Result<()> {
        let value = value.into();
        let schema = self.schema;
        let index = schema.position(name).ok_or_else(|| MessageError::Schema {
            message: schema.name,
            field: name.to_string(),
        })?;
        let spec = &schema.fields[index];

        if value.field_type() != spec.ty {
            return Err(MessageError::FieldType {
                message: schema.name,
                field: spec.name,
                expected: spec.ty,
                actual: value.field_type(),
            });
        }
        let len = match &value {
            FieldValue::Str(s) => s.len(),
            FieldValue::Bytes(b) => b.len(),
            _ => 0,
        };
        if len > MAX_VALUE_LEN {
            return Err(MessageError::ValueTooLong {
                message: schema.name,
                field: spec.name,
                len,
                max: MAX_VALUE_LEN,
            });
        }

        self.values[index] = Some(value);
        Ok(())
    }

    /// Builder form of [`Message::set`].
    pub fn with(mut self, name: &str, value: impl Into<FieldValue>) -> Result<Self> {
        self.set(name, value)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.schema
            .position(name)
            .and_then(|index| self.values[index].as_ref())
    }

    /// Clear a field. Returns the previous value.
    pub fn unset(&mut self, name: &str) -> Option<FieldValue> {
        let index = self.schema.position(name)?;
        self.values[index].take()
    }

    /// Set fields in schema order.
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &FieldValue)> + '_ {
        self.schema
            .fields
            .iter()
            .zip(&self.values)
            .filter_map(|(spec, value)| value.as_ref().map(|value| (spec.name, value)))
    }

    /// Set a decoded value at a schema position. Type and length were
    /// checked by the decoder.
    pub(crate) fn put(&mut self, index: usize, value: FieldValue) {
        self.values[index] = Some(value);
    }

    /// Encode set fields as TLV entries in schema order.
    pub fn encode_payload(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for (spec, value) in self.schema.fields.iter().zip(&self.values) {
            if let Some(value) = value {
                let raw = value.encode();
                out.push(spec.tag);
                out.push(raw.len() as u8);
                out.extend_from_slice(&raw);
            }
        }
        out
    }

    /// Append this message, framed, to `dst`.
    pub fn encode_into(&self, dst: &mut BytesMut) -> Result<()> {
        encode_frame(self.schema.id, &self.encode_payload(), dst)?;
        Ok(())
    }

    /// The complete wire frame for this message.
    pub fn to_frame_bytes(&self) -> Result<Bytes> {
        let mut buf = BytesMut::new();
        self.encode_into(&mut buf)?;
        Ok(buf.freeze())
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}:", self.name())?;
        for (name, value) in self.fields() {
            write!(f, " {name}={value}")?;
        }
        f.write_str(">")
    }
}

impl Serialize for Message {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("type", self.name())?;
        map.serialize_entry("id", &self.id())?;
        for (name, value) in self.fields() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Typed view of a hello report.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Hello {
    pub firmware_version: Option<u16>,
    pub serial_number: Option<String>,
}

impl TryFrom<&Message> for Hello {
    type Error = MessageError;

    fn try_from(message: &Message) -> Result<Self> {
        if !message.is(MessageKind::Hello) {
            return Err(MessageError::WrongKind {
                expected: MessageKind::Hello.schema().name,
                actual: message.name(),
            });
        }
        let firmware_version = match message.get("firmware_version") {
            Some(FieldValue::U16(v)) => Some(*v),
            _ => None,
        };
        let serial_number = message
            .get("serial_number")
            .and_then(FieldValue::as_str)
            .map(str::to_string);
        Ok(Self {
            firmware_version,
            serial_number,
        })
    }
}

impl Hello {
    /// Build the report a board would send. Used by simulators and tests.
    pub fn to_message(&self) -> Result<Message> {
        let mut message = Message::of(MessageKind::Hello);
        if let Some(version) = self.firmware_version {
            message.set("firmware_version", version)?;
        }
        if let Some(serial) = &self.serial_number {
            message.set("serial_number", serial.as_str())?;
        }
        Ok(message)
    }
}
