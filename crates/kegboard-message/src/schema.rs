use serde::Serialize;

use crate::field::{FieldSpec, FieldType};

/// Which side of the link sends a message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Sent by the board.
    Report,
    /// Sent by the host.
    Command,
}

/// Layout of one message type.
#[derive(Debug, PartialEq, Eq)]
pub struct MessageSchema {
    pub id: u16,
    pub name: &'static str,
    pub direction: Direction,
    /// Fields in encode order.
    pub fields: &'static [FieldSpec],
}

impl MessageSchema {
    /// Position of the field named `name` in [`MessageSchema::fields`].
    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| field.name == name)
    }

    /// Position of the field carrying TLV tag `tag`.
    pub fn position_of_tag(&self, tag: u8) -> Option<usize> {
        self.fields.iter().position(|field| field.tag == tag)
    }

    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        let fields = self.fields;
        self.position(name).map(|i| &fields[i])
    }
}

pub static HELLO: MessageSchema = MessageSchema {
    id: 0x01,
    name: "hello",
    direction: Direction::Report,
    fields: &[
        FieldSpec::new(0x01, "firmware_version", FieldType::U16),
        FieldSpec::new(0x02, "serial_number", FieldType::Str),
    ],
};

pub static METER_STATUS: MessageSchema = MessageSchema {
    id: 0x10,
    name: "meter_status",
    direction: Direction::Report,
    fields: &[
        FieldSpec::new(0x01, "meter_name", FieldType::Str),
        FieldSpec::new(0x02, "meter_reading", FieldType::U32),
    ],
};

pub static TEMPERATURE_READING: MessageSchema = MessageSchema {
    id: 0x11,
    name: "temperature_reading",
    direction: Direction::Report,
    fields: &[
        FieldSpec::new(0x01, "sensor_name", FieldType::Str),
        FieldSpec::new(0x02, "sensor_reading", FieldType::I32),
    ],
};

pub static OUTPUT_STATUS: MessageSchema = MessageSchema {
    id: 0x12,
    name: "output_status",
    direction: Direction::Report,
    fields: &[
        FieldSpec::new(0x01, "output_name", FieldType::Str),
        FieldSpec::new(0x02, "output_reading", FieldType::U16),
    ],
};

pub static AUTH_TOKEN: MessageSchema = MessageSchema {
    id: 0x14,
    name: "auth_token",
    direction: Direction::Report,
    fields: &[
        FieldSpec::new(0x01, "device", FieldType::Str),
        FieldSpec::new(0x02, "token", FieldType::Bytes),
        FieldSpec::new(0x03, "status", FieldType::U8),
    ],
};

pub static PING: MessageSchema = MessageSchema {
    id: 0x81,
    name: "ping",
    direction: Direction::Command,
    fields: &[],
};

pub static SET_OUTPUT: MessageSchema = MessageSchema {
    id: 0x84,
    name: "set_output",
    direction: Direction::Command,
    fields: &[
        FieldSpec::new(0x01, "output_id", FieldType::U8),
        FieldSpec::new(0x02, "output_mode", FieldType::U8),
    ],
};

pub static SET_SERIAL_NUMBER: MessageSchema = MessageSchema {
    id: 0x85,
    name: "set_serial_number",
    direction: Direction::Command,
    fields: &[FieldSpec::new(0x01, "serial_number", FieldType::Str)],
};

/// Every message type defined by KBSP v1.
pub static BUILTIN_SCHEMAS: [&MessageSchema; 8] = [
    &HELLO,
    &METER_STATUS,
    &TEMPERATURE_READING,
    &OUTPUT_STATUS,
    &AUTH_TOKEN,
    &PING,
    &SET_OUTPUT,
    &SET_SERIAL_NUMBER,
];

/// The built-in message types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Hello,
    MeterStatus,
    TemperatureReading,
    OutputStatus,
    AuthToken,
    Ping,
    SetOutput,
    SetSerialNumber,
}

impl MessageKind {
    pub fn schema(self) -> &'static MessageSchema {
        match self {
            Self::Hello => &HELLO,
            Self::MeterStatus => &METER_STATUS,
            Self::TemperatureReading => &TEMPERATURE_READING,
            Self::OutputStatus => &OUTPUT_STATUS,
            Self::AuthToken => &AUTH_TOKEN,
            Self::Ping => &PING,
            Self::SetOutput => &SET_OUTPUT,
            Self::SetSerialNumber => &SET_SERIAL_NUMBER,
        }
    }

    pub fn id(self) -> u16 {
        self.schema().id
    }

    pub fn from_id(id: u16) -> Option<Self> {
        match id {
            0x01 => Some(Self::Hello),
            0x10 => Some(Self::MeterStatus),
            0x11 => Some(Self::TemperatureReading),
            0x12 => Some(Self::OutputStatus),
            0x14 => Some(Self::AuthToken),
            0x81 => Some(Self::Ping),
            0x84 => Some(Self::SetOutput),
            0x85 => Some(Self::SetSerialNumber),
            _ => None,
        }
    }
}
