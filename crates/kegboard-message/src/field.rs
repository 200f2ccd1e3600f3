use std::fmt;

use serde::Serialize;

/// Largest value a single TLV entry can carry.
pub const MAX_VALUE_LEN: usize = u8::MAX as usize;

/// Wire type of a message field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    U8,
    U16,
    U32,
    I32,
    /// UTF-8 text. Trailing NUL padding is trimmed on decode.
    Str,
    /// Opaque bytes.
    Bytes,
}

impl FieldType {
    /// Encoded width of fixed-width types, `None` for variable-length ones.
    pub fn width(self) -> Option<usize> {
        match self {
            Self::U8 => Some(1),
            Self::U16 => Some(2),
            Self::U32 | Self::I32 => Some(4),
            Self::Str | Self::Bytes => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::I32 => "i32",
            Self::Str => "string",
            Self::Bytes => "bytes",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a message schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// TLV tag on the wire.
    pub tag: u8,
    pub name: &'static str,
    pub ty: FieldType,
}

impl FieldSpec {
    pub const fn new(tag: u8, name: &'static str, ty: FieldType) -> Self {
        Self { tag, name, ty }
    }
}

/// A decoded or assigned field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    U8(u8),
    U16(u16),
    U32(u32),
    I32(i32),
    Str(String),
    Bytes(Vec<u8>),
}

impl FieldValue {
    pub fn field_type(&self) -> FieldType {
        match self {
            Self::U8(_) => FieldType::U8,
            Self::U16(_) => FieldType::U16,
            Self::U32(_) => FieldType::U32,
            Self::I32(_) => FieldType::I32,
            Self::Str(_) => FieldType::Str,
            Self::Bytes(_) => FieldType::Bytes,
        }
    }

    /// Integer fields widened to `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Self::U8(v) => Some(v.into()),
            Self::U16(v) => Some(v.into()),
            Self::U32(v) => Some(v.into()),
            Self::I32(v) => Some(v.into()),
            Self::Str(_) | Self::Bytes(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Value bytes as they appear inside a TLV entry.
    pub(crate) fn encode(&self) -> Vec<u8> {
        match self {
            Self::U8(v) => vec![*v],
            Self::U16(v) => v.to_le_bytes().to_vec(),
            Self::U32(v) => v.to_le_bytes().to_vec(),
            Self::I32(v) => v.to_le_bytes().to_vec(),
            Self::Str(s) => s.as_bytes().to_vec(),
            Self::Bytes(b) => b.clone(),
        }
    }

    /// Decode TLV value bytes as `ty`.
    ///
    /// Fails with the expected width when a fixed-width value has the wrong
    /// length.
    pub(crate) fn decode(ty: FieldType, raw: &[u8]) -> std::result::Result<Self, usize> {
        if let Some(width) = ty.width() {
            if raw.len() != width {
                return Err(width);
            }
        }
        let value = match ty {
            FieldType::U8 => Self::U8(raw[0]),
            FieldType::U16 => Self::U16(u16::from_le_bytes([raw[0], raw[1]])),
            FieldType::U32 => Self::U32(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]])),
            FieldType::I32 => Self::I32(i32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]])),
            FieldType::Str => {
                let end = raw.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
                Self::Str(String::from_utf8_lossy(&raw[..end]).into_owned())
            }
            FieldType::Bytes => Self::Bytes(raw.to_vec()),
        };
        Ok(value)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::U8(v) => write!(f, "{v}"),
            Self::U16(v) => write!(f, "{v}"),
            Self::U32(v) => write!(f, "{v}"),
            Self::I32(v) => write!(f, "{v}"),
            Self::Str(s) => f.write_str(s),
            Self::Bytes(b) => {
                for byte in b {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<u8> for FieldValue {
    fn from(v: u8) -> Self {
        Self::U8(v)
    }
}

impl From<u16> for FieldValue {
    fn from(v: u16) -> Self {
        Self::U16(v)
    }
}

impl From<u32> for FieldValue {
    fn from(v: u32) -> Self {
        Self::U32(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        Self::I32(v)
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<Vec<u8>> for FieldValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl From<&[u8]> for FieldValue {
    fn from(v: &[u8]) -> Self {
        Self::Bytes(v.to_vec())
    }
}
