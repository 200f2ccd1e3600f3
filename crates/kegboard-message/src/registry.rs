use std::collections::HashMap;

use kegboard_frame::Frame;
use tracing::trace;

use crate::error::{MessageError, Result};
use crate::field::FieldValue;
use crate::message::Message;
use crate::schema::{MessageSchema, BUILTIN_SCHEMAS};

/// Message-type-keyed table of schemas used to decode frames.
#[derive(Debug, Clone)]
pub struct Registry {
    schemas: HashMap<u16, &'static MessageSchema>,
}

impl Registry {
    /// Create an empty registry.
    pub fn empty() -> Self {
        Self {
            schemas: HashMap::new(),
        }
    }

    /// Create a registry holding every KBSP v1 message type.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        for schema in BUILTIN_SCHEMAS {
            registry.register(schema);
        }
        registry
    }

    /// Add a schema, replacing any schema registered under the same id.
    pub fn register(&mut self, schema: &'static MessageSchema) -> Option<&'static MessageSchema> {
        self.schemas.insert(schema.id, schema)
    }

    pub fn get(&self, id: u16) -> Option<&'static MessageSchema> {
        self.schemas.get(&id).copied()
    }

    /// Look a schema up by its message name.
    pub fn by_name(&self, name: &str) -> Option<&'static MessageSchema> {
        self.schemas.values().copied().find(|schema| schema.name == name)
    }

    pub fn contains(&self, id: u16) -> bool {
        self.schemas.contains_key(&id)
    }

    /// Registered message ids, ascending.
    pub fn ids(&self) -> Vec<u16> {
        let mut ids: Vec<u16> = self.schemas.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Decode a validated frame into a message.
    pub fn decode(&self, frame: &Frame) -> Result<Message> {
        self.decode_payload(frame.message_id, frame.payload.as_ref())
    }

    /// Decode a TLV payload as message type `id`.
    ///
    /// Entries with tags the schema does not know are skipped. A repeated tag
    /// keeps the last value.
    pub fn decode_payload(&self, id: u16, payload: &[u8]) -> Result<Message> {
        let schema = self.get(id).ok_or(MessageError::UnknownMessage(id))?;
        let mut message = Message::new(schema);

        let mut offset = 0;
        while offset < payload.len() {
            let (tag, len) = match payload.get(offset..offset + 2) {
                Some(&[tag, len]) => (tag, usize::from(len)),
                _ => {
                    return Err(MessageError::Truncated {
                        message: schema.name,
                        offset,
                    })
                }
            };
            let start = offset + 2;
            let raw = payload
                .get(start..start + len)
                .ok_or(MessageError::Truncated {
                    message: schema.name,
                    offset,
                })?;
            offset = start + len;

            let Some(index) = schema.position_of_tag(tag) else {
                trace!(message = schema.name, tag, len, "skipping unknown field");
                continue;
            };
            let spec = &schema.fields[index];
            let value =
                FieldValue::decode(spec.ty, raw).map_err(|expected| MessageError::Format {
                    message: schema.name,
                    field: spec.name,
                    expected,
                    actual: raw.len(),
                })?;
            message.put(index, value);
        }

        Ok(message)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::builtin()
    }
}
