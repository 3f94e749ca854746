//! JSON → dynamic message → protobuf wire bytes.
//!
//! Field binding is descriptor-driven: each JSON key is matched against the
//! message's field names (proto name or JSON camelCase name). Keys that match
//! nothing are skipped, so exploratory payloads still produce a best-effort
//! message. An empty result is legal and left for the caller to flag.

use prost::Message as _;
use prost_reflect::{DeserializeOptions, DynamicMessage, MessageDescriptor};
use serde_json::error::Category;

use crate::error::{ProtomeError, Result};
use crate::registry::TypeRegistry;

/// Encode `json` as the registered message type `type_name`.
pub fn encode(json: &str, type_name: &str, registry: &TypeRegistry) -> Result<Vec<u8>> {
    let descriptor = lookup(type_name, registry)?;
    let message = build_message(json, descriptor)?;
    Ok(message.encode_to_vec())
}

pub(crate) fn lookup<'a>(type_name: &str, registry: &'a TypeRegistry) -> Result<&'a MessageDescriptor> {
    registry
        .get(type_name)
        .ok_or_else(|| ProtomeError::UnknownType {
            requested: type_name.to_string(),
            available: registry.names(),
        })
}

/// Bind a JSON document to `descriptor`, ignoring unknown keys.
pub fn build_message(json: &str, descriptor: &MessageDescriptor) -> Result<DynamicMessage> {
    let options = DeserializeOptions::new().deny_unknown_fields(false);
    let mut deserializer = serde_json::Deserializer::from_str(json);
    let message =
        DynamicMessage::deserialize_with_options(descriptor.clone(), &mut deserializer, &options)
            .map_err(|e| classify(e, descriptor))?;
    deserializer.end().map_err(|e| classify(e, descriptor))?;
    Ok(message)
}

fn classify(err: serde_json::Error, descriptor: &MessageDescriptor) -> ProtomeError {
    match err.classify() {
        Category::Data => ProtomeError::FieldTypeMismatch {
            type_name: descriptor.full_name().to_string(),
            message: err.to_string(),
        },
        Category::Syntax | Category::Eof | Category::Io => ProtomeError::MalformedJson {
            message: err.to_string(),
        },
    }
}
