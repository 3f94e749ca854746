//! Sample JSON documents for registered message types.
//!
//! Operators use these as a starting point for hand-written payloads. Keys are
//! proto field names; every field gets a recognisable placeholder value, so a
//! template always encodes to a non-trivial message of its own type.

use std::collections::HashSet;

use base64::Engine as _;
use prost_reflect::{FieldDescriptor, Kind, MessageDescriptor};
use serde_json::{json, Map, Value};

use crate::encode::lookup;
use crate::error::Result;
use crate::registry::TypeRegistry;

/// Self-referencing types are cut off (as `{}`) below this depth.
pub const MAX_TEMPLATE_DEPTH: usize = 8;

pub fn template(type_name: &str, registry: &TypeRegistry) -> Result<Value> {
    let descriptor = lookup(type_name, registry)?;
    Ok(message_template(descriptor))
}

pub fn message_template(descriptor: &MessageDescriptor) -> Value {
    message_value(descriptor, 0)
}

fn message_value(descriptor: &MessageDescriptor, depth: usize) -> Value {
    if let Some(value) = well_known_value(descriptor) {
        return value;
    }
    if depth >= MAX_TEMPLATE_DEPTH {
        return Value::Object(Map::new());
    }

    let mut object = Map::new();
    // Only one member of a oneof may be set. A proto3 `optional` field sits
    // alone in its own oneof, so it is always filled.
    let mut oneofs_seen = HashSet::new();
    for field in descriptor.fields() {
        if let Some(oneof) = field.containing_oneof() {
            if !oneofs_seen.insert(oneof.full_name().to_string()) {
                continue;
            }
        }
        if let Some(value) = field_value(&field, depth) {
            object.insert(field.name().to_string(), value);
        }
    }
    Value::Object(object)
}

fn field_value(field: &FieldDescriptor, depth: usize) -> Option<Value> {
    if field.is_map() {
        let Kind::Message(entry) = field.kind() else {
            return None;
        };
        let key = map_key(&entry.map_entry_key_field().kind());
        let value = single_value(&entry.map_entry_value_field(), false, depth)?;
        let mut object = Map::new();
        object.insert(key, value);
        return Some(Value::Object(object));
    }

    if field.is_list() {
        return single_value(field, true, depth).map(|v| Value::Array(vec![v]));
    }
    single_value(field, false, depth)
}

fn single_value(field: &FieldDescriptor, in_list: bool, depth: usize) -> Option<Value> {
    let value = match field.kind() {
        Kind::String if in_list => json!("sample_string"),
        Kind::String => json!(format!("{}_value", field.name())),
        Kind::Bool => json!(true),
        Kind::Int32
        | Kind::Int64
        | Kind::Uint32
        | Kind::Uint64
        | Kind::Sint32
        | Kind::Sint64
        | Kind::Fixed32
        | Kind::Fixed64
        | Kind::Sfixed32
        | Kind::Sfixed64 => {
            if in_list {
                json!(123)
            } else {
                json!(12345)
            }
        }
        Kind::Float | Kind::Double => json!(12.34),
        Kind::Bytes => json!(base64::engine::general_purpose::STANDARD.encode(b"sample")),
        Kind::Enum(descriptor) => {
            let mut values = descriptor.values();
            let first = values.next()?;
            let chosen = values.next().unwrap_or(first);
            json!(chosen.name())
        }
        Kind::Message(descriptor) => {
            if descriptor.full_name() == "google.protobuf.Any" {
                return None;
            }
            message_value(&descriptor, depth + 1)
        }
    };
    Some(value)
}

fn map_key(kind: &Kind) -> String {
    match kind {
        Kind::Bool => "true".to_string(),
        Kind::String => "key".to_string(),
        _ => "1".to_string(),
    }
}

/// JSON forms for well-known types that do not map to plain objects.
fn well_known_value(descriptor: &MessageDescriptor) -> Option<Value> {
    let value = match descriptor.full_name() {
        "google.protobuf.Timestamp" => json!("1970-01-01T00:00:00Z"),
        "google.protobuf.Duration" => json!("1s"),
        "google.protobuf.FieldMask" => json!("sample"),
        "google.protobuf.Struct" | "google.protobuf.Empty" => json!({}),
        "google.protobuf.ListValue" => json!([]),
        "google.protobuf.Value" | "google.protobuf.StringValue" => json!("sample_string"),
        "google.protobuf.BytesValue" => {
            json!(base64::engine::general_purpose::STANDARD.encode(b"sample"))
        }
        "google.protobuf.BoolValue" => json!(true),
        "google.protobuf.DoubleValue" | "google.protobuf.FloatValue" => json!(12.34),
        "google.protobuf.Int32Value"
        | "google.protobuf.Int64Value"
        | "google.protobuf.UInt32Value"
        | "google.protobuf.UInt64Value" => json!(12345),
        _ => return None,
    };
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DependencyPolicy;
    use crate::encode::encode;
    use crate::testutil::*;
    use prost_types::field_descriptor_proto::Type;
    use prost_types::{FieldDescriptorProto, OneofDescriptorProto};

    fn registry() -> TypeRegistry {
        let (labels, labels_entry) =
            map_field("labels", 6, "acme.Node", Type::String, Type::Int32);
        let mut choice_a = field("by_id", 7, Type::Int64);
        choice_a.oneof_index = Some(0);
        let mut choice_b = field("by_name", 8, Type::String);
        choice_b.oneof_index = Some(0);

        let mut node = message(
            "Node",
            vec![
                field("title", 1, Type::String),
                field("weight", 2, Type::Double),
                repeated(field("aliases", 3, Type::String)),
                typed_field("kind", 4, Type::Enum, ".acme.Kind"),
                typed_field("parent", 5, Type::Message, ".acme.Node"),
                labels,
                choice_a,
                choice_b,
                field("blob", 9, Type::Bytes),
            ],
            vec![labels_entry],
        );
        node.oneof_decl = vec![OneofDescriptorProto {
            name: Some("lookup".to_string()),
            ..Default::default()
        }];

        let mut proto = file("node.proto", "acme", &[], vec![node]);
        proto.enum_type = vec![enumeration("Kind", &["KIND_UNSPECIFIED", "LEAF", "BRANCH"])];
        TypeRegistry::load(&descriptor_set(vec![proto]), DependencyPolicy::Lenient).unwrap()
    }

    #[test]
    fn placeholders_follow_field_kinds() {
        let value = template("acme.Node", &registry()).unwrap();
        assert_eq!(value["title"], json!("title_value"));
        assert_eq!(value["weight"], json!(12.34));
        assert_eq!(value["aliases"], json!(["sample_string"]));
        assert_eq!(value["kind"], json!("LEAF"));
        assert_eq!(value["labels"], json!({ "key": 12345 }));
        assert_eq!(value["blob"], json!("c2FtcGxl"));
        assert_eq!(value["parent"]["title"], json!("title_value"));
    }

    #[test]
    fn only_first_oneof_member_is_filled() {
        let value = template("Node", &registry()).unwrap();
        assert_eq!(value["by_id"], json!(12345));
        assert!(value.get("by_name").is_none());
    }

    #[test]
    fn proto3_optional_fields_are_filled() {
        let oneof = |name: &str| OneofDescriptorProto {
            name: Some(name.to_string()),
            ..Default::default()
        };
        let optional = |mut field: FieldDescriptorProto, index: i32| {
            field.proto3_optional = Some(true);
            field.oneof_index = Some(index);
            field
        };
        let mut by_id = field("by_id", 1, Type::Int64);
        by_id.oneof_index = Some(0);
        let mut by_name = field("by_name", 2, Type::String);
        by_name.oneof_index = Some(0);

        let mut account = message(
            "Account",
            vec![
                by_id,
                by_name,
                optional(field("nickname", 3, Type::String), 1),
                optional(field("age", 4, Type::Int32), 2),
            ],
            vec![],
        );
        account.oneof_decl = vec![oneof("lookup"), oneof("_nickname"), oneof("_age")];
        let proto = file("account.proto", "acme", &[], vec![account]);
        let registry =
            TypeRegistry::load(&descriptor_set(vec![proto]), DependencyPolicy::Lenient).unwrap();

        let value = template("Account", &registry).unwrap();
        assert_eq!(value["nickname"], json!("nickname_value"));
        assert_eq!(value["age"], json!(12345));
        assert_eq!(value["by_id"], json!(12345));
        assert!(value.get("by_name").is_none());

        let bytes = encode(&value.to_string(), "Account", &registry).unwrap();
        assert!(!bytes.is_empty());
    }

    #[test]
    fn recursive_types_are_cut_off() {
        let mut value = template("Node", &registry()).unwrap();
        let mut depth = 0;
        while let Some(parent) = value.get("parent").cloned() {
            value = parent;
            depth += 1;
        }
        assert_eq!(depth, MAX_TEMPLATE_DEPTH);
        assert_eq!(value, json!({}));
    }

    #[test]
    fn template_encodes_against_its_own_type() {
        let registry = registry();
        let value = template("Node", &registry).unwrap();
        let bytes = encode(&value.to_string(), "Node", &registry).unwrap();
        assert!(!bytes.is_empty());
    }

    #[test]
    fn unknown_type_is_reported() {
        let err = template("Missing", &registry()).unwrap_err();
        assert_eq!(err.kind(), "UnknownType");
    }
}
