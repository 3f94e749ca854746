//! In-process descriptor fixtures, so tests never need a compiler.

use prost::Message as _;
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{
    DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto,
    FileDescriptorProto, FileDescriptorSet, MessageOptions,
};

pub(crate) fn file(
    name: &str,
    package: &str,
    deps: &[&str],
    messages: Vec<DescriptorProto>,
) -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some(name.to_string()),
        package: (!package.is_empty()).then(|| package.to_string()),
        dependency: deps.iter().map(|d| d.to_string()).collect(),
        message_type: messages,
        syntax: Some("proto3".to_string()),
        ..Default::default()
    }
}

pub(crate) fn message(
    name: &str,
    fields: Vec<FieldDescriptorProto>,
    nested: Vec<DescriptorProto>,
) -> DescriptorProto {
    DescriptorProto {
        name: Some(name.to_string()),
        field: fields,
        nested_type: nested,
        ..Default::default()
    }
}

pub(crate) fn field(name: &str, number: i32, ty: Type) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        label: Some(Label::Optional as i32),
        r#type: Some(ty as i32),
        ..Default::default()
    }
}

pub(crate) fn repeated(mut field: FieldDescriptorProto) -> FieldDescriptorProto {
    field.label = Some(Label::Repeated as i32);
    field
}

/// `type_name` is fully qualified with a leading dot, e.g. `.acme.Address`.
pub(crate) fn typed_field(name: &str, number: i32, ty: Type, type_name: &str) -> FieldDescriptorProto {
    FieldDescriptorProto {
        type_name: Some(type_name.to_string()),
        ..field(name, number, ty)
    }
}

/// `map<key, value>` field plus the synthetic entry type that backs it.
pub(crate) fn map_field(
    name: &str,
    number: i32,
    parent_full_name: &str,
    key: Type,
    value: Type,
) -> (FieldDescriptorProto, DescriptorProto) {
    let entry_name = format!("{}Entry", upper_camel(name));
    let entry = DescriptorProto {
        name: Some(entry_name.clone()),
        field: vec![field("key", 1, key), field("value", 2, value)],
        options: Some(MessageOptions {
            map_entry: Some(true),
            ..Default::default()
        }),
        ..Default::default()
    };
    let field = repeated(typed_field(
        name,
        number,
        Type::Message,
        &format!(".{parent_full_name}.{entry_name}"),
    ));
    (field, entry)
}

pub(crate) fn enumeration(name: &str, values: &[&str]) -> EnumDescriptorProto {
    EnumDescriptorProto {
        name: Some(name.to_string()),
        value: values
            .iter()
            .enumerate()
            .map(|(number, value)| EnumValueDescriptorProto {
                name: Some(value.to_string()),
                number: Some(number as i32),
                ..Default::default()
            })
            .collect(),
        ..Default::default()
    }
}

pub(crate) fn descriptor_set(files: Vec<FileDescriptorProto>) -> Vec<u8> {
    FileDescriptorSet { file: files }.encode_to_vec()
}

/// `message Login { string username = 1; string password = 2; }`
pub(crate) fn login_set() -> Vec<u8> {
    descriptor_set(vec![file(
        "login.proto",
        "",
        &[],
        vec![message(
            "Login",
            vec![
                field("username", 1, Type::String),
                field("password", 2, Type::String),
            ],
            vec![],
        )],
    )])
}

fn upper_camel(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = true;
    for c in name.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}
