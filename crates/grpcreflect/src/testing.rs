//! Hand-built descriptors shared by the unit tests.

use prost_reflect::DescriptorPool;
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{
    descriptor_proto::ExtensionRange, DescriptorProto, EnumDescriptorProto,
    EnumValueDescriptorProto, FieldDescriptorProto, FileDescriptorProto, FileDescriptorSet,
    MethodDescriptorProto, ServiceDescriptorProto,
};

pub(crate) const PACKAGE: &str = "connect.reflecttest.v1";
pub(crate) const BASE_FILE: &str = "connect/reflecttest/v1/reflecttest.proto";
pub(crate) const EXT_FILE: &str = "connect/reflecttest/v1/reflecttest_ext.proto";
pub(crate) const WRAPPER_FILE: &str = "connect/reflecttest/v1/wrapper.proto";
pub(crate) const EXTENDABLE: &str = "connect.reflecttest.v1.Extendable";
pub(crate) const SERVICE: &str = "connect.reflecttest.v1.TestService";

pub(crate) fn field(name: &str, number: i32, ty: Type) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        label: Some(Label::Optional as i32),
        r#type: Some(ty as i32),
        ..Default::default()
    }
}

pub(crate) fn message_field(name: &str, number: i32, type_name: &str) -> FieldDescriptorProto {
    FieldDescriptorProto {
        type_name: Some(type_name.to_string()),
        ..field(name, number, Type::Message)
    }
}

pub(crate) fn extension(name: &str, number: i32, extendee: &str) -> FieldDescriptorProto {
    FieldDescriptorProto {
        extendee: Some(extendee.to_string()),
        ..field(name, number, Type::String)
    }
}

pub(crate) fn message(name: &str, fields: Vec<FieldDescriptorProto>) -> DescriptorProto {
    DescriptorProto {
        name: Some(name.to_string()),
        field: fields,
        ..Default::default()
    }
}

fn base_file() -> FileDescriptorProto {
    let extendable = DescriptorProto {
        extension_range: vec![ExtensionRange {
            start: Some(10),
            end: Some(100),
            options: None,
        }],
        ..message("Extendable", vec![field("name", 1, Type::String)])
    };
    let color = EnumDescriptorProto {
        name: Some("Color".to_string()),
        value: vec![
            EnumValueDescriptorProto {
                name: Some("COLOR_UNSPECIFIED".to_string()),
                number: Some(0),
                options: None,
            },
            EnumValueDescriptorProto {
                name: Some("COLOR_RED".to_string()),
                number: Some(1),
                options: None,
            },
        ],
        ..Default::default()
    };
    let mut color_field = field("color", 2, Type::Enum);
    color_field.type_name = Some(".connect.reflecttest.v1.Color".to_string());

    FileDescriptorProto {
        name: Some(BASE_FILE.to_string()),
        package: Some(PACKAGE.to_string()),
        syntax: Some("proto2".to_string()),
        message_type: vec![
            extendable,
            message("Request", vec![field("text", 1, Type::String)]),
            message("Response", vec![field("text", 1, Type::String), color_field]),
        ],
        enum_type: vec![color],
        service: vec![ServiceDescriptorProto {
            name: Some("TestService".to_string()),
            method: vec![MethodDescriptorProto {
                name: Some("Echo".to_string()),
                input_type: Some(".connect.reflecttest.v1.Request".to_string()),
                output_type: Some(".connect.reflecttest.v1.Response".to_string()),
                ..Default::default()
            }],
            options: None,
        }],
        ..Default::default()
    }
}

fn ext_file() -> FileDescriptorProto {
    let extendee = format!(".{EXTENDABLE}");
    FileDescriptorProto {
        name: Some(EXT_FILE.to_string()),
        package: Some(PACKAGE.to_string()),
        syntax: Some("proto2".to_string()),
        dependency: vec![BASE_FILE.to_string()],
        // Declared out of order on purpose.
        extension: vec![
            extension("localized_message", 11, &extendee),
            extension("message", 10, &extendee),
        ],
        ..Default::default()
    }
}

fn wrapper_file() -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some(WRAPPER_FILE.to_string()),
        package: Some(PACKAGE.to_string()),
        syntax: Some("proto2".to_string()),
        dependency: vec![BASE_FILE.to_string()],
        message_type: vec![message(
            "Wrapper",
            vec![message_field("request", 1, ".connect.reflecttest.v1.Request")],
        )],
        ..Default::default()
    }
}

pub(crate) fn file_descriptor_set() -> FileDescriptorSet {
    FileDescriptorSet {
        file: vec![base_file(), ext_file(), wrapper_file()],
    }
}

pub(crate) fn pool() -> DescriptorPool {
    DescriptorPool::from_file_descriptor_set(file_descriptor_set())
        .expect("fixture descriptors are valid")
}
