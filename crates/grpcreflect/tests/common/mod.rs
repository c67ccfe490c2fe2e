//! Shared fixtures: a small schema and in-process client/server plumbing.
#![allow(dead_code)]

use grpcreflect::{ReflectionClient, ReflectionStream, Reflector, StreamOptions};
use prost_reflect::DescriptorPool;
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{
    descriptor_proto::ExtensionRange, DescriptorProto, FieldDescriptorProto, FileDescriptorProto,
    FileDescriptorSet, MethodDescriptorProto, ServiceDescriptorProto,
};

pub const A_FILE: &str = "pkg/a.proto";
pub const B_FILE: &str = "pkg/b.proto";
pub const GREETER_FILE: &str = "pkg/greeter.proto";
pub const EXTENDABLE: &str = "pkg.Extendable";
pub const GREETER: &str = "pkg.Greeter";
pub const HOST: &str = "reflect.test";

fn field(name: &str, number: i32, ty: Type) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        label: Some(Label::Optional as i32),
        r#type: Some(ty as i32),
        ..Default::default()
    }
}

fn extension(name: &str, number: i32) -> FieldDescriptorProto {
    FieldDescriptorProto {
        extendee: Some(format!(".{EXTENDABLE}")),
        ..field(name, number, Type::Int32)
    }
}

fn message(name: &str, fields: Vec<FieldDescriptorProto>) -> DescriptorProto {
    DescriptorProto {
        name: Some(name.to_string()),
        field: fields,
        ..Default::default()
    }
}

fn file(name: &str, dependency: &[&str]) -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some(name.to_string()),
        package: Some("pkg".to_string()),
        syntax: Some("proto2".to_string()),
        dependency: dependency.iter().map(|d| d.to_string()).collect(),
        ..Default::default()
    }
}

/// `b.proto` declares `Extendable` and `Greeting`; `a.proto` imports it and
/// extends `Extendable` at 11 and 10; `greeter.proto` imports `b.proto` and
/// declares the `Greeter` service.
pub fn descriptor_set() -> FileDescriptorSet {
    let b = FileDescriptorProto {
        message_type: vec![
            DescriptorProto {
                extension_range: vec![ExtensionRange {
                    start: Some(10),
                    end: Some(1000),
                    options: None,
                }],
                ..message("Extendable", vec![field("id", 1, Type::String)])
            },
            message("Greeting", vec![field("text", 1, Type::String)]),
        ],
        ..file(B_FILE, &[])
    };
    let a = FileDescriptorProto {
        extension: vec![extension("priority", 11), extension("weight", 10)],
        ..file(A_FILE, &[B_FILE])
    };
    let greeter = FileDescriptorProto {
        service: vec![ServiceDescriptorProto {
            name: Some("Greeter".to_string()),
            method: vec![MethodDescriptorProto {
                name: Some("Greet".to_string()),
                input_type: Some(".pkg.Greeting".to_string()),
                output_type: Some(".pkg.Greeting".to_string()),
                ..Default::default()
            }],
            options: None,
        }],
        ..file(GREETER_FILE, &[B_FILE])
    };

    FileDescriptorSet {
        file: vec![b, a, greeter],
    }
}

pub fn pool() -> DescriptorPool {
    DescriptorPool::from_file_descriptor_set(descriptor_set()).unwrap()
}

pub fn reflector() -> Reflector {
    Reflector::with_static_names([GREETER, "grpc.reflection.v1.ServerReflection"])
        .with_descriptor_pool(pool())
}

/// A v1 stream served in-process by `reflector`.
pub async fn open_v1(reflector: &Reflector) -> ReflectionStream {
    ReflectionClient::new(reflector.v1_service())
        .open_stream(StreamOptions::new().host(HOST))
        .await
        .unwrap()
}

/// A v1alpha stream served in-process by `reflector`.
pub async fn open_v1alpha(reflector: &Reflector) -> ReflectionStream {
    ReflectionClient::new_v1alpha(reflector.v1alpha_service())
        .open_stream(StreamOptions::new().host(HOST))
        .await
        .unwrap()
}

pub fn names(files: &[FileDescriptorProto]) -> Vec<&str> {
    files.iter().map(|file| file.name()).collect()
}
