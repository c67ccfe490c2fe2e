//! Internal-prefix rewriting of file descriptors.
//!
//! The crate's own copies of the well-known reflection and health files are
//! registered under `connectext.`/`connectext/` so they cannot collide with a
//! copy the application registers itself. [`unmangle_file`] turns such a copy
//! back into the public form clients expect.

use prost_types::{DescriptorProto, FieldDescriptorProto, FileDescriptorProto};

/// Prefix added to the package of an internal copy.
pub const PACKAGE_PREFIX: &str = "connectext.";

/// Prefix added to the path of an internal copy.
pub const PATH_PREFIX: &str = "connectext/";

const REFERENCE_PREFIX: &str = ".connectext.";

/// Move `file` under the internal prefix.
///
/// References into the file's own package follow it. Imports and references
/// to other packages are left alone.
pub fn mangle_file(mut file: FileDescriptorProto) -> FileDescriptorProto {
    let own = format!(".{}.", file.package());
    if let Some(package) = file.package.as_mut() {
        package.insert_str(0, PACKAGE_PREFIX);
    }
    if let Some(name) = file.name.as_mut() {
        name.insert_str(0, PATH_PREFIX);
    }
    rewrite_file(&mut file, &|reference| {
        reference
            .starts_with(&own)
            .then(|| format!(".{PACKAGE_PREFIX}{}", &reference[1..]))
    });
    file
}

/// Strip the internal prefix from `file`'s package, path and every type,
/// extendee and method reference that carries it.
pub fn unmangle_file(mut file: FileDescriptorProto) -> FileDescriptorProto {
    if let Some(package) = file.package.as_mut() {
        if let Some(public) = package.strip_prefix(PACKAGE_PREFIX) {
            *package = public.to_string();
        }
    }
    if let Some(name) = file.name.as_mut() {
        if let Some(public) = name.strip_prefix(PATH_PREFIX) {
            *name = public.to_string();
        }
    }
    rewrite_file(&mut file, &|reference| {
        reference
            .strip_prefix(REFERENCE_PREFIX)
            .map(|rest| format!(".{rest}"))
    });
    file
}

/// The internal name of a fully-qualified symbol, e.g.
/// `connectext.grpc.health.v1.Health`.
pub fn mangled_name(name: &str) -> String {
    format!("{PACKAGE_PREFIX}{name}")
}

type Rewrite<'a> = dyn Fn(&str) -> Option<String> + 'a;

fn rewrite_file(file: &mut FileDescriptorProto, rewrite: &Rewrite<'_>) {
    for message in &mut file.message_type {
        rewrite_message(message, rewrite);
    }
    for extension in &mut file.extension {
        rewrite_field(extension, rewrite);
    }
    for method in file.service.iter_mut().flat_map(|s| s.method.iter_mut()) {
        rewrite_reference(&mut method.input_type, rewrite);
        rewrite_reference(&mut method.output_type, rewrite);
    }
}

fn rewrite_message(message: &mut DescriptorProto, rewrite: &Rewrite<'_>) {
    for field in message.field.iter_mut().chain(message.extension.iter_mut()) {
        rewrite_field(field, rewrite);
    }
    for nested in &mut message.nested_type {
        rewrite_message(nested, rewrite);
    }
}

fn rewrite_field(field: &mut FieldDescriptorProto, rewrite: &Rewrite<'_>) {
    rewrite_reference(&mut field.type_name, rewrite);
    rewrite_reference(&mut field.extendee, rewrite);
}

fn rewrite_reference(reference: &mut Option<String>, rewrite: &Rewrite<'_>) {
    if let Some(new) = reference.as_deref().and_then(rewrite) {
        *reference = Some(new);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use prost_types::field_descriptor_proto::Type;
    use prost_types::{MethodDescriptorProto, ServiceDescriptorProto};

    fn references(file: &FileDescriptorProto) -> Vec<String> {
        fn collect(message: &DescriptorProto, out: &mut Vec<String>) {
            for field in message.field.iter().chain(&message.extension) {
                out.extend(field.type_name.clone());
                out.extend(field.extendee.clone());
            }
            for nested in &message.nested_type {
                collect(nested, out);
            }
        }

        let mut out = Vec::new();
        for message in &file.message_type {
            collect(message, &mut out);
        }
        for field in &file.extension {
            out.extend(field.type_name.clone());
            out.extend(field.extendee.clone());
        }
        for method in file.service.iter().flat_map(|s| &s.method) {
            out.extend(method.input_type.clone());
            out.extend(method.output_type.clone());
        }
        out
    }

    fn health_like() -> FileDescriptorProto {
        let mut outer = testing::message(
            "HealthCheckResponse",
            vec![testing::message_field(
                "detail",
                2,
                ".grpc.health.v1.HealthCheckResponse.Detail",
            )],
        );
        outer.nested_type.push(testing::message(
            "Detail",
            vec![
                testing::message_field("request", 1, ".grpc.health.v1.HealthCheckRequest"),
                testing::message_field("timestamp", 2, ".google.protobuf.Timestamp"),
            ],
        ));
        outer.nested_type[0].extension.push(testing::extension(
            "note",
            100,
            ".grpc.health.v1.HealthCheckRequest",
        ));

        FileDescriptorProto {
            name: Some("grpc/health/v1/health.proto".to_string()),
            package: Some("grpc.health.v1".to_string()),
            dependency: vec!["google/protobuf/timestamp.proto".to_string()],
            message_type: vec![
                testing::message(
                    "HealthCheckRequest",
                    vec![testing::field("service", 1, Type::String)],
                ),
                outer,
            ],
            extension: vec![testing::extension(
                "tag",
                200,
                ".grpc.health.v1.HealthCheckRequest",
            )],
            service: vec![ServiceDescriptorProto {
                name: Some("Health".to_string()),
                method: vec![MethodDescriptorProto {
                    name: Some("Check".to_string()),
                    input_type: Some(".grpc.health.v1.HealthCheckRequest".to_string()),
                    output_type: Some(".grpc.health.v1.HealthCheckResponse".to_string()),
                    ..Default::default()
                }],
                options: None,
            }],
            ..Default::default()
        }
    }

    #[test]
    fn mangle_moves_package_path_and_own_references() {
        let mangled = mangle_file(health_like());

        assert_eq!(mangled.package(), "connectext.grpc.health.v1");
        assert_eq!(mangled.name(), "connectext/grpc/health/v1/health.proto");
        assert_eq!(mangled.dependency, vec!["google/protobuf/timestamp.proto"]);

        for reference in references(&mangled) {
            if reference.contains("google.protobuf") {
                assert_eq!(reference, ".google.protobuf.Timestamp");
            } else {
                assert!(reference.starts_with(".connectext.grpc.health.v1."), "{reference}");
            }
        }
    }

    #[test]
    fn unmangle_leaves_no_internal_prefix() {
        let unmangled = unmangle_file(mangle_file(health_like()));

        assert_eq!(unmangled.package(), "grpc.health.v1");
        assert_eq!(unmangled.name(), "grpc/health/v1/health.proto");
        for reference in references(&unmangled) {
            assert!(!reference.contains("connectext"), "{reference}");
        }
        assert_eq!(unmangled, health_like());
    }

    #[test]
    fn unmangle_only_strips_leading_prefix() {
        let file = FileDescriptorProto {
            name: Some("acme/connectext/thing.proto".to_string()),
            package: Some("acme.connectext".to_string()),
            message_type: vec![testing::message(
                "Thing",
                vec![testing::message_field("other", 1, ".acme.connectext.Other")],
            )],
            ..Default::default()
        };

        assert_eq!(unmangle_file(file.clone()), file);
    }

    #[test]
    fn mangled_name_matches_mangled_package() {
        assert_eq!(
            mangled_name("grpc.health.v1.Health"),
            "connectext.grpc.health.v1.Health"
        );

        let file = mangle_file(FileDescriptorProto {
            name: Some("grpc/health/v1/health.proto".to_string()),
            package: Some("grpc.health.v1".to_string()),
            ..Default::default()
        });
        assert_eq!(
            mangled_name("grpc.health.v1.Health"),
            format!("{}.Health", file.package())
        );
    }
}
