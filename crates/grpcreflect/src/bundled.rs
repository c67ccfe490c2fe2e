//! The crate's own copies of the well-known service descriptors.

use std::sync::Once;

use prost::Message;
use prost_reflect::DescriptorPool;
use prost_types::FileDescriptorSet;

use crate::mangle::mangle_file;

/// Name of the v1 reflection service.
pub const REFLECTION_V1_SERVICE: &str = "grpc.reflection.v1.ServerReflection";

/// Name of the legacy v1alpha reflection service.
pub const REFLECTION_V1ALPHA_SERVICE: &str = "grpc.reflection.v1alpha.ServerReflection";

/// Name of the standard health checking service.
pub const HEALTH_V1_SERVICE: &str = "grpc.health.v1.Health";

/// Services whose descriptors ship with this crate under the internal prefix.
pub const WELL_KNOWN_SERVICES: [&str; 3] = [
    REFLECTION_V1_SERVICE,
    REFLECTION_V1ALPHA_SERVICE,
    HEALTH_V1_SERVICE,
];

fn encoded_sets() -> Vec<&'static [u8]> {
    #[allow(unused_mut)]
    let mut sets = vec![
        tonic_reflection::pb::v1::FILE_DESCRIPTOR_SET,
        tonic_reflection::pb::v1alpha::FILE_DESCRIPTOR_SET,
    ];
    #[cfg(feature = "health")]
    sets.push(tonic_health::pb::FILE_DESCRIPTOR_SET);
    sets
}

/// Every bundled file, moved under the internal prefix.
pub fn mangled_descriptor_set() -> Result<FileDescriptorSet, prost::DecodeError> {
    let mut file = Vec::new();
    for bytes in encoded_sets() {
        let set = FileDescriptorSet::decode(bytes)?;
        file.extend(set.file.into_iter().map(mangle_file));
    }
    Ok(FileDescriptorSet { file })
}

/// Register the internal copies with the process-wide pool. Runs once.
///
/// Failures are logged and leave the affected service unresolvable.
pub fn register() {
    static REGISTERED: Once = Once::new();

    REGISTERED.call_once(|| {
        let set = match mangled_descriptor_set() {
            Ok(set) => set,
            Err(err) => {
                tracing::warn!(error = %err, "bundled descriptors are corrupt");
                return;
            }
        };

        for file in set.file {
            let name = file.name().to_string();
            if DescriptorPool::global().get_file_by_name(&name).is_some() {
                continue;
            }
            if let Err(err) = DescriptorPool::add_global_file_descriptor_proto::<&[u8]>(file) {
                tracing::warn!(file = %name, error = %err, "failed to register bundled descriptor");
            }
        }
    });
}
