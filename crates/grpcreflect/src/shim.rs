//! Resolver that serves the bundled well-known descriptors under their
//! public names.
//!
//! [`bundled`](crate::bundled) registers its files as
//! `connectext.grpc.reflection.v1` and so on. A client asking for
//! `grpc.reflection.v1.ServerReflection` must still get an answer, so
//! [`UnmanglingResolver`] keeps a small overlay pool holding unprefixed
//! rebuilds of those files and consults it before the primary resolver.

use std::sync::{Arc, OnceLock};

use prost_reflect::{DescriptorError, DescriptorPool, FileDescriptor};

use crate::bundled::{self, WELL_KNOWN_SERVICES};
use crate::mangle::{mangled_name, unmangle_file};
use crate::registry::{DescriptorResolver, GlobalRegistry, LookupError};

/// Wraps a primary resolver with a lazily built overlay of unmangled files.
#[derive(Debug)]
pub struct UnmanglingResolver<R> {
    primary: R,
    overlay: OnceLock<DescriptorPool>,
}

impl<R: DescriptorResolver> UnmanglingResolver<R> {
    pub fn new(primary: R) -> Self {
        Self {
            primary,
            overlay: OnceLock::new(),
        }
    }

    pub fn primary(&self) -> &R {
        &self.primary
    }

    /// The overlay pool, built on first use.
    ///
    /// Concurrent first callers wait for the single construction.
    pub fn overlay(&self) -> &DescriptorPool {
        self.overlay.get_or_init(|| build_overlay(&self.primary))
    }
}

impl<R: DescriptorResolver> DescriptorResolver for UnmanglingResolver<R> {
    fn find_file_by_path(&self, path: &str) -> Result<FileDescriptor, LookupError> {
        self.overlay()
            .find_file_by_path(path)
            .or_else(|_| self.primary.find_file_by_path(path))
    }

    fn find_file_containing_symbol(&self, name: &str) -> Result<FileDescriptor, LookupError> {
        self.overlay()
            .find_file_containing_symbol(name)
            .or_else(|_| self.primary.find_file_containing_symbol(name))
    }
}

/// The process-wide pool, with the bundled descriptors registered and
/// visible under their public names.
pub fn global_files() -> Arc<UnmanglingResolver<GlobalRegistry>> {
    static FILES: OnceLock<Arc<UnmanglingResolver<GlobalRegistry>>> = OnceLock::new();

    FILES
        .get_or_init(|| {
            bundled::register();
            Arc::new(UnmanglingResolver::new(GlobalRegistry))
        })
        .clone()
}

fn build_overlay<R: DescriptorResolver>(primary: &R) -> DescriptorPool {
    let mut overlay = DescriptorPool::new();

    for name in WELL_KNOWN_SERVICES {
        if primary.find_file_containing_symbol(name).is_ok() {
            // The application registered its own copy.
            continue;
        }
        let mangled = mangled_name(name);
        let Ok(file) = primary.find_file_containing_symbol(&mangled) else {
            continue;
        };
        if let Err(err) = add_unmangled(&mut overlay, &file) {
            tracing::debug!(service = name, error = %err, "could not unmangle bundled descriptor");
        }
    }

    tracing::debug!(files = overlay.files().count(), "built descriptor overlay");
    overlay
}

fn add_unmangled(overlay: &mut DescriptorPool, file: &FileDescriptor) -> Result<(), DescriptorError> {
    add_dependencies(overlay, file)?;
    overlay.add_file_descriptor_proto(unmangle_file(file.file_descriptor_proto().clone()))
}

fn add_dependencies(overlay: &mut DescriptorPool, file: &FileDescriptor) -> Result<(), DescriptorError> {
    for dependency in file.dependencies() {
        if overlay.get_file_by_name(dependency.name()).is_some() {
            continue;
        }
        add_dependencies(overlay, &dependency)?;
        overlay.add_file_descriptor_proto(dependency.file_descriptor_proto().clone())?;
    }
    Ok(())
}
