//! Read-only registry capabilities used by the reflection engine.
//!
//! The engine never assumes a process-wide singleton. Everything it needs
//! from a schema registry goes through [`DescriptorResolver`] and
//! [`ExtensionResolver`], which come in two flavours:
//!
//! - [`GlobalRegistry`] reads prost-reflect's process-wide pool
//!   ([`DescriptorPool::global`]) on every lookup.
//! - [`DescriptorPool`] itself, for an explicitly constructed registry.
//!
//! Implementations must be safe for unsynchronized concurrent reads.

use std::sync::Arc;

use prost_reflect::{DescriptorPool, ExtensionDescriptor, FileDescriptor};
use tonic::Code;

use crate::error::GrpcError;

/// A requested file, symbol or extension is not registered.
///
/// The `Display` text is sent to the peer as the in-band error message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    #[error("file not found: {0}")]
    FileNotFound(String),
    #[error("symbol not found: {0}")]
    SymbolNotFound(String),
    #[error("extension {number} of message {message} not found")]
    ExtensionNotFound { message: String, number: i32 },
    #[error("no extensions for type {0:?}")]
    NoExtensions(String),
}

impl GrpcError for LookupError {
    fn code(&self) -> Code {
        Code::NotFound
    }
}

/// Finds files by path and by the fully-qualified names they declare.
pub trait DescriptorResolver: Send + Sync {
    fn find_file_by_path(&self, path: &str) -> Result<FileDescriptor, LookupError>;

    /// Resolve a message, enum, enum value, service, method, field or
    /// extension by fully-qualified name and return its declaring file.
    fn find_file_containing_symbol(&self, name: &str) -> Result<FileDescriptor, LookupError>;
}

/// Finds registered extensions of a message type.
pub trait ExtensionResolver: Send + Sync {
    fn find_extension_by_number(
        &self,
        message: &str,
        number: i32,
    ) -> Result<ExtensionDescriptor, LookupError>;

    /// Field numbers of every registered extension of `message`, unordered.
    fn extension_numbers(&self, message: &str) -> Vec<i32>;
}

/// Lists the fully-qualified service names advertised by `list_services`.
///
/// The order returned is the order sent to clients.
pub trait Namer: Send + Sync {
    fn names(&self) -> Vec<String>;
}

/// A fixed list of service names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticNames {
    names: Vec<String>,
}

impl StaticNames {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }
}

impl Namer for StaticNames {
    fn names(&self) -> Vec<String> {
        self.names.clone()
    }
}

impl<F> Namer for F
where
    F: Fn() -> Vec<String> + Send + Sync,
{
    fn names(&self) -> Vec<String> {
        self()
    }
}

/// The ambient, process-wide registry.
///
/// Files registered with [`DescriptorPool::decode_global_file_descriptor_set`]
/// (or the other `*_global_*` helpers) become visible to every subsequent
/// lookup.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobalRegistry;

impl DescriptorResolver for GlobalRegistry {
    fn find_file_by_path(&self, path: &str) -> Result<FileDescriptor, LookupError> {
        DescriptorResolver::find_file_by_path(&DescriptorPool::global(), path)
    }

    fn find_file_containing_symbol(&self, name: &str) -> Result<FileDescriptor, LookupError> {
        DescriptorResolver::find_file_containing_symbol(&DescriptorPool::global(), name)
    }
}

impl ExtensionResolver for GlobalRegistry {
    fn find_extension_by_number(
        &self,
        message: &str,
        number: i32,
    ) -> Result<ExtensionDescriptor, LookupError> {
        DescriptorPool::global().find_extension_by_number(message, number)
    }

    fn extension_numbers(&self, message: &str) -> Vec<i32> {
        DescriptorPool::global().extension_numbers(message)
    }
}

impl DescriptorResolver for DescriptorPool {
    fn find_file_by_path(&self, path: &str) -> Result<FileDescriptor, LookupError> {
        self.get_file_by_name(path)
            .ok_or_else(|| LookupError::FileNotFound(path.to_string()))
    }

    fn find_file_containing_symbol(&self, name: &str) -> Result<FileDescriptor, LookupError> {
        file_containing_symbol(self, name)
            .ok_or_else(|| LookupError::SymbolNotFound(name.to_string()))
    }
}

impl ExtensionResolver for DescriptorPool {
    fn find_extension_by_number(
        &self,
        message: &str,
        number: i32,
    ) -> Result<ExtensionDescriptor, LookupError> {
        let not_found = || LookupError::ExtensionNotFound {
            message: message.to_string(),
            number,
        };
        let number = u32::try_from(number).map_err(|_| not_found())?;

        self.all_extensions()
            .find(|ext| ext.number() == number && ext.containing_message().full_name() == message)
            .ok_or_else(not_found)
    }

    fn extension_numbers(&self, message: &str) -> Vec<i32> {
        self.all_extensions()
            .filter(|ext| ext.containing_message().full_name() == message)
            .filter_map(|ext| i32::try_from(ext.number()).ok())
            .collect()
    }
}

impl<R: DescriptorResolver + ?Sized> DescriptorResolver for Arc<R> {
    fn find_file_by_path(&self, path: &str) -> Result<FileDescriptor, LookupError> {
        (**self).find_file_by_path(path)
    }

    fn find_file_containing_symbol(&self, name: &str) -> Result<FileDescriptor, LookupError> {
        (**self).find_file_containing_symbol(name)
    }
}

impl<R: ExtensionResolver + ?Sized> ExtensionResolver for Arc<R> {
    fn find_extension_by_number(
        &self,
        message: &str,
        number: i32,
    ) -> Result<ExtensionDescriptor, LookupError> {
        (**self).find_extension_by_number(message, number)
    }

    fn extension_numbers(&self, message: &str) -> Vec<i32> {
        (**self).extension_numbers(message)
    }
}

fn file_containing_symbol(pool: &DescriptorPool, name: &str) -> Option<FileDescriptor> {
    if let Some(message) = pool.get_message_by_name(name) {
        return Some(message.parent_file());
    }
    if let Some(enum_) = pool.get_enum_by_name(name) {
        return Some(enum_.parent_file());
    }
    if let Some(service) = pool.get_service_by_name(name) {
        return Some(service.parent_file());
    }
    if let Some(extension) = pool.get_extension_by_name(name) {
        return Some(extension.parent_file());
    }

    // Members: methods of a service, fields and oneofs of a message.
    if let Some((parent, member)) = name.rsplit_once('.') {
        if let Some(service) = pool.get_service_by_name(parent) {
            if service.methods().any(|method| method.name() == member) {
                return Some(service.parent_file());
            }
        }
        if let Some(message) = pool.get_message_by_name(parent) {
            if message.get_field_by_name(member).is_some()
                || message.oneofs().any(|oneof| oneof.name() == member)
            {
                return Some(message.parent_file());
            }
        }
    }

    pool.all_enums()
        .find(|enum_| enum_.values().any(|value| value.full_name() == name))
        .map(|enum_| enum_.parent_file())
}
