//! Transitive import closure of a file, deduplicated against a session.

use std::collections::{HashSet, VecDeque};

use prost::{EncodeError, Message};
use prost_reflect::FileDescriptor;
use tonic::Code;

use crate::error::GrpcError;

/// A file could not be turned into bytes for the response.
#[derive(Debug, thiserror::Error)]
pub enum ClosureError {
    #[error("failed to encode {file}: {source}")]
    Encode {
        file: String,
        #[source]
        source: EncodeError,
    },
    #[error("{0} is a placeholder and has no content to send")]
    Placeholder(String),
}

impl GrpcError for ClosureError {
    fn code(&self) -> Code {
        Code::Internal
    }
}

/// The view of a schema file that the closure walk needs.
///
/// Implemented for [`prost_reflect::FileDescriptor`]. A proxying resolver
/// can implement it for its own file type, including placeholders for
/// imports whose contents it does not have.
pub trait SchemaFile: Sized {
    /// Unique path-like identifier, e.g. `acme/user/v1/user.proto`.
    fn name(&self) -> &str;

    /// Referenced but unavailable: never encoded, imports never followed.
    fn is_placeholder(&self) -> bool {
        false
    }

    /// Direct imports, in declaration order.
    fn imports(&self) -> Vec<Self>;

    fn encode(&self) -> Result<Vec<u8>, EncodeError>;
}

impl SchemaFile for FileDescriptor {
    fn name(&self) -> &str {
        FileDescriptor::name(self)
    }

    fn imports(&self) -> Vec<Self> {
        self.dependencies().collect()
    }

    fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        let proto = self.file_descriptor_proto();
        let mut buf = Vec::with_capacity(proto.encoded_len());
        proto.encode(&mut buf)?;
        Ok(buf)
    }
}

/// Paths of the files already transmitted on one reflection stream.
///
/// Insert-only; a path is present iff its bytes went out on this stream.
#[derive(Debug, Clone, Default)]
pub struct SentFiles {
    names: HashSet<String>,
}

impl SentFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Encode `root` followed by every import reachable from it that the peer
/// does not have yet, breadth-first.
///
/// `root` is always encoded, even when it was sent before. Imports already
/// in `sent` are skipped along with their own imports, and placeholders are
/// skipped entirely. On error nothing is added to `sent`.
pub fn file_with_dependencies<F: SchemaFile>(
    root: &F,
    sent: &mut SentFiles,
) -> Result<Vec<Vec<u8>>, ClosureError> {
    if root.is_placeholder() {
        return Err(ClosureError::Placeholder(root.name().to_string()));
    }

    let mut encoded = vec![encode(root)?];
    let mut newly_sent = HashSet::from([root.name().to_string()]);
    let mut queue: VecDeque<F> = root.imports().into();

    while let Some(file) = queue.pop_front() {
        if file.is_placeholder()
            || sent.contains(file.name())
            || newly_sent.contains(file.name())
        {
            continue;
        }
        encoded.push(encode(&file)?);
        newly_sent.insert(file.name().to_string());
        queue.extend(file.imports());
    }

    sent.names.extend(newly_sent);
    Ok(encoded)
}

fn encode<F: SchemaFile>(file: &F) -> Result<Vec<u8>, ClosureError> {
    file.encode().map_err(|source| ClosureError::Encode {
        file: file.name().to_string(),
        source,
    })
}
