//! Reflection session dispatch.
//!
//! A [`Reflector`] holds the shared, read-only lookup capabilities. Every
//! stream gets its own [`Session`], which answers queries one at a time and
//! remembers which files it already sent.

use std::fmt;
use std::sync::Arc;

use prost_reflect::{DescriptorPool, FileDescriptor};
use tonic::Status;
use tonic_reflection::pb::v1::{
    server_reflection_request::MessageRequest, server_reflection_response::MessageResponse,
    ExtensionNumberResponse, ExtensionRequest, FileDescriptorResponse, ListServiceResponse,
    ServerReflectionRequest, ServerReflectionResponse, ServiceResponse,
};

use crate::closure::{file_with_dependencies, ClosureError, SentFiles};
use crate::error::GrpcError;
use crate::registry::{
    DescriptorResolver, ExtensionResolver, GlobalRegistry, LookupError, Namer, StaticNames,
};
use crate::shim;

/// Answers reflection queries for a server.
///
/// Cheap to clone; clones share the same resolvers.
///
/// # Example
///
/// ```ignore
/// use grpcreflect::{Reflector, ServerExt};
/// use tonic::transport::Server;
///
/// let reflector = Reflector::with_static_names([
///     "acme.user.v1.UserService",
///     "grpc.reflection.v1.ServerReflection",
/// ]);
///
/// Server::builder()
///     .add_reflection(&reflector)
///     .add_service(UserServiceServer::new(users))
///     .serve(addr)
///     .await?;
/// ```
#[derive(Clone)]
pub struct Reflector {
    namer: Arc<dyn Namer>,
    descriptors: Arc<dyn DescriptorResolver>,
    extensions: Arc<dyn ExtensionResolver>,
}

impl Reflector {
    /// Resolve against the process-wide pool, with the bundled well-known
    /// descriptors visible under their public names.
    pub fn new(namer: impl Namer + 'static) -> Self {
        Self {
            namer: Arc::new(namer),
            descriptors: shim::global_files(),
            extensions: Arc::new(GlobalRegistry),
        }
    }

    /// Advertise a fixed list of services, in the given order.
    pub fn with_static_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(StaticNames::new(names))
    }

    pub fn with_descriptor_resolver(mut self, resolver: impl DescriptorResolver + 'static) -> Self {
        self.descriptors = Arc::new(resolver);
        self
    }

    pub fn with_extension_resolver(mut self, resolver: impl ExtensionResolver + 'static) -> Self {
        self.extensions = Arc::new(resolver);
        self
    }

    /// Resolve files and extensions from `pool` only.
    pub fn with_descriptor_pool(self, pool: DescriptorPool) -> Self {
        self.with_descriptor_resolver(pool.clone())
            .with_extension_resolver(pool)
    }

    /// Start a session with nothing sent yet.
    pub fn session(&self) -> Session {
        Session {
            reflector: self.clone(),
            sent: SentFiles::new(),
        }
    }

    /// The advertised service names.
    pub fn names(&self) -> Vec<String> {
        self.namer.names()
    }
}

impl fmt::Debug for Reflector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reflector").finish_non_exhaustive()
    }
}

#[derive(Debug, thiserror::Error)]
enum DispatchError {
    #[error(transparent)]
    Lookup(#[from] LookupError),
    #[error(transparent)]
    Closure(#[from] ClosureError),
}

/// State of one reflection stream.
#[derive(Debug)]
pub struct Session {
    reflector: Reflector,
    sent: SentFiles,
}

impl Session {
    pub fn sent_files(&self) -> &SentFiles {
        &self.sent
    }

    /// Answer one request.
    ///
    /// Lookups that find nothing are answered in-band with a `NOT_FOUND`
    /// error response. An `Err` means the session must end: the request had
    /// no recognised query, or a file could not be encoded.
    pub fn handle(
        &mut self,
        request: ServerReflectionRequest,
    ) -> Result<ServerReflectionResponse, Status> {
        let Some(query) = request.message_request.clone() else {
            tracing::warn!(host = %request.host, "reflection request has no recognised query");
            return Err(Status::invalid_argument(
                "reflection request has no recognised message_request",
            ));
        };

        tracing::trace!(query = query_kind(&query), "dispatching reflection query");
        let message_response = match self.dispatch(query) {
            Ok(response) => response,
            Err(DispatchError::Lookup(err)) => {
                tracing::debug!(error = %err, "reflection lookup failed");
                MessageResponse::ErrorResponse(err.to_error_response())
            }
            Err(DispatchError::Closure(err)) => {
                tracing::error!(error = %err, "failed to encode file descriptors");
                return Err(err.into_status());
            }
        };

        Ok(ServerReflectionResponse {
            valid_host: request.host.clone(),
            original_request: Some(request),
            message_response: Some(message_response),
        })
    }

    fn dispatch(&mut self, query: MessageRequest) -> Result<MessageResponse, DispatchError> {
        let reflector = &self.reflector;
        match query {
            MessageRequest::ListServices(_) => {
                let service = reflector
                    .names()
                    .into_iter()
                    .map(|name| ServiceResponse { name })
                    .collect();
                Ok(MessageResponse::ListServicesResponse(ListServiceResponse {
                    service,
                }))
            }
            MessageRequest::FileByFilename(path) => {
                let file = reflector.descriptors.find_file_by_path(&path)?;
                self.files_response(&file)
            }
            MessageRequest::FileContainingSymbol(symbol) => {
                let file = reflector.descriptors.find_file_containing_symbol(&symbol)?;
                self.files_response(&file)
            }
            MessageRequest::FileContainingExtension(ExtensionRequest {
                containing_type,
                extension_number,
            }) => {
                let extension = reflector
                    .extensions
                    .find_extension_by_number(&containing_type, extension_number)?;
                self.files_response(&extension.parent_file())
            }
            MessageRequest::AllExtensionNumbersOfType(base_type_name) => {
                let mut extension_number = reflector.extensions.extension_numbers(&base_type_name);
                if extension_number.is_empty() {
                    return Err(LookupError::NoExtensions(base_type_name).into());
                }
                extension_number.sort_unstable();
                Ok(MessageResponse::AllExtensionNumbersResponse(
                    ExtensionNumberResponse {
                        base_type_name,
                        extension_number,
                    },
                ))
            }
        }
    }

    fn files_response(&mut self, file: &FileDescriptor) -> Result<MessageResponse, DispatchError> {
        let file_descriptor_proto = file_with_dependencies(file, &mut self.sent)?;
        Ok(MessageResponse::FileDescriptorResponse(
            FileDescriptorResponse {
                file_descriptor_proto,
            },
        ))
    }
}

fn query_kind(query: &MessageRequest) -> &'static str {
    match query {
        MessageRequest::FileByFilename(_) => "file_by_filename",
        MessageRequest::FileContainingSymbol(_) => "file_containing_symbol",
        MessageRequest::FileContainingExtension(_) => "file_containing_extension",
        MessageRequest::AllExtensionNumbersOfType(_) => "all_extension_numbers_of_type",
        MessageRequest::ListServices(_) => "list_services",
    }
}
