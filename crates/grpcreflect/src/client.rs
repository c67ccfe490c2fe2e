//! Reflection client.
//!
//! The protocol has no request ids: responses are matched to requests purely
//! by order. [`ReflectionStream`] therefore holds a lock across each whole
//! send and receive, so concurrent callers take turns and there is no
//! pipelining.

use http::uri::PathAndQuery;
use prost::Message;
use prost_types::FileDescriptorProto;
use tokio::sync::{mpsc, Mutex};
use tokio_stream::wrappers::ReceiverStream;
use tonic::body::BoxBody;
use tonic::client::GrpcService;
use tonic::codec::ProstCodec;
use tonic::codegen::{Body, Bytes, StdError};
use tonic::metadata::MetadataMap;
use tonic::transport::Channel;
use tonic::{Code, Status, Streaming};
use tonic_reflection::pb::v1::{
    server_reflection_request::MessageRequest, server_reflection_response::MessageResponse,
    ExtensionRequest, ServerReflectionRequest, ServerReflectionResponse,
};

use crate::channel::ChannelExt;
use crate::config::ClientConfig;
use crate::error::{Error, GrpcError};
use crate::service::ProtocolVersion;

/// Why a reflection call failed.
#[derive(Debug, thiserror::Error)]
pub enum ReflectionError {
    /// Sending or receiving failed, or the server ended the stream. The
    /// stream is no longer usable.
    #[error("reflection stream broken: {0}")]
    StreamBroken(Status),
    /// The server answered with an error response. The stream is still
    /// usable.
    #[error("reflection request rejected ({code:?}): {message}")]
    Rejected { code: Code, message: String },
    #[error("{operation} got an unexpected {found} response")]
    UnexpectedResponse {
        operation: &'static str,
        found: &'static str,
    },
    /// A returned file descriptor could not be decoded. The stream is still
    /// usable.
    #[error("{operation} returned an invalid file descriptor: {source}")]
    InvalidDescriptor {
        operation: &'static str,
        #[source]
        source: prost::DecodeError,
    },
}

impl ReflectionError {
    pub fn is_stream_broken(&self) -> bool {
        matches!(self, Self::StreamBroken(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Rejected { code: Code::NotFound, .. })
    }
}

impl GrpcError for ReflectionError {
    fn code(&self) -> Code {
        match self {
            Self::StreamBroken(status) => status.code(),
            Self::Rejected { code, .. } => *code,
            Self::UnexpectedResponse { .. } | Self::InvalidDescriptor { .. } => Code::Internal,
        }
    }
}

/// Per-stream options.
#[derive(Debug, Clone, Default)]
pub struct StreamOptions {
    host: String,
    metadata: MetadataMap,
}

impl StreamOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reflection host sent with every request; servers may route on it.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Request headers for the stream.
    pub fn metadata(mut self, metadata: MetadataMap) -> Self {
        self.metadata = metadata;
        self
    }
}

impl From<&ClientConfig> for StreamOptions {
    fn from(config: &ClientConfig) -> Self {
        Self::new().host(config.reflection_host.clone().unwrap_or_default())
    }
}

/// Opens reflection streams over a gRPC transport.
///
/// `T` is usually a [`Channel`], but any [`GrpcService`] works, including a
/// server type used in-process.
///
/// # Example
///
/// ```ignore
/// use grpcreflect::{ReflectionClient, StreamOptions};
///
/// let mut client = ReflectionClient::new(channel);
/// let stream = client.open_stream(StreamOptions::new()).await?;
///
/// for service in stream.list_services().await? {
///     let files = stream.file_containing_symbol(&service).await?;
///     println!("{service}: {} files", files.len());
/// }
/// stream.close().await?;
/// ```
#[derive(Debug, Clone)]
pub struct ReflectionClient<T> {
    inner: tonic::client::Grpc<T>,
    version: ProtocolVersion,
}

impl ReflectionClient<Channel> {
    /// Connect using `config`, speaking the configured protocol version.
    pub async fn connect(config: &ClientConfig) -> Result<Self, Error> {
        let channel = Channel::connect(config).await?;
        Ok(Self::with_version(channel, config.version))
    }
}

impl<T> ReflectionClient<T>
where
    T: GrpcService<BoxBody>,
    T::Error: Into<StdError>,
    T::ResponseBody: Body<Data = Bytes> + Send + 'static,
    <T::ResponseBody as Body>::Error: Into<StdError> + Send,
{
    /// A client for the v1 protocol.
    pub fn new(inner: T) -> Self {
        Self::with_version(inner, ProtocolVersion::V1)
    }

    /// A client for the legacy v1alpha protocol.
    pub fn new_v1alpha(inner: T) -> Self {
        Self::with_version(inner, ProtocolVersion::V1Alpha)
    }

    pub fn with_version(inner: T, version: ProtocolVersion) -> Self {
        Self {
            inner: tonic::client::Grpc::new(inner),
            version,
        }
    }

    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    /// Start a reflection stream.
    pub async fn open_stream(
        &mut self,
        options: StreamOptions,
    ) -> Result<ReflectionStream, ReflectionError> {
        self.inner.ready().await.map_err(|err| {
            ReflectionError::StreamBroken(Status::unknown(format!(
                "service was not ready: {}",
                err.into()
            )))
        })?;

        let (requests, rx) = mpsc::channel(1);
        let mut request = tonic::Request::new(ReceiverStream::new(rx));
        *request.metadata_mut() = options.metadata;

        // v1alpha shares the v1 message shape, so the v1 codec serves both.
        let codec = ProstCodec::<ServerReflectionRequest, ServerReflectionResponse>::default();
        let path = PathAndQuery::from_static(self.version.path());
        let response = self
            .inner
            .streaming(request, path, codec)
            .await
            .map_err(ReflectionError::StreamBroken)?;
        let (response_headers, responses, _) = response.into_parts();

        tracing::debug!(version = %self.version, "reflection stream opened");
        Ok(ReflectionStream {
            host: options.host,
            response_headers,
            state: Mutex::new(StreamState {
                requests: Some(requests),
                responses,
                in_flight: false,
            }),
        })
    }
}

struct StreamState {
    /// `None` once the request side is closed.
    requests: Option<mpsc::Sender<ServerReflectionRequest>>,
    responses: Streaming<ServerReflectionResponse>,
    /// A request was sent and its response not yet read, because the
    /// caller's future was dropped in between.
    in_flight: bool,
}

impl StreamState {
    async fn receive(
        &mut self,
        operation: &'static str,
    ) -> Result<ServerReflectionResponse, ReflectionError> {
        match self.responses.message().await {
            Ok(Some(response)) => Ok(response),
            Ok(None) => Err(ReflectionError::StreamBroken(Status::unavailable(
                "reflection stream ended before a response arrived",
            ))),
            Err(status) => {
                tracing::debug!(operation, code = ?status.code(), "reflection stream failed");
                Err(ReflectionError::StreamBroken(status))
            }
        }
    }
}

/// One open reflection stream.
///
/// Methods take `&self` and may be called from several tasks; each call
/// waits for the previous exchange to finish.
pub struct ReflectionStream {
    host: String,
    response_headers: MetadataMap,
    state: Mutex<StreamState>,
}

impl std::fmt::Debug for ReflectionStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReflectionStream")
            .field("host", &self.host)
            .finish_non_exhaustive()
    }
}

impl ReflectionStream {
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Headers the server sent when the stream opened.
    pub fn response_headers(&self) -> &MetadataMap {
        &self.response_headers
    }

    /// Fully-qualified names of the services the server advertises.
    pub async fn list_services(&self) -> Result<Vec<String>, ReflectionError> {
        const OPERATION: &str = "list_services";

        match self
            .exchange(OPERATION, MessageRequest::ListServices(String::new()))
            .await?
        {
            MessageResponse::ListServicesResponse(list) => {
                Ok(list.service.into_iter().map(|s| s.name).collect())
            }
            other => Err(unexpected(OPERATION, &other)),
        }
    }

    /// The file at `path` plus the imports not yet sent on this stream.
    pub async fn file_by_filename(
        &self,
        path: &str,
    ) -> Result<Vec<FileDescriptorProto>, ReflectionError> {
        const OPERATION: &str = "file_by_filename";

        let response = self
            .exchange(OPERATION, MessageRequest::FileByFilename(path.to_string()))
            .await?;
        decode_files(OPERATION, response)
    }

    /// The file declaring `symbol` plus the imports not yet sent.
    pub async fn file_containing_symbol(
        &self,
        symbol: &str,
    ) -> Result<Vec<FileDescriptorProto>, ReflectionError> {
        const OPERATION: &str = "file_containing_symbol";

        let response = self
            .exchange(
                OPERATION,
                MessageRequest::FileContainingSymbol(symbol.to_string()),
            )
            .await?;
        decode_files(OPERATION, response)
    }

    /// The file declaring extension `number` of `message` plus the imports
    /// not yet sent.
    pub async fn file_containing_extension(
        &self,
        message: &str,
        number: i32,
    ) -> Result<Vec<FileDescriptorProto>, ReflectionError> {
        const OPERATION: &str = "file_containing_extension";

        let response = self
            .exchange(
                OPERATION,
                MessageRequest::FileContainingExtension(ExtensionRequest {
                    containing_type: message.to_string(),
                    extension_number: number,
                }),
            )
            .await?;
        decode_files(OPERATION, response)
    }

    /// Field numbers of every known extension of `message`, ascending.
    pub async fn all_extension_numbers(&self, message: &str) -> Result<Vec<i32>, ReflectionError> {
        const OPERATION: &str = "all_extension_numbers";

        match self
            .exchange(
                OPERATION,
                MessageRequest::AllExtensionNumbersOfType(message.to_string()),
            )
            .await?
        {
            MessageResponse::AllExtensionNumbersResponse(numbers) => Ok(numbers.extension_number),
            other => Err(unexpected(OPERATION, &other)),
        }
    }

    /// Close the request side, then drain the response side.
    ///
    /// Returns the server's trailers. Draining is attempted even if the
    /// request side was already closed.
    pub async fn close(&self) -> Result<Option<MetadataMap>, ReflectionError> {
        let mut state = self.state.lock().await;
        drop(state.requests.take());
        let trailers = state
            .responses
            .trailers()
            .await
            .map_err(ReflectionError::StreamBroken)?;
        tracing::debug!("reflection stream closed");
        Ok(trailers)
    }

    /// One request and its response, under the stream lock.
    ///
    /// A response left unread by a dropped call is discarded first, so
    /// every caller reads the answer to its own request.
    async fn exchange(
        &self,
        operation: &'static str,
        query: MessageRequest,
    ) -> Result<MessageResponse, ReflectionError> {
        let mut state = self.state.lock().await;

        if state.in_flight {
            state.receive(operation).await?;
            state.in_flight = false;
            tracing::debug!(operation, "discarded the answer to a cancelled request");
        }

        let requests = state.requests.as_ref().ok_or_else(|| {
            ReflectionError::StreamBroken(Status::failed_precondition(
                "reflection stream is closed",
            ))
        })?;
        let request = ServerReflectionRequest {
            host: self.host.clone(),
            message_request: Some(query),
        };
        if requests.send(request).await.is_err() {
            return Err(ReflectionError::StreamBroken(Status::unavailable(
                "reflection stream closed before the request was sent",
            )));
        }

        state.in_flight = true;
        let response = state.receive(operation).await?;
        state.in_flight = false;

        match response.message_response {
            Some(MessageResponse::ErrorResponse(err)) => Err(ReflectionError::Rejected {
                code: Code::from_i32(err.error_code),
                message: err.error_message,
            }),
            Some(response) => Ok(response),
            None => Err(ReflectionError::UnexpectedResponse {
                operation,
                found: "empty",
            }),
        }
    }
}

fn decode_files(
    operation: &'static str,
    response: MessageResponse,
) -> Result<Vec<FileDescriptorProto>, ReflectionError> {
    let MessageResponse::FileDescriptorResponse(files) = response else {
        return Err(unexpected(operation, &response));
    };
    files
        .file_descriptor_proto
        .iter()
        .map(|bytes| FileDescriptorProto::decode(bytes.as_slice()))
        .collect::<Result<_, _>>()
        .map_err(|source| ReflectionError::InvalidDescriptor { operation, source })
}

fn unexpected(operation: &'static str, response: &MessageResponse) -> ReflectionError {
    let found = match response {
        MessageResponse::FileDescriptorResponse(_) => "file_descriptor_response",
        MessageResponse::AllExtensionNumbersResponse(_) => "all_extension_numbers_response",
        MessageResponse::ListServicesResponse(_) => "list_services_response",
        MessageResponse::ErrorResponse(_) => "error_response",
    };
    ReflectionError::UnexpectedResponse { operation, found }
}
