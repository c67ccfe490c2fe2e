//! tonic services for both reflection protocol versions.

use std::fmt;
use std::pin::Pin;
use std::str::FromStr;

use prost::Message;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};
use tonic::{Request, Response, Status, Streaming};
use tonic_reflection::pb::{v1, v1alpha};
use tracing::Instrument;

use crate::reflector::{Reflector, Session};

type ResponseResult = Result<v1::ServerReflectionResponse, Status>;

/// Reflection protocol version. Both share one message shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolVersion {
    #[default]
    V1,
    V1Alpha,
}

impl ProtocolVersion {
    /// Fully-qualified name of the reflection service.
    pub fn service_name(&self) -> &'static str {
        match self {
            Self::V1 => crate::bundled::REFLECTION_V1_SERVICE,
            Self::V1Alpha => crate::bundled::REFLECTION_V1ALPHA_SERVICE,
        }
    }

    /// HTTP/2 path of the `ServerReflectionInfo` method.
    pub fn path(&self) -> &'static str {
        match self {
            Self::V1 => "/grpc.reflection.v1.ServerReflection/ServerReflectionInfo",
            Self::V1Alpha => "/grpc.reflection.v1alpha.ServerReflection/ServerReflectionInfo",
        }
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V1 => f.write_str("v1"),
            Self::V1Alpha => f.write_str("v1alpha"),
        }
    }
}

impl FromStr for ProtocolVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "v1" => Ok(Self::V1),
            "v1alpha" => Ok(Self::V1Alpha),
            other => Err(format!("unknown reflection protocol version: {other}")),
        }
    }
}

/// `grpc.reflection.v1.ServerReflection` backed by a [`Reflector`].
#[derive(Debug, Clone)]
pub struct ReflectionService {
    reflector: Reflector,
}

/// `grpc.reflection.v1alpha.ServerReflection` backed by a [`Reflector`].
#[derive(Debug, Clone)]
pub struct ReflectionServiceV1Alpha {
    reflector: Reflector,
}

impl Reflector {
    pub fn v1_service(&self) -> v1::server_reflection_server::ServerReflectionServer<ReflectionService> {
        v1::server_reflection_server::ServerReflectionServer::new(ReflectionService {
            reflector: self.clone(),
        })
    }

    pub fn v1alpha_service(
        &self,
    ) -> v1alpha::server_reflection_server::ServerReflectionServer<ReflectionServiceV1Alpha> {
        v1alpha::server_reflection_server::ServerReflectionServer::new(ReflectionServiceV1Alpha {
            reflector: self.clone(),
        })
    }
}

#[tonic::async_trait]
impl v1::server_reflection_server::ServerReflection for ReflectionService {
    type ServerReflectionInfoStream = ReceiverStream<ResponseResult>;

    async fn server_reflection_info(
        &self,
        request: Request<Streaming<v1::ServerReflectionRequest>>,
    ) -> Result<Response<Self::ServerReflectionInfoStream>, Status> {
        let responses = spawn_session(
            self.reflector.session(),
            ProtocolVersion::V1,
            request.into_inner(),
        );
        Ok(Response::new(responses))
    }
}

#[tonic::async_trait]
impl v1alpha::server_reflection_server::ServerReflection for ReflectionServiceV1Alpha {
    type ServerReflectionInfoStream = Pin<
        Box<dyn Stream<Item = Result<v1alpha::ServerReflectionResponse, Status>> + Send + 'static>,
    >;

    async fn server_reflection_info(
        &self,
        request: Request<Streaming<v1alpha::ServerReflectionRequest>>,
    ) -> Result<Response<Self::ServerReflectionInfoStream>, Status> {
        let requests = request.into_inner().map(|item| {
            item.and_then(|request| transcode::<_, v1::ServerReflectionRequest>(&request))
        });
        let responses = spawn_session(self.reflector.session(), ProtocolVersion::V1Alpha, requests)
            .map(|item| {
                item.and_then(|response| {
                    transcode::<_, v1alpha::ServerReflectionResponse>(&response)
                })
            });
        let responses: Self::ServerReflectionInfoStream = Box::pin(responses);
        Ok(Response::new(responses))
    }
}

/// Re-type a message between the two versions' identical wire shapes.
fn transcode<A: Message, B: Message + Default>(message: &A) -> Result<B, Status> {
    B::decode(message.encode_to_vec().as_slice())
        .map_err(|err| Status::internal(format!("failed to transcode reflection message: {err}")))
}

/// Run `session` over `requests` on its own task.
pub(crate) fn spawn_session<S>(
    session: Session,
    version: ProtocolVersion,
    requests: S,
) -> ReceiverStream<ResponseResult>
where
    S: Stream<Item = Result<v1::ServerReflectionRequest, Status>> + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(4);
    let span = tracing::debug_span!("reflection_session", version = %version);
    tokio::spawn(run_session(session, requests, tx).instrument(span));
    ReceiverStream::new(rx)
}

/// Receive, dispatch and reply, strictly one request at a time.
///
/// Ends on end of input, on an inbound transport error (forwarded to the
/// peer), after a fatal dispatch error, or when the peer stops reading.
async fn run_session<S>(
    mut session: Session,
    mut requests: S,
    responses: mpsc::Sender<ResponseResult>,
) where
    S: Stream<Item = Result<v1::ServerReflectionRequest, Status>> + Unpin,
{
    tracing::debug!("reflection session opened");

    while let Some(request) = requests.next().await {
        let request = match request {
            Ok(request) => request,
            Err(status) => {
                tracing::debug!(code = ?status.code(), "reflection stream failed");
                let _ = responses.send(Err(status)).await;
                break;
            }
        };

        let response = session.handle(request);
        let fatal = response.is_err();
        if responses.send(response).await.is_err() {
            tracing::debug!("reflection client stopped reading");
            break;
        }
        if fatal {
            break;
        }
    }

    tracing::debug!(files_sent = session.sent_files().len(), "reflection session closed");
}
