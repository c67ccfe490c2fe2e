//! # grpcreflect
//!
//! gRPC server reflection for tonic: a server side that answers
//! `grpc.reflection.v1` and `grpc.reflection.v1alpha` streams, and a client
//! side for asking other servers what they expose.
//!
//! Like the rest of tonic, it extends native code with chainable methods
//! rather than wrapping it.
//!
//! ## Server
//!
//! ```ignore
//! use grpcreflect::{Reflector, RouterExt, ServerExt};
//! use tonic::transport::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Descriptors for your own services must be in the process-wide pool.
//!     prost_reflect::DescriptorPool::decode_global_file_descriptor_set(USERS_DESCRIPTOR_SET)?;
//!
//!     let reflector = Reflector::with_static_names([
//!         "acme.user.v1.UserService",
//!         "grpc.reflection.v1.ServerReflection",
//!     ]);
//!
//!     Server::builder()
//!         .add_reflection(&reflector)
//!         .add_service(UserServiceServer::new(users))
//!         .serve_at("[::1]:50051".parse()?)
//!         .await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Client
//!
//! ```ignore
//! use grpcreflect::{ClientConfig, ReflectionClient, StreamOptions};
//!
//! let config = ClientConfig::builder().endpoint("http://[::1]:50051").build()?;
//! let mut client = ReflectionClient::connect(&config).await?;
//! let stream = client.open_stream(StreamOptions::from(&config)).await?;
//!
//! let services = stream.list_services().await?;
//! let files = stream.file_containing_symbol(&services[0]).await?;
//! stream.close().await?;
//! ```
//!
//! ## Features
//!
//! - `tracing` - logging initialization (default)
//! - `health` - bundle the `grpc.health.v1` schema and expose
//!   [`health_service`] (default)
//! - `full` - all of the above

pub mod bundled;
mod channel;
pub mod client;
pub mod closure;
pub mod config;
mod error;
mod logging;
pub mod mangle;
pub mod reflector;
pub mod registry;
mod server;
pub mod service;
pub mod shim;

#[cfg(test)]
mod testing;

pub use channel::ChannelExt;
pub use client::{ReflectionClient, ReflectionError, ReflectionStream, StreamOptions};
pub use closure::{file_with_dependencies, ClosureError, SchemaFile, SentFiles};
pub use config::{
    ClientConfig, ClientConfigBuilder, ConfigBuilder, ConfigError, Environment,
    ReflectionServerConfig,
};
pub use error::{Error, GrpcError, ServerError};
pub use reflector::{Reflector, Session};
pub use registry::{
    DescriptorResolver, ExtensionResolver, GlobalRegistry, LookupError, Namer, StaticNames,
};
pub use server::{shutdown_signal, RouterExt, ServerExt};
pub use service::{ProtocolVersion, ReflectionService, ReflectionServiceV1Alpha};
pub use shim::{global_files, UnmanglingResolver};

#[cfg(feature = "health")]
pub use server::health_service;

pub use logging::LogFormat;
#[cfg(feature = "tracing")]
pub use logging::{init_logging, init_logging_from_env};

pub use tonic::{Code, Status};
