//! Error handling utilities for gRPC reflection.

use tonic::{Code, Status};
use tonic_reflection::pb::v1::ErrorResponse;

use crate::config::ConfigError;

/// Trait for errors that map onto a gRPC status code.
///
/// Reflection answers most failures in-band, inside the response stream, so
/// besides building a [`Status`] an implementor can also be rendered as the
/// protocol's `ErrorResponse` message.
///
/// # Example
///
/// ```ignore
/// use grpcreflect::GrpcError;
/// use tonic::Code;
///
/// #[derive(Debug, thiserror::Error)]
/// #[error("unknown tenant {0}")]
/// struct UnknownTenant(String);
///
/// impl GrpcError for UnknownTenant {
///     fn code(&self) -> Code {
///         Code::NotFound
///     }
/// }
///
/// let response = UnknownTenant("acme".into()).to_error_response();
/// assert_eq!(response.error_code, Code::NotFound as i32);
/// ```
pub trait GrpcError: std::error::Error {
    fn code(&self) -> Code;

    fn into_status(self) -> Status
    where
        Self: Sized,
    {
        Status::new(self.code(), self.to_string())
    }

    fn to_error_response(&self) -> ErrorResponse {
        ErrorResponse {
            error_code: self.code() as i32,
            error_message: self.to_string(),
        }
    }
}

/// Crate-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("Server error: {0}")]
    Server(#[from] ServerError),
}

impl From<tonic::transport::Error> for Error {
    fn from(err: tonic::transport::Error) -> Self {
        Self::Connection(err.to_string())
    }
}

/// Server-specific errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Invalid address: {0}")]
    InvalidAddress(#[from] std::net::AddrParseError),
    #[error("Transport error: {0}")]
    Transport(#[from] tonic::transport::Error),
}
