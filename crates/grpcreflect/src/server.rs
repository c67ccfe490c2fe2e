//! Extension traits wiring reflection into tonic servers.

use std::net::SocketAddr;

use tonic::transport::server::Router;
use tonic::transport::Server;

use crate::config::ReflectionServerConfig;
use crate::error::ServerError;
use crate::reflector::Reflector;

/// Adds reflection to a `tonic::transport::Server`.
pub trait ServerExt<L> {
    /// Serve `reflector` at both the v1 and v1alpha paths.
    fn add_reflection(&mut self, reflector: &Reflector) -> Router<L>;

    /// Serve `reflector` at the v1 path only.
    fn add_reflection_v1(&mut self, reflector: &Reflector) -> Router<L>;

    /// Serve the reflector described by `config`, at the paths it enables.
    fn add_reflection_from(&mut self, config: &ReflectionServerConfig) -> Router<L>;
}

impl<L: Clone> ServerExt<L> for Server<L> {
    fn add_reflection(&mut self, reflector: &Reflector) -> Router<L> {
        self.add_reflection_v1(reflector)
            .add_service(reflector.v1alpha_service())
    }

    fn add_reflection_v1(&mut self, reflector: &Reflector) -> Router<L> {
        self.add_service(reflector.v1_service())
    }

    fn add_reflection_from(&mut self, config: &ReflectionServerConfig) -> Router<L> {
        let reflector = config.reflector();
        if config.serve_v1alpha {
            self.add_reflection(&reflector)
        } else {
            self.add_reflection_v1(&reflector)
        }
    }
}

/// Extension trait for `tonic::transport::server::Router`.
pub trait RouterExt<L>: Sized {
    /// Serve `reflector` at both the v1 and v1alpha paths.
    fn add_reflection(self, reflector: &Reflector) -> Self;

    /// Serve at the configured address until SIGINT or SIGTERM.
    fn serve_with(
        self,
        config: &(impl AsRef<ReflectionServerConfig> + Sync),
    ) -> impl std::future::Future<Output = Result<(), ServerError>> + Send;

    /// Serve at `addr` until SIGINT or SIGTERM.
    fn serve_at(
        self,
        addr: SocketAddr,
    ) -> impl std::future::Future<Output = Result<(), ServerError>> + Send;
}

impl<L> RouterExt<L> for Router<L>
where
    L: tower::Layer<tonic::service::Routes> + Clone + Send + 'static,
    L::Service: tower::Service<
            http::Request<tonic::body::BoxBody>,
            Response = http::Response<tonic::body::BoxBody>,
        > + Clone
        + Send
        + 'static,
    <L::Service as tower::Service<http::Request<tonic::body::BoxBody>>>::Future: Send + 'static,
    <L::Service as tower::Service<http::Request<tonic::body::BoxBody>>>::Error:
        Into<Box<dyn std::error::Error + Send + Sync>> + Send,
{
    fn add_reflection(self, reflector: &Reflector) -> Self {
        self.add_service(reflector.v1_service())
            .add_service(reflector.v1alpha_service())
    }

    async fn serve_with(
        self,
        config: &(impl AsRef<ReflectionServerConfig> + Sync),
    ) -> Result<(), ServerError> {
        let addr = config.as_ref().socket_addr()?;
        self.serve_at(addr).await
    }

    async fn serve_at(self, addr: SocketAddr) -> Result<(), ServerError> {
        tracing::info!(%addr, "reflection server listening");
        self.serve_with_shutdown(addr, shutdown_signal()).await?;
        tracing::info!("reflection server stopped");
        Ok(())
    }
}

/// Resolves on SIGINT, or on SIGTERM where supported.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!(signal = "SIGINT", "shutting down"),
        _ = terminate => tracing::info!(signal = "SIGTERM", "shutting down"),
    }
}

/// A standard `grpc.health.v1.Health` service and its status reporter.
///
/// Its schema is among the bundled descriptors, so reflection can describe
/// it without the application registering anything.
#[cfg(feature = "health")]
pub fn health_service() -> (
    tonic_health::server::HealthReporter,
    tonic_health::pb::health_server::HealthServer<impl tonic_health::pb::health_server::Health>,
) {
    tonic_health::server::health_reporter()
}
