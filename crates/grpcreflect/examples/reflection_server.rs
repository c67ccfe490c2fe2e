//! Reflection Server Example
//!
//! Serves health plus reflection, describing both from the bundled schemas.
//!
//! Run with:
//! ```bash
//! cargo run -p grpcreflect --example reflection_server
//! ```
//!
//! Test with grpcurl:
//! ```bash
//! grpcurl -plaintext localhost:50051 list
//! grpcurl -plaintext localhost:50051 describe grpc.health.v1.Health
//! grpcurl -plaintext localhost:50051 grpc.health.v1.Health/Check
//! ```
//!
//! `REFLECT_PORT`, `REFLECT_SERVICES` and friends override the defaults.

use grpcreflect::bundled::{HEALTH_V1_SERVICE, REFLECTION_V1ALPHA_SERVICE, REFLECTION_V1_SERVICE};
use grpcreflect::{
    health_service, init_logging_from_env, ReflectionServerConfig, RouterExt, ServerExt,
};
use tonic_health::ServingStatus;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging_from_env();

    let mut config: ReflectionServerConfig = ReflectionServerConfig::builder()
        .with_dotenv()
        .with_env_prefix("REFLECT")
        .build()?;
    if config.services.is_empty() {
        config.services = [
            HEALTH_V1_SERVICE,
            REFLECTION_V1_SERVICE,
            REFLECTION_V1ALPHA_SERVICE,
        ]
        .map(String::from)
        .to_vec();
    }

    tracing::info!(
        environment = %config.environment,
        services = ?config.services,
        "Starting reflection server"
    );

    let (mut health_reporter, health) = health_service();
    for service in [REFLECTION_V1_SERVICE, REFLECTION_V1ALPHA_SERVICE] {
        health_reporter
            .set_service_status(service, ServingStatus::Serving)
            .await;
    }

    config
        .server_builder()
        .add_reflection_from(&config)
        .add_service(health)
        .serve_with(&config)
        .await?;

    Ok(())
}
