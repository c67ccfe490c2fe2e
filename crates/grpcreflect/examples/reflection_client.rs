//! Reflection Client Example
//!
//! Run the server first:
//! ```bash
//! cargo run -p grpcreflect --example reflection_server
//! ```
//!
//! Then run this client, optionally naming a symbol to describe:
//! ```bash
//! cargo run -p grpcreflect --example reflection_client
//! cargo run -p grpcreflect --example reflection_client -- grpc.health.v1.Health
//! ```
//!
//! `REFLECT_CLIENT_ENDPOINT` and `REFLECT_CLIENT_VERSION=v1alpha` change the
//! target.

use grpcreflect::{init_logging_from_env, ClientConfig, ReflectionClient, StreamOptions};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging_from_env();

    let config = ClientConfig::builder()
        .with_dotenv()
        .with_env_prefix("REFLECT_CLIENT")
        .build()?;

    tracing::info!(endpoint = %config.endpoint, version = %config.version, "Connecting");
    let mut client = ReflectionClient::connect(&config).await?;
    let stream = client.open_stream(StreamOptions::from(&config)).await?;

    let symbols = match std::env::args().nth(1) {
        Some(symbol) => vec![symbol],
        None => stream.list_services().await?,
    };

    for symbol in symbols {
        match stream.file_containing_symbol(&symbol).await {
            Ok(files) => {
                println!("{symbol}");
                for file in files {
                    println!(
                        "  {} ({} messages, {} services)",
                        file.name(),
                        file.message_type.len(),
                        file.service.len()
                    );
                }
            }
            Err(err) if err.is_not_found() => println!("{symbol}: not found"),
            Err(err) => return Err(err.into()),
        }
    }

    if let Some(trailers) = stream.close().await? {
        tracing::debug!(?trailers, "Stream closed");
    }
    Ok(())
}
