//! Channel construction from [`ClientConfig`].

use tonic::transport::{Channel, Endpoint};

use crate::config::ClientConfig;
use crate::error::Error;

fn endpoint(config: &ClientConfig) -> Result<Endpoint, Error> {
    let mut endpoint = Endpoint::from_shared(config.endpoint.clone())
        .map_err(|e| Error::InvalidEndpoint(e.to_string()))?
        .connect_timeout(config.connect_timeout())
        .tcp_nodelay(config.tcp_nodelay)
        .tcp_keepalive(config.tcp_keepalive());

    if let Some(interval) = config.http2_keepalive_interval() {
        endpoint = endpoint
            .http2_keep_alive_interval(interval)
            .keep_alive_while_idle(true);
    }
    if let Some(timeout) = config.http2_keepalive_timeout() {
        endpoint = endpoint.keep_alive_timeout(timeout);
    }

    Ok(endpoint)
}

/// Build a [`Channel`] from a [`ClientConfig`].
///
/// ```ignore
/// use grpcreflect::{ChannelExt, ClientConfig, ReflectionClient};
/// use tonic::transport::Channel;
///
/// let config = ClientConfig::builder().endpoint("http://localhost:50051").build()?;
/// let channel = Channel::connect(&config).await?;
/// let client = ReflectionClient::with_version(channel, config.version);
/// ```
pub trait ChannelExt: Sized {
    /// Connect now; fails if the server is unreachable.
    fn connect(
        config: &ClientConfig,
    ) -> impl std::future::Future<Output = Result<Channel, Error>> + Send;

    /// Connect on first use.
    fn connect_lazy(config: &ClientConfig) -> Result<Channel, Error>;
}

impl ChannelExt for Channel {
    async fn connect(config: &ClientConfig) -> Result<Channel, Error> {
        Ok(endpoint(config)?.connect().await?)
    }

    fn connect_lazy(config: &ClientConfig) -> Result<Channel, Error> {
        Ok(endpoint(config)?.connect_lazy())
    }
}
