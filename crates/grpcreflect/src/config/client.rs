//! Reflection client configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{ConfigBuilder, ConfigError};
use crate::service::ProtocolVersion;

/// Where and how to connect for reflection.
///
/// There is no per-request timeout: a reflection stream is long-lived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub endpoint: String,
    pub connect_timeout_secs: u64,
    pub tcp_keepalive_secs: Option<u64>,
    pub tcp_nodelay: bool,
    pub http2_keepalive_interval_secs: Option<u64>,
    pub http2_keepalive_timeout_secs: Option<u64>,
    pub version: ProtocolVersion,
    /// Sent as `host` on every reflection request.
    pub reflection_host: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://[::1]:50051".to_string(),
            connect_timeout_secs: 10,
            tcp_keepalive_secs: Some(60),
            tcp_nodelay: true,
            http2_keepalive_interval_secs: Some(30),
            http2_keepalive_timeout_secs: Some(20),
            version: ProtocolVersion::V1,
            reflection_host: None,
        }
    }
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn tcp_keepalive(&self) -> Option<Duration> {
        self.tcp_keepalive_secs.map(Duration::from_secs)
    }

    pub fn http2_keepalive_interval(&self) -> Option<Duration> {
        self.http2_keepalive_interval_secs.map(Duration::from_secs)
    }

    pub fn http2_keepalive_timeout(&self) -> Option<Duration> {
        self.http2_keepalive_timeout_secs.map(Duration::from_secs)
    }
}

/// Loads a [`ClientConfig`] and applies explicit overrides on top.
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    loader: ConfigBuilder,
    endpoint: Option<String>,
    connect_timeout_secs: Option<u64>,
    version: Option<ProtocolVersion>,
    reflection_host: Option<String>,
}

impl ClientConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dotenv(mut self) -> Self {
        self.loader = self.loader.with_dotenv();
        self
    }

    pub fn with_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.loader = self.loader.with_config_file(path);
        self
    }

    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.loader = self.loader.with_env_prefix(prefix);
        self
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn connect_timeout_secs(mut self, secs: u64) -> Self {
        self.connect_timeout_secs = Some(secs);
        self
    }

    pub fn version(mut self, version: ProtocolVersion) -> Self {
        self.version = Some(version);
        self
    }

    pub fn reflection_host(mut self, host: impl Into<String>) -> Self {
        self.reflection_host = Some(host.into());
        self
    }

    pub fn build(self) -> Result<ClientConfig, ConfigError> {
        let mut config: ClientConfig = self.loader.build()?;

        if let Some(endpoint) = self.endpoint {
            config.endpoint = endpoint;
        }
        if let Some(secs) = self.connect_timeout_secs {
            config.connect_timeout_secs = secs;
        }
        if let Some(version) = self.version {
            config.version = version;
        }
        if self.reflection_host.is_some() {
            config.reflection_host = self.reflection_host;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.endpoint, "http://[::1]:50051");
        assert_eq!(config.version, ProtocolVersion::V1);
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
        assert_eq!(config.http2_keepalive_interval(), Some(Duration::from_secs(30)));
        assert_eq!(config.http2_keepalive_timeout(), Some(Duration::from_secs(20)));
        assert!(config.reflection_host.is_none());
    }

    #[test]
    fn builder_overrides() {
        let config = ClientConfig::builder()
            .with_env_prefix("GRPCREFLECT_CLIENT_BUILDER_TEST")
            .endpoint("http://localhost:9000")
            .version(ProtocolVersion::V1Alpha)
            .reflection_host("reflect.example.com")
            .connect_timeout_secs(3)
            .build()
            .unwrap();

        assert_eq!(config.endpoint, "http://localhost:9000");
        assert_eq!(config.version, ProtocolVersion::V1Alpha);
        assert_eq!(config.reflection_host.as_deref(), Some("reflect.example.com"));
        assert_eq!(config.connect_timeout_secs, 3);
    }

    #[test]
    fn version_from_file_and_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.toml");
        std::fs::write(
            &path,
            "endpoint = \"http://file.example.com:50051\"\nversion = \"v1alpha\"\n",
        )
        .unwrap();

        let config = ClientConfig::builder()
            .with_env_prefix("GRPCREFLECT_CLIENT_FILE_TEST")
            .with_config_file(&path)
            .build()
            .unwrap();
        assert_eq!(config.endpoint, "http://file.example.com:50051");
        assert_eq!(config.version, ProtocolVersion::V1Alpha);

        let config = ClientConfig::builder()
            .with_env_prefix("GRPCREFLECT_CLIENT_FILE_TEST")
            .with_config_file(&path)
            .endpoint("http://override.example.com:9000")
            .build()
            .unwrap();
        assert_eq!(config.endpoint, "http://override.example.com:9000");
    }
}
