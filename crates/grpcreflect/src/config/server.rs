//! Reflection server configuration.

use std::net::SocketAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tonic::transport::Server;

use super::{ConfigBuilder, Environment};
use crate::reflector::Reflector;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReflectionServerConfig {
    pub environment: Environment,
    pub host: String,
    pub port: u16,
    /// Service names advertised by `list_services`, in this order.
    pub services: Vec<String>,
    /// Also serve the legacy `grpc.reflection.v1alpha` path.
    pub serve_v1alpha: bool,
    pub tcp_nodelay: bool,
    pub tcp_keepalive_secs: Option<u64>,
    /// Per-connection HTTP/2 stream limit; each reflection session is one.
    pub max_concurrent_streams: Option<u32>,
}

impl Default for ReflectionServerConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            host: "[::1]".to_string(),
            port: 50051,
            services: Vec::new(),
            serve_v1alpha: true,
            tcp_nodelay: true,
            tcp_keepalive_secs: Some(60),
            max_concurrent_streams: None,
        }
    }
}

impl ReflectionServerConfig {
    /// ```ignore
    /// let config: ReflectionServerConfig = ReflectionServerConfig::builder()
    ///     .with_dotenv()
    ///     .with_config_file("reflection.toml")
    ///     .build()?;
    /// ```
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.addr().parse()
    }

    pub fn tcp_keepalive(&self) -> Option<Duration> {
        self.tcp_keepalive_secs.map(Duration::from_secs)
    }

    /// A tonic server builder with the transport settings applied.
    pub fn server_builder(&self) -> Server {
        Server::builder()
            .tcp_nodelay(self.tcp_nodelay)
            .tcp_keepalive(self.tcp_keepalive())
            .max_concurrent_streams(self.max_concurrent_streams)
    }

    /// A reflector advertising [`services`](Self::services) from the
    /// process-wide registry.
    pub fn reflector(&self) -> Reflector {
        Reflector::with_static_names(self.services.iter().cloned())
    }
}

impl AsRef<ReflectionServerConfig> for ReflectionServerConfig {
    fn as_ref(&self) -> &ReflectionServerConfig {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ReflectionServerConfig::default();
        assert_eq!(config.addr(), "[::1]:50051");
        assert!(config.serve_v1alpha);
        assert!(config.services.is_empty());
        assert_eq!(config.tcp_keepalive(), Some(Duration::from_secs(60)));
    }

    #[test]
    fn socket_addr_parsing() {
        let config = ReflectionServerConfig {
            host: "127.0.0.1".to_string(),
            port: 9090,
            ..Default::default()
        };
        assert_eq!(config.socket_addr().unwrap().to_string(), "127.0.0.1:9090");

        let config = ReflectionServerConfig {
            host: "reflect.local".to_string(),
            ..Default::default()
        };
        assert!(config.socket_addr().is_err());
    }

    #[test]
    fn reflector_advertises_configured_services() {
        let config = ReflectionServerConfig {
            services: vec![
                "acme.user.v1.UserService".to_string(),
                "grpc.reflection.v1.ServerReflection".to_string(),
            ],
            ..Default::default()
        };

        assert_eq!(config.reflector().names(), config.services);
    }

    #[test]
    fn from_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reflection.yaml");
        std::fs::write(
            &path,
            "environment: production\nport: 6000\nserve_v1alpha: false\nservices:\n  - acme.user.v1.UserService\n",
        )
        .unwrap();

        let config: ReflectionServerConfig = ReflectionServerConfig::builder()
            .with_env_prefix("GRPCREFLECT_SERVER_CONFIG_TEST")
            .with_config_file(&path)
            .build()
            .unwrap();

        assert!(config.environment.is_production());
        assert_eq!(config.port, 6000);
        assert!(!config.serve_v1alpha);
        assert_eq!(config.services, vec!["acme.user.v1.UserService"]);
        assert_eq!(config.host, "[::1]");
    }
}
