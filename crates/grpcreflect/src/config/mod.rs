//! Configuration for reflection servers and clients.

mod client;
mod environment;
mod loader;
mod server;

pub use client::{ClientConfig, ClientConfigBuilder};
pub use environment::Environment;
pub use loader::{load_config_file, load_from_env, ConfigBuilder, ConfigError, ConfigFormat};
pub use server::ReflectionServerConfig;
