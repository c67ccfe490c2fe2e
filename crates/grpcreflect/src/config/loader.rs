//! Layered configuration loading: `.env` files, one main config file, then
//! environment variables on top.

use std::env;
use std::path::{Path, PathBuf};

use config::{Config, File, Map, Source, Value, ValueKind};
use serde::de::DeserializeOwned;

#[cfg(feature = "tracing")]
use crate::logging::{init_logging, LogFormat};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("failed to parse config: {0}")]
    Parse(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        Self::Parse(err.to_string())
    }
}

/// Config file formats, by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    DotEnv,
    Toml,
    Yaml,
    Json,
}

impl ConfigFormat {
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let ext = path.as_ref().extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "env" => Some(Self::DotEnv),
            "toml" => Some(Self::Toml),
            "yaml" | "yml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// `.env`, `.env.local`, `settings.env` and the like.
    fn is_dotenv(path: &Path) -> bool {
        match Self::from_path(path) {
            Some(format) => format == Self::DotEnv,
            None => path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with(".env") || name == "env"),
        }
    }
}

/// Builds a configuration value from files and the environment.
///
/// # Example
///
/// ```ignore
/// use grpcreflect::{ConfigBuilder, ReflectionServerConfig};
///
/// let config: ReflectionServerConfig = ConfigBuilder::new()
///     .with_dotenv()
///     .with_config_file("reflection.toml")
///     .build()?;
/// ```
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    dotenv: bool,
    files: Vec<PathBuf>,
    env_prefix: Option<String>,
    #[cfg(feature = "tracing")]
    init_logging: bool,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `.env` from the working directory, if present.
    pub fn with_dotenv(mut self) -> Self {
        self.dotenv = true;
        self
    }

    /// Add a config file.
    ///
    /// Every `.env`-style file is loaded into the process environment. Of the
    /// toml/yaml/json files, the last one added is the main source.
    pub fn with_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.files.push(path.into());
        self
    }

    /// Only read environment variables starting with `{prefix}_`.
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    /// Initialize logging from `LOG_FORMAT` and `RUST_LOG` during `build`.
    #[cfg(feature = "tracing")]
    pub fn with_logging_from_env(mut self) -> Self {
        self.init_logging = true;
        self
    }

    pub fn build<C: DeserializeOwned>(self) -> Result<C, ConfigError> {
        if self.dotenv {
            let _ = dotenvy::dotenv();
        }

        let (dotenv_files, main_files): (Vec<_>, Vec<_>) = self
            .files
            .iter()
            .partition(|path| ConfigFormat::is_dotenv(path));
        for path in dotenv_files.into_iter().filter(|path| path.exists()) {
            let _ = dotenvy::from_path(path);
        }
        let main_file = main_files
            .into_iter()
            .filter(|path| ConfigFormat::from_path(path).is_some())
            .last();

        #[cfg(feature = "tracing")]
        if self.init_logging {
            init_logging(LogFormat::from_env(), "info");
        }

        let env = EnvSource {
            prefix: self.env_prefix,
        };
        match main_file {
            Some(path) => load_file_with_env(path, env),
            None => load_with_env(env),
        }
    }
}

/// Load configuration from environment variables alone.
pub fn load_from_env<C: DeserializeOwned>() -> Result<C, ConfigError> {
    load_with_env(EnvSource::default())
}

/// Load `path`, with environment variables overriding its values.
pub fn load_config_file<C: DeserializeOwned>(path: &Path) -> Result<C, ConfigError> {
    load_file_with_env(path, EnvSource::default())
}

fn load_with_env<C: DeserializeOwned>(env: EnvSource) -> Result<C, ConfigError> {
    Ok(Config::builder()
        .add_source(env)
        .build()?
        .try_deserialize()?)
}

fn load_file_with_env<C: DeserializeOwned>(path: &Path, env: EnvSource) -> Result<C, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }

    Ok(Config::builder()
        .add_source(File::from(path))
        .add_source(env)
        .build()?
        .try_deserialize()?)
}

/// Environment variables, `__` separating nested keys.
///
/// `services` is read as a comma-separated list. Without a prefix,
/// `ENVIRONMENT`, `APP_ENV` and `RUST_ENV` also fill `environment`.
#[derive(Debug, Clone, Default)]
struct EnvSource {
    prefix: Option<String>,
}

impl Source for EnvSource {
    fn clone_into_box(&self) -> Box<dyn Source + Send + Sync> {
        Box::new(self.clone())
    }

    fn collect(&self) -> Result<Map<String, Value>, config::ConfigError> {
        let source = match &self.prefix {
            Some(prefix) => config::Environment::with_prefix(prefix).prefix_separator("_"),
            None => config::Environment::default(),
        };
        let mut map = source
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("services")
            .collect()?;

        if self.prefix.is_none() && !map.contains_key("environment") {
            let value = ["ENVIRONMENT", "APP_ENV", "RUST_ENV"]
                .into_iter()
                .find_map(|key| env::var(key).ok());
            if let Some(value) = value {
                map.insert(
                    "environment".to_string(),
                    Value::new(None, ValueKind::String(value)),
                );
            }
        }

        Ok(map)
    }
}
