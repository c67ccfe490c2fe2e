//! `tracing` subscriber setup.

use std::env;
use std::str::FromStr;

/// Output format of log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(if s.trim().eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Text
        })
    }
}

impl LogFormat {
    /// Read `LOG_FORMAT`; text unless it says `json`.
    pub fn from_env() -> Self {
        env::var("LOG_FORMAT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }
}

/// Install a global subscriber. `RUST_LOG` takes precedence over `filter`.
///
/// Does nothing if a subscriber is already installed.
#[cfg(feature = "tracing")]
pub fn init_logging(format: LogFormat, filter: &str) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    let installed = match format {
        LogFormat::Text => fmt().with_env_filter(filter).try_init(),
        LogFormat::Json => fmt()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_env_filter(filter)
            .try_init(),
    };

    if installed.is_ok() {
        tracing::debug!(?format, "logging initialized");
    }
}

/// [`init_logging`] with `LOG_FORMAT` and an `info` default.
#[cfg(feature = "tracing")]
pub fn init_logging_from_env() {
    init_logging(LogFormat::from_env(), "info");
}
