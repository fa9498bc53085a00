//! Logging setup.
//!
//! The runner and page objects only emit `tracing` events; binaries and test
//! harnesses call [`init_logging`] once to install a subscriber, or scope one
//! from [`build_subscriber`]. `RUST_LOG` takes precedence over the configured
//! filter. Later calls to [`init_logging`] are no-ops.

use crate::result::{TenazError, TenazResult};
use serde::{Deserialize, Serialize};
use tracing::Subscriber;
use tracing_subscriber::{fmt, fmt::MakeWriter, layer::SubscriberExt, EnvFilter};

/// Output encoding for log events
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub filter: String,
    /// Output encoding
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

impl LogConfig {
    /// Create the default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the filter directive
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    /// Set the output encoding
    #[must_use]
    pub const fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Build the filter, `RUST_LOG` first
    pub fn env_filter(&self) -> TenazResult<EnvFilter> {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return Ok(filter);
        }
        EnvFilter::try_new(&self.filter)
            .map_err(|e| TenazError::config(format!("invalid log filter '{}': {e}", self.filter)))
    }
}

/// Build a subscriber for `config` that writes to `writer`
pub fn build_subscriber<W>(
    config: &LogConfig,
    writer: W,
) -> TenazResult<Box<dyn Subscriber + Send + Sync>>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let registry = tracing_subscriber::registry().with(config.env_filter()?);
    Ok(match config.format {
        LogFormat::Text => Box::new(registry.with(fmt::layer().with_writer(writer).with_target(true))),
        LogFormat::Json => Box::new(registry.with(fmt::layer().json().with_writer(writer))),
    })
}

/// Install the global subscriber writing to stderr.
///
/// Returns `false` when a subscriber was already installed.
pub fn init_logging(config: &LogConfig) -> TenazResult<bool> {
    let subscriber = build_subscriber(config, std::io::stderr)?;
    Ok(tracing::subscriber::set_global_default(subscriber).is_ok())
}
