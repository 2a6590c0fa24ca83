//! # Logging & Tracing Infrastructure
//!
//! Configures the `tracing-subscriber` stack used by every crate in the
//! workspace:
//! - pretty-print or JSON output formats
//! - module-level filtering via `EnvFilter` directives (`RUST_LOG` compatible)
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
//!
//! let config = LoggingConfig::default()
//!     .with_format(LogFormat::Pretty)
//!     .with_filter("info,core_playback=debug");
//!
//! init_logging(config).expect("failed to initialize logging");
//!
//! tracing::info!("player core started");
//! ```

use crate::error::{Error, Result};
use tracing_subscriber::{filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Output format for log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable multi-line output for development.
    Pretty,
    /// Compact single-line output.
    Compact,
    /// Newline-delimited JSON for log shippers.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Output format.
    pub format: LogFormat,
    /// `EnvFilter` directive string, e.g. `"info,core_playback=debug"`.
    /// A `RUST_LOG` environment variable takes precedence when set.
    pub filter: String,
    /// Include the event's target module in output.
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Compact,
            filter: "info".to_string(),
            with_target: true,
        }
    }
}

impl LoggingConfig {
    /// Set the output format.
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the default filter directives.
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    /// Toggle target display.
    pub fn with_target(mut self, with_target: bool) -> Self {
        self.with_target = with_target;
        self
    }
}

/// Initializes the global tracing subscriber.
///
/// Call once at host startup. Returns an error when a global subscriber is
/// already installed or the filter directives don't parse.
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .map_err(|e| Error::Config(format!("invalid log filter '{}': {}", config.filter, e)))?;

    let registry = tracing_subscriber::registry().with(filter);

    let result = match config.format {
        LogFormat::Pretty => registry
            .with(fmt::layer().pretty().with_target(config.with_target))
            .try_init(),
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_target(config.with_target))
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_target(config.with_target))
            .try_init(),
    };

    result.map_err(|e| Error::Logging(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = LoggingConfig::default();
        assert_eq!(config.format, LogFormat::Compact);
        assert_eq!(config.filter, "info");
        assert!(config.with_target);
    }

    #[test]
    fn builder_methods() {
        let config = LoggingConfig::default()
            .with_format(LogFormat::Json)
            .with_filter("debug,sqlx=warn")
            .with_target(false);

        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.filter, "debug,sqlx=warn");
        assert!(!config.with_target);
    }

    #[test]
    fn bad_filter_is_rejected() {
        // Invalid directive syntax should surface as a config error rather
        // than silently falling back.
        let config = LoggingConfig::default().with_filter("this is [not] a filter=");
        assert!(init_logging(config).is_err());
    }
}
