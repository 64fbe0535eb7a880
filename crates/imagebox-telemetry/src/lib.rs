//! Logging infrastructure for imagebox.
//!
//! Structured JSON to stdout in production, pretty output for local work,
//! plus the standard event names every log line carries.
//!
//! ```ignore
//! use imagebox_telemetry::{LogFormat, LoggingConfig};
//!
//! imagebox_telemetry::init(&LoggingConfig {
//!     log_level: "info".into(),
//!     log_format: LogFormat::Json,
//! })?;
//! imagebox_telemetry::log_startup!(version = env!("CARGO_PKG_VERSION"));
//! ```

pub mod logging;

pub use logging::{events, init};

use thiserror::Error;

/// Telemetry errors.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Failed to initialize logging.
    #[error("failed to initialize logging: {0}")]
    LoggingInit(String),
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Structured JSON output (production, Lambda).
    #[default]
    Json,
    /// Human-readable pretty output (development).
    Pretty,
}

impl LogFormat {
    /// Parse from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "pretty" => Some(Self::Pretty),
            _ => None,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence when set.
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::default(),
        }
    }
}
