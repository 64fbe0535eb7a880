//! Structured logging with JSON or pretty output.

use crate::{LogFormat, LoggingConfig, TelemetryError};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Initialize the global subscriber.
///
/// `RUST_LOG` wins over the configured level when it is set and valid.
pub fn init(config: &LoggingConfig) -> Result<(), TelemetryError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    match config.log_format {
        LogFormat::Json => init_json_logging(filter),
        LogFormat::Pretty => init_pretty_logging(filter),
    }
}

fn init_json_logging(filter: EnvFilter) -> Result<(), TelemetryError> {
    let json_layer = fmt::layer()
        .json()
        .with_target(true)
        .with_current_span(true)
        .with_span_list(false)
        .flatten_event(true)
        .with_filter(filter);

    tracing_subscriber::registry()
        .with(json_layer)
        .try_init()
        .map_err(|e| TelemetryError::LoggingInit(e.to_string()))
}

fn init_pretty_logging(filter: EnvFilter) -> Result<(), TelemetryError> {
    let pretty_layer = fmt::layer()
        .pretty()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_filter(filter);

    tracing_subscriber::registry()
        .with(pretty_layer)
        .try_init()
        .map_err(|e| TelemetryError::LoggingInit(e.to_string()))
}

/// Standard log event names.
pub mod events {
    /// Process is starting up.
    pub const STARTUP: &str = "startup";

    /// HTTP server is listening.
    pub const LISTENING: &str = "listening";

    /// Process is shutting down.
    pub const SHUTDOWN: &str = "shutdown";

    /// An image was stored and its metadata recorded.
    pub const UPLOAD_STORED: &str = "upload_stored";

    /// A request was rejected with a client error.
    pub const VALIDATION_FAILURE: &str = "validation_failure";

    /// Object storage or metadata store call failed.
    pub const STORAGE_ERROR: &str = "storage_error";

    /// A download link could not be generated.
    pub const PRESIGN_FAILED: &str = "presign_failed";

    /// A serverless invocation finished.
    pub const INVOCATION_COMPLETED: &str = "invocation_completed";

    /// A serverless invocation could not be handled at all.
    pub const INVOCATION_FAILED: &str = "invocation_failed";
}

#[macro_export]
macro_rules! log_startup {
    ($($field:tt)*) => {
        tracing::info!(
            event = $crate::logging::events::STARTUP,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_listening {
    ($($field:tt)*) => {
        tracing::info!(
            event = $crate::logging::events::LISTENING,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_shutdown {
    ($($field:tt)*) => {
        tracing::info!(
            event = $crate::logging::events::SHUTDOWN,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_upload_stored {
    ($($field:tt)*) => {
        tracing::info!(
            event = $crate::logging::events::UPLOAD_STORED,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_validation_failure {
    ($($field:tt)*) => {
        tracing::warn!(
            event = $crate::logging::events::VALIDATION_FAILURE,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_storage_error {
    ($($field:tt)*) => {
        tracing::error!(
            event = $crate::logging::events::STORAGE_ERROR,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_presign_failed {
    ($($field:tt)*) => {
        tracing::warn!(
            event = $crate::logging::events::PRESIGN_FAILED,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_invocation_completed {
    ($($field:tt)*) => {
        tracing::info!(
            event = $crate::logging::events::INVOCATION_COMPLETED,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_invocation_failed {
    ($($field:tt)*) => {
        tracing::error!(
            event = $crate::logging::events::INVOCATION_FAILED,
            $($field)*
        )
    };
}
