//! Structured logging configuration.

use thiserror::Error;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Errors raised while initialising telemetry.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Logging could not be initialised.
    #[error("logging initialization failed: {0}")]
    LoggingInit(String),
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level filter (e.g. "info", "talaria=debug").
    pub level: String,

    /// Whether to output JSON format.
    pub json_format: bool,

    /// Whether to include span open/close events.
    pub span_events: bool,

    /// Service name, recorded on every event.
    pub service_name: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: true,
            span_events: false,
            service_name: "talaria".to_string(),
        }
    }
}

impl LogConfig {
    /// A development configuration: pretty output, debug level.
    #[must_use]
    pub fn development() -> Self {
        Self {
            level: "debug".to_string(),
            json_format: false,
            span_events: true,
            ..Self::default()
        }
    }

    /// A deployed-function configuration: JSON output, info level.
    #[must_use]
    pub fn production() -> Self {
        Self::default()
    }
}

/// Initialises the global tracing subscriber.
///
/// # Errors
///
/// Returns `TelemetryError::LoggingInit` when the level filter is invalid
/// or a subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_new(&config.level)
        .map_err(|err| TelemetryError::LoggingInit(format!("invalid log level: {err}")))?;

    let span_events = if config.span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    if config.json_format {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_span_events(span_events)
            .with_filter(filter);

        tracing_subscriber::registry()
            .with(fmt_layer)
            .try_init()
            .map_err(|err| TelemetryError::LoggingInit(err.to_string()))?;
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .pretty()
            .with_span_events(span_events)
            .with_filter(filter);

        tracing_subscriber::registry()
            .with(fmt_layer)
            .try_init()
            .map_err(|err| TelemetryError::LoggingInit(err.to_string()))?;
    }

    Ok(())
}

/// Shared log field names.
///
/// Adapters and the invoker use these names; dashboards and alerts can rely
/// on them staying put.
pub mod fields {
    /// The request id assigned by the gateway or the dev server.
    pub const REQUEST_ID: &str = "request_id";

    /// The RPC method being invoked.
    pub const RPC_METHOD: &str = "rpc_method";

    /// Handler duration in microseconds.
    pub const HANDLER_DURATION: &str = "handler_duration";

    /// The wire error code of a handled failure.
    pub const ERR_CODE: &str = "err_code";

    /// The wire error message of a handled failure.
    pub const ERR_MESSAGE: &str = "err_message";

    /// The inner cause of a handled failure. Logs only, never the wire.
    pub const ERR_CAUSE: &str = "err_cause";

    /// The queue message id being processed.
    pub const SQS_MSG_ID: &str = "sqs_msg_id";
}
