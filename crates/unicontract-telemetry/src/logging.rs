//! Structured logging setup and standard event names.

use crate::{LogFormat, TelemetryConfig, TelemetryError};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Initialize the logging subsystem.
///
/// Sets up tracing-subscriber with either JSON or pretty format,
/// respecting the configured log level unless `RUST_LOG` is set.
pub fn init_logging(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    match (config.log_format, config.to_stderr) {
        (LogFormat::Json, true) => init_json_logging(filter, std::io::stderr),
        (LogFormat::Json, false) => init_json_logging(filter, std::io::stdout),
        (LogFormat::Pretty, true) => init_pretty_logging(filter, std::io::stderr),
        (LogFormat::Pretty, false) => init_pretty_logging(filter, std::io::stdout),
    }
}

/// Initialize JSON logging.
fn init_json_logging<W>(filter: EnvFilter, writer: W) -> Result<(), TelemetryError>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let json_layer = fmt::layer()
        .json()
        .with_writer(writer)
        .with_target(true)
        .with_current_span(true)
        .with_span_list(false)
        .with_file(false)
        .with_line_number(false)
        .flatten_event(true)
        .with_filter(filter);

    tracing_subscriber::registry()
        .with(json_layer)
        .try_init()
        .map_err(|e: tracing_subscriber::util::TryInitError| {
            TelemetryError::LoggingInit(e.to_string())
        })
}

/// Initialize pretty logging.
fn init_pretty_logging<W>(filter: EnvFilter, writer: W) -> Result<(), TelemetryError>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let pretty_layer = fmt::layer()
        .compact()
        .with_writer(writer)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_filter(filter);

    tracing_subscriber::registry()
        .with(pretty_layer)
        .try_init()
        .map_err(|e: tracing_subscriber::util::TryInitError| {
            TelemetryError::LoggingInit(e.to_string())
        })
}

/// Standard log event names.
pub mod events {
    /// A document was normalized into a contract.
    pub const CONTRACT_LOADED: &str = "contract_loaded";

    /// A document could not be read, parsed or normalized.
    pub const DOCUMENT_LOAD_FAILED: &str = "document_load_failed";

    /// The declared spec version is outside the supported set.
    pub const UNSUPPORTED_VERSION: &str = "unsupported_version";

    /// A schema, property or header sub-tree could not be extracted.
    pub const SCHEMA_EXTRACTION_FAILURE: &str = "schema_extraction_failure";

    /// A `$ref` was left unresolved.
    pub const REFERENCE_UNRESOLVED: &str = "reference_unresolved";

    /// A source unit was skipped while building operations.
    pub const OPERATION_SKIPPED: &str = "operation_skipped";
}

/// Helper macros for structured logging with standard fields.
///
/// These wrap the tracing macros to ensure consistent field naming.
#[macro_export]
macro_rules! log_contract_loaded {
    ($($field:tt)*) => {
        tracing::info!(
            event = $crate::logging::events::CONTRACT_LOADED,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_document_load_failed {
    ($($field:tt)*) => {
        tracing::error!(
            event = $crate::logging::events::DOCUMENT_LOAD_FAILED,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_unsupported_version {
    ($($field:tt)*) => {
        tracing::warn!(
            event = $crate::logging::events::UNSUPPORTED_VERSION,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_extraction_failure {
    ($($field:tt)*) => {
        tracing::warn!(
            event = $crate::logging::events::SCHEMA_EXTRACTION_FAILURE,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_reference_unresolved {
    ($($field:tt)*) => {
        tracing::debug!(
            event = $crate::logging::events::REFERENCE_UNRESOLVED,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_operation_skipped {
    ($($field:tt)*) => {
        tracing::warn!(
            event = $crate::logging::events::OPERATION_SKIPPED,
            $($field)*
        )
    };
}
