//! Logging infrastructure for unicontract.
//!
//! This crate provides:
//! - Structured logging (JSON or compact human-readable) via `tracing-subscriber`
//! - Standard event names and `log_*!` macros used across the workspace
//!
//! # Usage
//!
//! ```ignore
//! use unicontract_telemetry::{LogFormat, TelemetryConfig};
//!
//! let config = TelemetryConfig::new()
//!     .with_log_level("info")
//!     .with_log_format(LogFormat::Json);
//!
//! unicontract_telemetry::init(&config)?;
//! ```

pub mod config;
pub mod logging;

pub use config::{LogFormat, TelemetryConfig};
pub use logging::events;

use thiserror::Error;

/// Telemetry errors.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Failed to initialize logging.
    #[error("failed to initialize logging: {0}")]
    LoggingInit(String),
}

/// Initialize logging with the given configuration.
///
/// Fails if a global subscriber is already installed.
pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    logging::init_logging(config)?;
    tracing::debug!(service = %config.service_name, "logging initialized");
    Ok(())
}
