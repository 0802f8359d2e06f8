//! Telemetry error types.

use thiserror::Error;

/// Errors raised while installing the global subscriber.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// A level, directive, or format string could not be parsed.
    #[error("invalid log configuration: {0}")]
    InvalidConfig(String),

    /// A global subscriber is already installed.
    #[error("failed to install subscriber: {0}")]
    Init(String),

    /// The log directory could not be created.
    #[error("log directory error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
