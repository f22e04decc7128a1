//! Telemetry error types.

use thiserror::Error;

/// Errors that can occur while installing a global logging subscriber.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The supplied `RUST_LOG`-style directive string failed to parse.
    #[error("invalid log directive: {0}")]
    ConfigError(String),

    /// A global subscriber is already installed for this process.
    #[error("global subscriber already installed: {0}")]
    InitError(String),
}

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
