//! Global subscriber setup for binaries embedding the Iris crates.
//!
//! Library code in every other `iris-*` crate calls through `tracing`'s
//! macros directly and never touches this module; only the binary that
//! owns `main` decides how those events are rendered and where they go.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

use crate::error::{TelemetryError, TelemetryResult};

/// Output encoding for emitted log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable, multi-line, ANSI-colored (the default for a TTY).
    Pretty,
    /// Single-line compact text.
    Compact,
    /// Newline-delimited JSON objects, for ingestion by log collectors.
    Json,
}

/// Where emitted log lines are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    /// Standard error (the default).
    Stderr,
    /// Standard output.
    Stdout,
}

/// Logging configuration consumed by [`setup_logging`].
#[derive(Debug, Clone)]
pub struct LogConfig {
    level: String,
    format: LogFormat,
    target: LogTarget,
    directives: Vec<String>,
}

impl LogConfig {
    /// Start from a base level (e.g. `"info"`, `"debug"`).
    #[must_use]
    pub fn new(level: impl Into<String>) -> Self {
        Self { level: level.into(), format: LogFormat::Pretty, target: LogTarget::Stderr, directives: Vec::new() }
    }

    /// Set the output format.
    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the output target.
    #[must_use]
    pub fn with_target(mut self, target: LogTarget) -> Self {
        self.target = target;
        self
    }

    /// Add a per-module override, e.g. `"iris_transport=trace"`.
    #[must_use]
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    fn env_filter(&self) -> TelemetryResult<EnvFilter> {
        let mut filter = EnvFilter::try_new(&self.level).map_err(|err| TelemetryError::ConfigError(err.to_string()))?;
        for directive in &self.directives {
            let directive = directive.parse().map_err(|_| TelemetryError::ConfigError(directive.clone()))?;
            filter = filter.add_directive(directive);
        }
        Ok(filter)
    }
}

/// Install a global `tracing` subscriber built from `config`.
///
/// # Errors
///
/// Returns [`TelemetryError::ConfigError`] if a directive fails to parse, or
/// [`TelemetryError::InitError`] if a global subscriber is already set.
pub fn setup_logging(config: &LogConfig) -> TelemetryResult<()> {
    let with_ansi = matches!(config.target, LogTarget::Stderr) && matches!(config.format, LogFormat::Pretty);

    let result = match (&config.target, config.format) {
        (LogTarget::Stdout, LogFormat::Json) => {
            fmt::Subscriber::builder().with_env_filter(config.env_filter()?).json().with_writer(std::io::stdout).try_init()
        },
        (LogTarget::Stdout, _) => {
            fmt::Subscriber::builder().with_env_filter(config.env_filter()?).with_ansi(with_ansi).with_writer(std::io::stdout).try_init()
        },
        (LogTarget::Stderr, LogFormat::Json) => {
            fmt::Subscriber::builder().with_env_filter(config.env_filter()?).json().with_writer(std::io::stderr).try_init()
        },
        (LogTarget::Stderr, LogFormat::Compact) => {
            fmt::Subscriber::builder().with_env_filter(config.env_filter()?).with_ansi(with_ansi).compact().with_writer(std::io::stderr).try_init()
        },
        (LogTarget::Stderr, LogFormat::Pretty) => {
            fmt::Subscriber::builder().with_env_filter(config.env_filter()?).with_ansi(with_ansi).with_writer(std::io::stderr).try_init()
        },
    };

    result.map_err(|err| TelemetryError::InitError(err.to_string()))
}

/// Install a reasonable default subscriber: `info` level, pretty format, stderr.
///
/// # Errors
///
/// See [`setup_logging`].
pub fn setup_default_logging() -> TelemetryResult<()> {
    setup_logging(&LogConfig::new("info"))
}
