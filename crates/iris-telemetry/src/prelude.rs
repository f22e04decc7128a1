//! Commonly used types for convenient import.
//!
//! ```
//! use iris_telemetry::prelude::*;
//! ```

pub use crate::{LogConfig, LogFormat, LogTarget, RequestContext, RequestGuard, TelemetryError, TelemetryResult, setup_default_logging, setup_logging};
