//! Structured logging setup and request-correlation spans for binaries
//! that embed the Iris session/transport/scheduling crates.
//!
//! Library code elsewhere calls through `tracing`'s macros directly; this
//! crate only provides the global subscriber installer a binary's `main`
//! calls once, and a small [`RequestContext`] helper for correlating the
//! suspension points of a single dispatch.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]

pub mod prelude;

mod context;
mod error;
mod logging;

pub use context::{RequestContext, RequestGuard};
pub use error::{TelemetryError, TelemetryResult};
pub use logging::{LogConfig, LogFormat, LogTarget, setup_default_logging, setup_logging};
