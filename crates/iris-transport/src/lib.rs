//! Iris Transport - drives a single agent process, local or remote, over
//! its stream-json stdio protocol.
//!
//! The transport is deliberately a "dumb pipe": it appends every parsed
//! frame to whichever cache entry is currently attached and only inspects
//! frames enough to run its own spawn/result state machine. Distilling a
//! user-facing response out of the accumulated frames belongs to the pool
//! layer above this crate.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]

pub mod args;
pub mod core;
pub mod error;
pub mod frame;
pub mod local;
#[cfg(any(test, feature = "testing"))]
pub mod mock;
pub mod remote;
pub mod ssh_config;
pub mod state;
pub mod transport;

pub use core::TransportMetrics;
pub use error::{TransportError, TransportResult};
pub use local::LocalTransport;
#[cfg(any(test, feature = "testing"))]
pub use mock::{MockResponse, MockTransport};
pub use remote::RemoteTransport;
pub use state::TransportState;
pub use transport::Transport;
