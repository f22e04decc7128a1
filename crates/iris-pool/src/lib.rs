//! A bounded, idle-evictable cache of live agent transports, keyed by
//! `(fromTeam, toTeam)`.
//!
//! This crate owns the only logic that decides *when* a transport is
//! spawned, reused, or evicted, and the only logic that turns a completed
//! [`iris_core::CacheEntry`] into response text a caller can read.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]

mod distill;
mod error;
mod factory;
mod handle;
mod pool;

pub use distill::distill_response;
pub use error::{PoolError, PoolResult};
pub use factory::{DefaultTransportFactory, TransportFactory};
pub use handle::TransportHandle;
pub use pool::{PoolConfig, ProcessPool, TransportStatusSnapshot};
