//! Iris Core - foundation types shared by every Iris crate.
//!
//! This crate provides:
//! - The team/session/cache-entry data model
//! - Team-name and project-path validation
//! - The base error type other crates wrap

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod cache_entry;
pub mod error;
pub mod ids;
pub mod prelude;
pub mod session;
pub mod team;
pub mod validate;

pub use cache_entry::{CacheEntry, CacheEntryType};
pub use error::{CoreError, CoreResult};
pub use ids::{SessionId, TaskId};
pub use session::{ProcessState, SessionRow, SessionStatus};
pub use team::{GrantPermission, RemoteOptions, TeamConfig};
