//! Durable `(fromTeam, toTeam) -> sessionId` identity and the on-disk
//! session-file convention it relies on.
//!
//! A session's identity lives in [`SessionStore`](iris_storage::SessionStore);
//! this crate adds the read-through cache, the home-directory path
//! convention the agent CLI uses for session files, and the
//! [`SessionManager`] that ties both to an on-demand initialization
//! strategy.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

mod cache;
mod error;
mod home;
mod init_runner;
mod manager;

pub use cache::SessionCache;
pub use error::{SessionError, SessionResult};
pub use home::{IrisHome, escape_project_path, session_file_exists};
pub use init_runner::{LocalProcessInitRunner, SessionInitRunner};
pub use manager::SessionManager;
