//! Iris Storage - the embedded relational session store.
//!
//! Wraps `SurrealDB` behind [`Database`] and exposes [`SessionStore`] as the
//! single authority over durable session identity.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]

pub mod db;
pub mod error;
pub mod session_store;

pub use db::Database;
pub use error::{StorageError, StorageResult};
pub use session_store::{SessionFilter, SessionStore};
