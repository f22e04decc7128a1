//! Session manager error types.

use iris_storage::StorageError;

/// Errors raised while resolving or creating a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// `fromTeam` or `toTeam` has no registered configuration.
    #[error("unknown team: {0}")]
    UnknownTeam(String),

    /// A team's project path failed validation.
    #[error("invalid path for team {team}: {reason}")]
    InvalidPath {
        /// The offending team.
        team: String,
        /// Why the path was rejected.
        reason: String,
    },

    /// The session-file initialization invocation could not be launched.
    #[error("session init failed: {0}")]
    SessionInitFailed(String),

    /// The session-file initialization invocation did not complete in time.
    #[error("session init timed out after {0:?}")]
    SessionInitTimeout(std::time::Duration),

    /// The durable store failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type for session manager operations.
pub type SessionResult<T> = Result<T, SessionError>;
