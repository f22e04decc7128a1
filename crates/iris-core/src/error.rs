//! Core error types.

/// Errors raised while validating or constructing core data.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A team name failed validation (empty, too long, or disallowed characters).
    #[error("invalid team name {name:?}: {reason}")]
    InvalidTeamName {
        /// The rejected name.
        name: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A project path failed validation.
    #[error("invalid project path {path:?}: {reason}")]
    InvalidPath {
        /// The rejected path.
        path: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A team is referenced that has no registered configuration.
    #[error("unknown team: {0}")]
    UnknownTeam(String),

    /// An id string could not be parsed.
    #[error("invalid id {value:?}: {reason}")]
    InvalidId {
        /// The rejected value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
