//! Process pool error types.

use iris_transport::TransportError;

/// Errors raised while acquiring or driving a pooled transport.
///
/// `sendMessage`'s deadline is enforced inside [`TransportError::ResponseTimeout`]
/// (wrapped below as [`PoolError::Transport`]) rather than by a second,
/// pool-level timeout variant - there is only one deadline in play per tell.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// No team configuration is registered under this name.
    #[error("unknown team: {0}")]
    UnknownTeam(String),

    /// The underlying transport failed to spawn or serve a tell.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// No key was found to terminate.
    #[error("no pooled transport for key: {0}")]
    NotFound(String),

    /// The agent itself reported failure for this request (`result.is_error`
    /// or an explicit `error` frame), as opposed to a transport-level fault.
    #[error("agent reported an error: {0}")]
    AgentError(String),
}

/// Result type for process pool operations.
pub type PoolResult<T> = Result<T, PoolError>;
