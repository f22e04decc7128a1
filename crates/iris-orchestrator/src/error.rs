//! Orchestrator error types.

use iris_pool::PoolError;
use iris_session::SessionError;

/// Errors raised while enqueuing or dispatching a task.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    /// The target's FIFO is already at `MAX_QUEUE_SIZE`.
    #[error("queue full for target: {0}")]
    QueueFull(String),

    /// Resolving the session for this task failed.
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// Acquiring or driving the transport failed.
    #[error("pool error: {0}")]
    Pool(#[from] PoolError),

    /// The orchestrator has shut down and no longer accepts work.
    #[error("orchestrator is shutting down")]
    ShuttingDown,
}

/// Result type for orchestrator operations.
pub type OrchestratorResult<T> = Result<T, OrchestratorError>;
