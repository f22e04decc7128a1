//! Transport error types.

/// Errors raised while spawning or driving an agent transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The process or SSH channel could not be spawned.
    #[error("spawn failed: {0}")]
    SpawnFailed(String),

    /// The transport did not observe an `init` frame before its spawn
    /// deadline elapsed.
    #[error("timed out waiting for agent init after {0:?}")]
    InitTimeout(std::time::Duration),

    /// A tell was sent while the transport already had one in flight.
    #[error("transport is busy with another request")]
    Busy,

    /// A tell or cancel was attempted while the transport is not ready.
    #[error("transport is not ready (state: {0})")]
    NotReady(String),

    /// A tell's completion deadline elapsed before a terminal frame arrived.
    #[error("timed out waiting for a response after {0:?}")]
    ResponseTimeout(std::time::Duration),

    /// The underlying process or channel I/O failed.
    #[error("io error: {0}")]
    Io(String),

    /// The SSH connection to a remote team's host could not be established.
    #[error("ssh connect failed: {0}")]
    SshConnect(String),

    /// The agent process exited unexpectedly while an entry was attached.
    #[error("agent process exited unexpectedly")]
    Exited,
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;
