//! The transport state machine.

/// Lifecycle state of a single agent transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    /// No process or channel exists.
    Stopped,
    /// Establishing the SSH connection (remote transports only).
    Connecting,
    /// The process or remote command has been launched; waiting for `init`.
    Spawning,
    /// Idle and ready to accept a tell.
    Ready,
    /// A tell is in flight.
    Busy,
    /// Shutting down.
    Terminating,
    /// A fatal error occurred; the transport must be discarded.
    Error,
}

impl std::fmt::Display for TransportState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stopped => write!(f, "stopped"),
            Self::Connecting => write!(f, "connecting"),
            Self::Spawning => write!(f, "spawning"),
            Self::Ready => write!(f, "ready"),
            Self::Busy => write!(f, "busy"),
            Self::Terminating => write!(f, "terminating"),
            Self::Error => write!(f, "error"),
        }
    }
}

impl TransportState {
    /// Whether the transport currently has no live process/channel.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Stopped | Self::Error)
    }
}
