//! The transport capability set, implemented by both the local and remote
//! transports.

use std::time::Duration;

use iris_core::CacheEntry;

use crate::core::TransportMetrics;
use crate::error::TransportResult;
use crate::state::TransportState;

/// A single agent transport: spawn it once, then drive it with repeated
/// tells.
///
/// Implementations own exactly one underlying process or SSH channel and
/// never interpret the frames that flow through them beyond what is needed
/// to run their own state machine (spawn/result framing). Distilling a
/// user-facing response out of the accumulated frames is left to callers.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Launch the underlying process/channel and block until the agent's
    /// `init` frame arrives or `spawn_timeout` elapses.
    async fn spawn(&self, spawn_timeout: Duration) -> TransportResult<()>;

    /// Send `text` as a single tell and wait up to `timeout` for a terminal
    /// frame. Returns the accumulated cache entry regardless of whether the
    /// agent reported success or failure; callers inspect
    /// [`CacheEntry::is_error`].
    async fn execute_tell(&self, text: &str, timeout: Duration) -> TransportResult<CacheEntry>;

    /// Best-effort, non-blocking request to abort the in-flight tell.
    async fn cancel(&self) -> TransportResult<()>;

    /// Gracefully shut down, then force-terminate after a grace period.
    async fn terminate(&self) -> TransportResult<()>;

    /// Current lifecycle state.
    async fn status(&self) -> TransportState;

    /// Point-in-time metrics snapshot.
    async fn metrics(&self) -> TransportMetrics;
}
