//! A pooled transport plus the bookkeeping the pool needs around it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use iris_transport::{Transport, TransportState};
use tokio::sync::RwLock;

/// A live transport, tagged with the pair it serves and the idle-eviction
/// bookkeeping the pool needs.
pub struct TransportHandle {
    pub(crate) from_team: String,
    pub(crate) to_team: String,
    pub(crate) transport: Arc<dyn Transport>,
    last_used_at: RwLock<DateTime<Utc>>,
    in_flight: AtomicBool,
}

impl TransportHandle {
    pub(crate) fn new(from_team: impl Into<String>, to_team: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        Self {
            from_team: from_team.into(),
            to_team: to_team.into(),
            transport,
            last_used_at: RwLock::new(Utc::now()),
            in_flight: AtomicBool::new(false),
        }
    }

    /// The transport this handle wraps.
    #[must_use]
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub(crate) async fn last_used_at(&self) -> DateTime<Utc> {
        *self.last_used_at.read().await
    }

    pub(crate) async fn touch(&self) {
        *self.last_used_at.write().await = Utc::now();
    }

    /// Mark this transport as actively serving a tell. Returns `false` if
    /// it was already marked (caller must not proceed).
    pub(crate) fn mark_in_flight(&self) -> bool {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn clear_in_flight(&self) {
        self.in_flight.store(false, Ordering::Release);
    }

    /// Idle means no in-flight tell, a non-terminal, non-busy transport
    /// state, and - per §4.4 - no task for this key still waiting in the
    /// orchestrator's queue. `queued` is supplied by the caller (the pool),
    /// which is the only thing with visibility into queue depth; see
    /// [`crate::pool::ProcessPool::note_task_enqueued`].
    pub(crate) async fn is_idle(&self, queued: usize) -> bool {
        queued == 0 && !self.in_flight.load(Ordering::Acquire) && self.transport.status().await != TransportState::Busy
    }
}
