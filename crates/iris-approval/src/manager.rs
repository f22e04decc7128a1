//! The pending-approval table: gates a tool call on an out-of-band
//! approval decision, with a timeout that resolves as a denial.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use iris_core::SessionId;
use serde_json::Value;
use tokio::sync::{broadcast, oneshot};
use tracing::{debug, warn};

use crate::id::PermissionId;
use crate::request::{ApprovalEvent, ApprovalOutcome, PendingApproval};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const EVENT_CHANNEL_CAPACITY: usize = 256;

struct Slot {
    meta: PendingApproval,
    sender: oneshot::Sender<ApprovalOutcome>,
}

/// Correlates an agent-triggered tool invocation with an external approval.
///
/// The table is flat and in-memory only: approvals are ephemeral and do not
/// survive a restart. Every entry resolves exactly once, by whichever of
/// [`Self::resolve`], [`Self::cancel`], or the waiter's own deadline gets to
/// remove it from the map first.
pub struct PendingApprovals {
    pending: DashMap<PermissionId, Slot>,
    events: broadcast::Sender<ApprovalEvent>,
    default_timeout: Duration,
}

impl PendingApprovals {
    /// Build a table with the default 30 s approval timeout.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Self::with_default_timeout(DEFAULT_TIMEOUT)
    }

    /// Build a table with an explicit default timeout.
    #[must_use]
    pub fn with_default_timeout(default_timeout: Duration) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Arc::new(Self { pending: DashMap::new(), events, default_timeout })
    }

    /// Subscribe to `permission:created` / `permission:resolved` notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ApprovalEvent> {
        self.events.subscribe()
    }

    /// Create a pending approval for a tool call and return its id along
    /// with a waiter that resolves to the terminal [`ApprovalOutcome`].
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        self: &Arc<Self>,
        session_id: SessionId,
        team_name: impl Into<String>,
        tool_name: impl Into<String>,
        tool_input: Value,
        reason: Option<String>,
        timeout: Option<Duration>,
    ) -> (PermissionId, ApprovalWaiter) {
        let id = PermissionId::new();
        let timeout = timeout.unwrap_or(self.default_timeout);
        let created_at = Utc::now();
        let deadline = created_at + chrono::Duration::from_std(timeout).unwrap_or(chrono::Duration::zero());

        let meta = PendingApproval {
            id: id.clone(),
            session_id,
            team_name: team_name.into(),
            tool_name: tool_name.into(),
            tool_input,
            reason,
            created_at,
            deadline,
        };

        let (sender, receiver) = oneshot::channel();
        self.pending.insert(id.clone(), Slot { meta, sender });
        debug!(%id, "permission created");
        let _ = self.events.send(ApprovalEvent::Created(id.clone()));

        let waiter = ApprovalWaiter { id: id.clone(), receiver, timeout, approvals: self.clone() };
        (id, waiter)
    }

    /// Resolve a pending approval with an explicit decision. A no-op,
    /// returning `false`, if `id` is unknown or already resolved.
    pub fn resolve(&self, id: &PermissionId, approved: bool, reason: Option<String>) -> bool {
        self.settle(id, ApprovalOutcome { approved, reason })
    }

    /// Cancel a pending approval, resolving it as a denial with
    /// `reason: "canceled"`. A no-op if `id` is unknown or already resolved.
    pub fn cancel(&self, id: &PermissionId) -> bool {
        self.settle(id, ApprovalOutcome::canceled())
    }

    fn settle(&self, id: &PermissionId, outcome: ApprovalOutcome) -> bool {
        let Some((_, slot)) = self.pending.remove(id) else {
            return false;
        };
        let _ = self.events.send(ApprovalEvent::Resolved { id: id.clone(), outcome: outcome.clone() });
        let _ = slot.sender.send(outcome);
        true
    }

    /// Resolve every outstanding approval as `{approved: false, reason:
    /// "shutting down"}`, for use during pool/process shutdown.
    pub fn clear_all(&self) {
        let ids: Vec<PermissionId> = self.pending.iter().map(|entry| entry.key().clone()).collect();
        let count = ids.len();
        for id in ids {
            self.settle(&id, ApprovalOutcome::shutting_down());
        }
        if count > 0 {
            warn!(count, "cleared outstanding approvals on shutdown");
        }
    }

    /// Snapshot the metadata for a still-pending approval.
    #[must_use]
    pub fn get(&self, id: &PermissionId) -> Option<PendingApproval> {
        self.pending.get(id).map(|slot| slot.meta.clone())
    }

    /// Snapshot every currently pending approval.
    #[must_use]
    pub fn list_pending(&self) -> Vec<PendingApproval> {
        self.pending.iter().map(|entry| entry.value().meta.clone()).collect()
    }

    /// How many approvals are currently outstanding.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether no approvals are currently outstanding.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn finalize_timeout(&self, id: &PermissionId) -> bool {
        let Some((_, _slot)) = self.pending.remove(id) else {
            return false;
        };
        let _ = self.events.send(ApprovalEvent::Resolved { id: id.clone(), outcome: ApprovalOutcome::timed_out() });
        true
    }
}

/// Resolves to the terminal outcome of a single pending approval: either
/// whatever [`PendingApprovals::resolve`]/[`cancel`](PendingApprovals::cancel)
/// produced, or a timeout denial once its deadline elapses.
pub struct ApprovalWaiter {
    id: PermissionId,
    receiver: oneshot::Receiver<ApprovalOutcome>,
    timeout: Duration,
    approvals: Arc<PendingApprovals>,
}

impl ApprovalWaiter {
    /// This waiter's approval id.
    #[must_use]
    pub fn id(&self) -> &PermissionId {
        &self.id
    }

    /// Await the approval's terminal outcome.
    pub async fn wait(self) -> ApprovalOutcome {
        match tokio::time::timeout(self.timeout, self.receiver).await {
            Ok(Ok(outcome)) => outcome,
            // Sender dropped without sending: treat like an explicit cancel.
            Ok(Err(_)) => ApprovalOutcome::canceled(),
            Err(_) => {
                self.approvals.finalize_timeout(&self.id);
                ApprovalOutcome::timed_out()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn team_session() -> SessionId {
        SessionId::new()
    }

    #[tokio::test]
    async fn resolve_delivers_the_outcome_to_the_waiter() {
        let approvals = PendingApprovals::new();
        let (id, waiter) = approvals.create(team_session(), "alpha", "bash", json!({"cmd": "ls"}), None, None);

        assert!(approvals.resolve(&id, true, Some("looks fine".to_string())));
        let outcome = waiter.wait().await;
        assert_eq!(outcome, ApprovalOutcome { approved: true, reason: Some("looks fine".to_string()) });
    }

    #[tokio::test]
    async fn unknown_id_resolve_is_a_no_op() {
        let approvals = PendingApprovals::new();
        assert!(!approvals.resolve(&PermissionId::new(), true, None));
    }

    #[tokio::test]
    async fn resolving_twice_only_succeeds_once() {
        let approvals = PendingApprovals::new();
        let (id, waiter) = approvals.create(team_session(), "alpha", "bash", json!({}), None, None);
        assert!(approvals.resolve(&id, true, None));
        assert!(!approvals.resolve(&id, false, None));
        assert!(waiter.wait().await.approved);
    }

    #[tokio::test]
    async fn cancel_resolves_as_denied_canceled() {
        let approvals = PendingApprovals::new();
        let (id, waiter) = approvals.create(team_session(), "alpha", "bash", json!({}), None, None);
        assert!(approvals.cancel(&id));
        let outcome = waiter.wait().await;
        assert!(!outcome.approved);
        assert_eq!(outcome.reason.as_deref(), Some("canceled"));
    }

    #[tokio::test]
    async fn timeout_resolves_as_denied_and_clears_the_entry() {
        let approvals = PendingApprovals::new();
        let (id, waiter) = approvals.create(team_session(), "alpha", "bash", json!({}), None, Some(Duration::from_millis(30)));

        let outcome = waiter.wait().await;
        assert!(!outcome.approved);
        assert!(outcome.reason.unwrap().contains("timed out"));
        assert!(approvals.get(&id).is_none());
        // A resolve arriving after the timeout has already settled it is a no-op.
        assert!(!approvals.resolve(&id, true, None));
    }

    #[tokio::test]
    async fn clear_all_denies_every_outstanding_approval() {
        let approvals = PendingApprovals::new();
        let (_, waiter_a) = approvals.create(team_session(), "alpha", "bash", json!({}), None, None);
        let (_, waiter_b) = approvals.create(team_session(), "beta", "bash", json!({}), None, None);

        approvals.clear_all();
        assert!(approvals.is_empty());

        let (a, b) = tokio::join!(waiter_a.wait(), waiter_b.wait());
        assert_eq!(a.reason.as_deref(), Some("shutting down"));
        assert_eq!(b.reason.as_deref(), Some("shutting down"));
    }

    #[tokio::test]
    async fn list_pending_reflects_live_entries() {
        let approvals = PendingApprovals::new();
        assert!(approvals.list_pending().is_empty());
        let (id, _waiter) = approvals.create(team_session(), "alpha", "bash", json!({"x": 1}), Some("need this".to_string()), None);
        let pending = approvals.list_pending();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, id);
        assert_eq!(pending[0].tool_name, "bash");
        assert_eq!(pending[0].reason.as_deref(), Some("need this"));
    }
}
