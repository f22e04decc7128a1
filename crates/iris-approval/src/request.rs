//! Shapes of a pending approval and its resolution.

use chrono::{DateTime, Utc};
use iris_core::SessionId;
use serde_json::Value;

use crate::id::PermissionId;

/// A tool invocation awaiting an out-of-band approval decision.
#[derive(Debug, Clone)]
pub struct PendingApproval {
    /// This approval's id.
    pub id: PermissionId,
    /// The session whose agent raised the tool call.
    pub session_id: SessionId,
    /// The team running that session.
    pub team_name: String,
    /// The tool the agent wants to invoke.
    pub tool_name: String,
    /// The tool's input payload, as the agent presented it.
    pub tool_input: Value,
    /// Why the agent says it needs this tool, if it said anything.
    pub reason: Option<String>,
    /// When this approval was created.
    pub created_at: DateTime<Utc>,
    /// When this approval resolves to a denial if nobody answers first.
    pub deadline: DateTime<Utc>,
}

/// The terminal outcome of a pending approval, however it resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalOutcome {
    /// Whether the tool call is allowed to proceed.
    pub approved: bool,
    /// Why, if the resolver said anything.
    pub reason: Option<String>,
}

impl ApprovalOutcome {
    /// Build an explicit approval.
    #[must_use]
    pub fn approved(reason: Option<String>) -> Self {
        Self { approved: true, reason }
    }

    /// Build an explicit denial.
    #[must_use]
    pub fn denied(reason: impl Into<String>) -> Self {
        Self { approved: false, reason: Some(reason.into()) }
    }

    /// The denial produced when a deadline elapses with nobody responding.
    #[must_use]
    pub fn timed_out() -> Self {
        Self::denied("timed out")
    }

    /// The denial produced when the pool is torn down with this approval
    /// still outstanding.
    #[must_use]
    pub fn shutting_down() -> Self {
        Self::denied("shutting down")
    }

    /// The denial produced when `cancelPendingPermission` is called
    /// explicitly rather than via timeout or shutdown.
    #[must_use]
    pub fn canceled() -> Self {
        Self::denied("canceled")
    }
}

/// A lightweight notification published as pending approvals are created
/// and resolved, for an observer (e.g. a dashboard) owned by the caller.
#[derive(Debug, Clone)]
pub enum ApprovalEvent {
    /// A new pending approval was created.
    Created(PermissionId),
    /// A pending approval resolved, one way or another.
    Resolved {
        /// The approval that resolved.
        id: PermissionId,
        /// Its outcome.
        outcome: ApprovalOutcome,
    },
}
