//! The durable session row: a `(fromTeam, toTeam) -> sessionId` binding plus
//! the runtime intent the pool/transport layer records against it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::SessionId;

/// Lifecycle status of a session's durable record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Normal, usable session.
    Active,
    /// A compaction of the agent's conversation history is in progress.
    Compacting,
    /// Compaction has been requested but not yet started.
    CompactPending,
    /// Retained for history but no longer addressable for new tells.
    Archived,
    /// The session's last known state was an unrecoverable error.
    Error,
}

/// Runtime intent recorded against a session by the pool/transport layer.
///
/// This is reset to `Stopped` for every row on process startup, since it
/// reflects in-memory intent from a process that may have crashed, not a
/// durable fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessState {
    /// No transport currently holds this session.
    Stopped,
    /// A transport is being spawned for this session.
    Spawning,
    /// A transport holds this session and is idle.
    Idle,
    /// A transport holds this session and is processing a tell.
    Processing,
    /// The transport holding this session is shutting down.
    Terminating,
}

/// A durable session record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRow {
    /// The session's unique id.
    pub session_id: SessionId,
    /// The team that owns the conversation.
    pub from_team: String,
    /// The team being addressed.
    pub to_team: String,
    /// Durable lifecycle status.
    pub status: SessionStatus,
    /// In-memory intent, reset to `Stopped` on startup recovery.
    pub process_state: ProcessState,
    /// Total tells delivered over this session's lifetime.
    pub message_count: u64,
    /// When the row was first created.
    pub created_at: DateTime<Utc>,
    /// When the session was last addressed.
    pub last_used_at: DateTime<Utc>,
    /// When the session last produced a completed response.
    pub last_response_at: Option<DateTime<Utc>>,
    /// The cache entry id currently attached to this session's transport, if any.
    pub current_cache_session_id: Option<String>,
}

impl SessionRow {
    /// Create a fresh row for a newly bound team pair.
    #[must_use]
    pub fn new(session_id: SessionId, from_team: impl Into<String>, to_team: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            session_id,
            from_team: from_team.into(),
            to_team: to_team.into(),
            status: SessionStatus::Active,
            process_state: ProcessState::Stopped,
            message_count: 0,
            created_at: now,
            last_used_at: now,
            last_response_at: None,
            current_cache_session_id: None,
        }
    }

    /// Record that the session was just addressed, bumping its message count.
    pub fn touch(&mut self) {
        self.last_used_at = Utc::now();
        self.message_count = self.message_count.saturating_add(1);
    }

    /// Record that a response was just delivered.
    pub fn mark_responded(&mut self) {
        self.last_response_at = Some(Utc::now());
    }
}
