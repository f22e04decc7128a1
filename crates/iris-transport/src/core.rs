//! Shared state-machine core used by both the local and remote transports.
//!
//! Mirrors the gateway's `AgentHandle` shape: a handful of independently
//! lockable fields behind `Arc`, rather than one big lock around the whole
//! transport.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use iris_core::{CacheEntry, CacheEntryType};
use tokio::sync::{Mutex, Notify, RwLock};
use tracing::{debug, warn};

use crate::error::{TransportError, TransportResult};
use crate::frame::{is_init_frame, parse_line};
use crate::state::TransportState;

struct PendingEntry {
    entry: CacheEntry,
    notify: Arc<Notify>,
}

/// Runtime metrics snapshot for a transport.
#[derive(Debug, Clone)]
pub struct TransportMetrics {
    /// When the transport was spawned.
    pub started_at: DateTime<Utc>,
    /// Total tells that reached a terminal frame.
    pub messages_processed: u64,
    /// When the last response was delivered, if any.
    pub last_response_at: Option<DateTime<Utc>>,
}

/// Shared state machine plumbing for a single transport.
pub struct TransportCore {
    state: Arc<RwLock<TransportState>>,
    current: Arc<Mutex<Option<PendingEntry>>>,
    started_at: DateTime<Utc>,
    messages_processed: Arc<AtomicU64>,
    last_response_at: Arc<RwLock<Option<DateTime<Utc>>>>,
}

impl TransportCore {
    /// Construct a fresh core in the `Stopped` state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(TransportState::Stopped)),
            current: Arc::new(Mutex::new(None)),
            started_at: Utc::now(),
            messages_processed: Arc::new(AtomicU64::new(0)),
            last_response_at: Arc::new(RwLock::new(None)),
        }
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> TransportState {
        *self.state.read().await
    }

    /// Force the lifecycle state. Used by callers driving spawn/terminate.
    pub async fn set_state(&self, state: TransportState) {
        *self.state.write().await = state;
    }

    /// Snapshot current metrics.
    pub async fn metrics(&self) -> TransportMetrics {
        TransportMetrics {
            started_at: self.started_at,
            messages_processed: self.messages_processed.load(Ordering::Relaxed),
            last_response_at: *self.last_response_at.read().await,
        }
    }

    /// Attach a fresh cache entry as "current" and return the notifier the
    /// caller should await for completion.
    pub async fn attach(&self, kind: CacheEntryType, tell_string: impl Into<String>) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        let entry = CacheEntry::new(kind, tell_string);
        let mut guard = self.current.lock().await;
        *guard = Some(PendingEntry {
            entry,
            notify: Arc::clone(&notify),
        });
        notify
    }

    /// Take the current entry out, if any. Leaves `current` empty.
    async fn take_current(&self) -> Option<CacheEntry> {
        let mut guard = self.current.lock().await;
        guard.take().map(|pending| pending.entry)
    }

    /// Wait for `notify` to fire, bounded by `timeout`, then return whatever
    /// entry is attached (completed or not).
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::ResponseTimeout`] if the deadline elapses
    /// first; the entry, if any, is left attached so a later frame can still
    /// complete it.
    pub async fn await_completion(&self, notify: Arc<Notify>, timeout: Duration) -> TransportResult<CacheEntry> {
        match tokio::time::timeout(timeout, notify.notified()).await {
            Ok(()) => self
                .take_current()
                .await
                .ok_or(TransportError::Exited),
            Err(_) => Err(TransportError::ResponseTimeout(timeout)),
        }
    }

    /// Process one line of agent stdout: parse it, append it to the current
    /// entry (dumb pipe - no interpretation beyond spawn/terminal framing),
    /// and drive the relevant state transition.
    pub async fn on_line(&self, line: &str) {
        let Some(frame) = parse_line(line) else {
            if !line.trim().is_empty() {
                warn!(%line, "agent emitted an unparsable line");
            }
            return;
        };

        let mut guard = self.current.lock().await;
        let Some(pending) = guard.as_mut() else {
            return;
        };

        let was_spawn_init = pending.entry.kind() == CacheEntryType::Spawn && is_init_frame(&frame);
        pending.entry.push_frame(frame);
        let completed = pending.entry.is_completed();

        if was_spawn_init {
            drop(guard.take());
            drop(guard);
            self.set_state(TransportState::Ready).await;
            return;
        }

        if completed {
            self.messages_processed.fetch_add(1, Ordering::Relaxed);
            *self.last_response_at.write().await = Some(Utc::now());
            let notify = Arc::clone(&pending.notify);
            drop(guard);
            self.set_state(TransportState::Ready).await;
            notify.notify_one();
        }
    }

    /// The stdout stream ended (process exit or channel close). Fail any
    /// attached entry and transition to `Stopped`.
    pub async fn on_closed(&self) {
        let mut guard = self.current.lock().await;
        if let Some(mut pending) = guard.take() {
            pending.entry.fail();
            drop(guard);
            pending.notify.notify_one();
        } else {
            drop(guard);
        }
        self.set_state(TransportState::Stopped).await;
        debug!("transport stdout closed");
    }
}

impl Default for TransportCore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn spawn_entry_completes_on_init_frame() {
        let core = TransportCore::new();
        core.set_state(TransportState::Spawning).await;
        core.attach(CacheEntryType::Spawn, "ping").await;

        core.on_line(r#"{"type":"system","subtype":"init"}"#).await;

        assert_eq!(core.state().await, TransportState::Ready);
    }

    #[tokio::test]
    async fn tell_entry_completes_on_result_frame() {
        let core = TransportCore::new();
        core.set_state(TransportState::Busy).await;
        let notify = core.attach(CacheEntryType::Tell, "hello").await;

        core.on_line(r#"{"type":"assistant","message":{"content":[{"type":"text","text":"hi"}]}}"#)
            .await;
        core.on_line(r#"{"type":"result","is_error":false}"#).await;

        let entry = core.await_completion(notify, Duration::from_secs(1)).await.unwrap();
        assert!(entry.is_completed());
        assert!(!entry.is_error());
        assert_eq!(entry.frames().len(), 2);
        assert_eq!(core.state().await, TransportState::Ready);
    }

    #[tokio::test]
    async fn unparsable_lines_are_skipped() {
        let core = TransportCore::new();
        core.set_state(TransportState::Busy).await;
        let notify = core.attach(CacheEntryType::Tell, "hello").await;

        core.on_line("not json at all").await;
        core.on_line(r#"{"type":"result","is_error":false}"#).await;

        let entry = core.await_completion(notify, Duration::from_secs(1)).await.unwrap();
        assert_eq!(entry.frames().len(), 1);
    }

    #[tokio::test]
    async fn timeout_leaves_entry_attached() {
        let core = TransportCore::new();
        core.set_state(TransportState::Busy).await;
        let notify = core.attach(CacheEntryType::Tell, "hello").await;

        let result = core.await_completion(notify, Duration::from_millis(10)).await;
        assert!(matches!(result, Err(TransportError::ResponseTimeout(_))));
    }

    #[tokio::test]
    async fn on_closed_fails_attached_entry_and_stops() {
        let core = TransportCore::new();
        core.set_state(TransportState::Busy).await;
        let notify = core.attach(CacheEntryType::Tell, "hello").await;

        core.on_closed().await;

        let entry = core.await_completion(notify, Duration::from_secs(1)).await.unwrap();
        assert!(entry.is_error());
        assert_eq!(core.state().await, TransportState::Stopped);
    }
}
