//! A canned-response transport for exercising pool/orchestrator logic
//! without spawning a real agent process.

use std::collections::VecDeque;
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use iris_core::{CacheEntry, CacheEntryType};

use crate::core::TransportMetrics;
use crate::error::{TransportError, TransportResult};
use crate::state::TransportState;
use crate::transport::Transport;

/// A transport that returns pre-scripted responses instead of talking to a
/// real agent process. Every call is recorded for assertions.
pub struct MockTransport {
    state: StdMutex<TransportState>,
    responses: StdMutex<VecDeque<MockResponse>>,
    sent: StdMutex<Vec<String>>,
    terminated: StdMutex<bool>,
}

/// A scripted response for one `execute_tell` call.
pub enum MockResponse {
    /// Return this text as a successful assistant reply.
    Text(String),
    /// Complete the entry as an agent-reported error.
    Error(String),
    /// Never complete - the caller's timeout should fire.
    Hang,
}

impl MockTransport {
    /// Build a mock transport with a queue of scripted responses, consumed
    /// in order by successive `execute_tell` calls.
    #[must_use]
    pub fn new(responses: Vec<MockResponse>) -> Self {
        Self {
            state: StdMutex::new(TransportState::Stopped),
            responses: StdMutex::new(responses.into()),
            sent: StdMutex::new(Vec::new()),
            terminated: StdMutex::new(false),
        }
    }

    /// Every tell text sent to this transport, in order.
    #[must_use]
    pub fn sent_messages(&self) -> Vec<String> {
        self.sent.lock().expect("mock lock").clone()
    }

    /// Whether `terminate` has been called.
    #[must_use]
    pub fn was_terminated(&self) -> bool {
        *self.terminated.lock().expect("mock lock")
    }
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    async fn spawn(&self, _spawn_timeout: Duration) -> TransportResult<()> {
        *self.state.lock().expect("mock lock") = TransportState::Ready;
        Ok(())
    }

    async fn execute_tell(&self, text: &str, timeout: Duration) -> TransportResult<CacheEntry> {
        if *self.state.lock().expect("mock lock") != TransportState::Ready {
            return Err(TransportError::NotReady("mock not ready".to_string()));
        }
        self.sent.lock().expect("mock lock").push(text.to_string());

        let response = self.responses.lock().expect("mock lock").pop_front();
        match response {
            None | Some(MockResponse::Hang) => {
                tokio::time::sleep(timeout).await;
                Err(TransportError::ResponseTimeout(timeout))
            },
            Some(MockResponse::Text(body)) => {
                let mut entry = CacheEntry::new(CacheEntryType::Tell, text);
                entry.push_frame(serde_json::json!({
                    "type": "assistant",
                    "message": {"content": [{"type": "text", "text": body}]},
                }));
                entry.push_frame(serde_json::json!({"type": "result", "is_error": false}));
                Ok(entry)
            },
            Some(MockResponse::Error(message)) => {
                let mut entry = CacheEntry::new(CacheEntryType::Tell, text);
                entry.push_frame(serde_json::json!({"type": "error", "message": message}));
                Ok(entry)
            },
        }
    }

    async fn cancel(&self) -> TransportResult<()> {
        Ok(())
    }

    async fn terminate(&self) -> TransportResult<()> {
        *self.terminated.lock().expect("mock lock") = true;
        *self.state.lock().expect("mock lock") = TransportState::Stopped;
        Ok(())
    }

    async fn status(&self) -> TransportState {
        *self.state.lock().expect("mock lock")
    }

    async fn metrics(&self) -> TransportMetrics {
        TransportMetrics {
            started_at: chrono::Utc::now(),
            messages_processed: self.sent.lock().expect("mock lock").len() as u64,
            last_response_at: None,
        }
    }
}
