//! The cache entry: an append-only buffer of raw agent frames for one
//! in-flight request.
//!
//! A cache entry does not interpret the frames it holds. It only tracks
//! whether a terminal frame (`result` or `error`) has arrived; the pool layer
//! decides what counts as a user-facing response.

use serde_json::Value;

/// What kind of request produced this cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheEntryType {
    /// The one-shot "ping" sent immediately after spawn, to detect the
    /// agent's `init` frame. Never surfaced to a caller.
    Spawn,
    /// A user-initiated tell.
    Tell,
    /// A slash-command tell.
    Command,
}

/// An ordered buffer of raw JSON frames for a single request.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    kind: CacheEntryType,
    tell_string: String,
    frames: Vec<Value>,
    completed: bool,
    is_error: bool,
}

impl CacheEntry {
    /// Start a new, empty cache entry for the given outgoing text.
    #[must_use]
    pub fn new(kind: CacheEntryType, tell_string: impl Into<String>) -> Self {
        Self {
            kind,
            tell_string: tell_string.into(),
            frames: Vec::new(),
            completed: false,
            is_error: false,
        }
    }

    /// What kind of request this entry was opened for.
    #[must_use]
    pub fn kind(&self) -> CacheEntryType {
        self.kind
    }

    /// The text that was sent to the agent for this entry.
    #[must_use]
    pub fn tell_string(&self) -> &str {
        &self.tell_string
    }

    /// Append a parsed frame. A terminal frame marks the entry completed.
    pub fn push_frame(&mut self, frame: Value) {
        if is_terminal(&frame) {
            self.completed = true;
            self.is_error = frame_is_error(&frame);
        }
        self.frames.push(frame);
    }

    /// All frames observed so far, in arrival order.
    #[must_use]
    pub fn frames(&self) -> &[Value] {
        &self.frames
    }

    /// Whether a terminal frame has been observed.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Whether the terminal frame reported an error.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.is_error
    }

    /// Mark the entry completed with an error not derived from a frame (e.g.
    /// the process exited or a write failed).
    pub fn fail(&mut self) {
        self.completed = true;
        self.is_error = true;
    }
}

fn is_terminal(frame: &Value) -> bool {
    matches!(frame.get("type").and_then(Value::as_str), Some("result") | Some("error"))
}

fn frame_is_error(frame: &Value) -> bool {
    match frame.get("type").and_then(Value::as_str) {
        Some("error") => true,
        Some("result") => frame
            .get("is_error")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn starts_incomplete() {
        let entry = CacheEntry::new(CacheEntryType::Tell, "hello");
        assert!(!entry.is_completed());
        assert!(entry.frames().is_empty());
    }

    #[test]
    fn result_frame_completes_without_error() {
        let mut entry = CacheEntry::new(CacheEntryType::Tell, "hello");
        entry.push_frame(json!({"type": "assistant", "message": {"content": []}}));
        assert!(!entry.is_completed());
        entry.push_frame(json!({"type": "result", "is_error": false}));
        assert!(entry.is_completed());
        assert!(!entry.is_error());
    }

    #[test]
    fn result_frame_with_is_error_marks_failure() {
        let mut entry = CacheEntry::new(CacheEntryType::Tell, "hello");
        entry.push_frame(json!({"type": "result", "is_error": true}));
        assert!(entry.is_completed());
        assert!(entry.is_error());
    }

    #[test]
    fn explicit_error_frame_is_terminal() {
        let mut entry = CacheEntry::new(CacheEntryType::Command, "/status");
        entry.push_frame(json!({"type": "error", "message": "boom"}));
        assert!(entry.is_completed());
        assert!(entry.is_error());
    }

    #[test]
    fn fail_marks_completed_and_errored_without_a_frame() {
        let mut entry = CacheEntry::new(CacheEntryType::Tell, "hello");
        entry.fail();
        assert!(entry.is_completed());
        assert!(entry.is_error());
        assert!(entry.frames().is_empty());
    }
}
