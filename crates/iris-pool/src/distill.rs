//! Turning an accumulated [`CacheEntry`] into the text a caller sees.
//!
//! The transport never interprets frame content beyond spawn/result
//! framing; this module does the interpretation the pool is responsible
//! for: concatenating the final `assistant` message's text blocks, or
//! falling back to accumulated `content_block_delta` text if that is all
//! the entry has.

use iris_core::CacheEntry;
use serde_json::Value;

/// Extract the user-facing response text from a completed cache entry.
///
/// Prefers the final `assistant` frame's concatenated text blocks; falls
/// back to accumulated `content_block_delta` text if no `assistant` frame
/// is present. Returns an empty string if neither form is found.
#[must_use]
pub fn distill_response(entry: &CacheEntry) -> String {
    if let Some(text) = assistant_text(entry.frames()) {
        return text;
    }
    streaming_delta_text(entry.frames())
}

fn assistant_text(frames: &[Value]) -> Option<String> {
    let message = frames
        .iter()
        .rev()
        .find(|frame| frame.get("type").and_then(Value::as_str) == Some("assistant"))?
        .get("message")?;

    let blocks = message.get("content")?.as_array()?;
    let text: String = blocks
        .iter()
        .filter(|block| block.get("type").and_then(Value::as_str) == Some("text"))
        .filter_map(|block| block.get("text").and_then(Value::as_str))
        .collect();

    if text.is_empty() { None } else { Some(text) }
}

/// Extract a human-readable message from a completed entry's terminal error
/// frame, for entries where [`CacheEntry::is_error`] is true.
///
/// Prefers an explicit `error` frame's `message` field; falls back to a
/// generic message naming the failing result frame if none is present.
#[must_use]
pub fn error_message(entry: &CacheEntry) -> String {
    entry
        .frames()
        .iter()
        .rev()
        .find(|frame| frame.get("type").and_then(Value::as_str) == Some("error"))
        .and_then(|frame| frame.get("message"))
        .and_then(Value::as_str)
        .map(ToString::to_string)
        .unwrap_or_else(|| "agent reported a failed result".to_string())
}

fn streaming_delta_text(frames: &[Value]) -> String {
    frames
        .iter()
        .filter(|frame| frame.get("type").and_then(Value::as_str) == Some("stream_event"))
        .filter_map(|frame| frame.get("event"))
        .filter(|event| event.get("type").and_then(Value::as_str) == Some("content_block_delta"))
        .filter_map(|event| event.get("delta"))
        .filter(|delta| delta.get("type").and_then(Value::as_str) == Some("text_delta"))
        .filter_map(|delta| delta.get("text").and_then(Value::as_str))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use iris_core::CacheEntryType;
    use serde_json::json;

    fn entry_with(frames: Vec<Value>) -> CacheEntry {
        let mut entry = CacheEntry::new(CacheEntryType::Tell, "hello");
        for frame in frames {
            entry.push_frame(frame);
        }
        entry
    }

    #[test]
    fn prefers_the_final_assistant_frame() {
        let entry = entry_with(vec![
            json!({"type": "assistant", "message": {"content": [{"type": "text", "text": "ignored"}]}}),
            json!({"type": "assistant", "message": {"content": [{"type": "text", "text": "hi "}, {"type": "text", "text": "there"}]}}),
        ]);
        assert_eq!(distill_response(&entry), "hi there");
    }

    #[test]
    fn falls_back_to_streamed_deltas() {
        let entry = entry_with(vec![
            json!({"type": "stream_event", "event": {"type": "content_block_delta", "delta": {"type": "text_delta", "text": "par"}}}),
            json!({"type": "stream_event", "event": {"type": "content_block_delta", "delta": {"type": "text_delta", "text": "tial"}}}),
        ]);
        assert_eq!(distill_response(&entry), "partial");
    }

    #[test]
    fn empty_when_neither_form_is_present() {
        let entry = entry_with(vec![json!({"type": "system", "subtype": "init"})]);
        assert_eq!(distill_response(&entry), "");
    }
}
