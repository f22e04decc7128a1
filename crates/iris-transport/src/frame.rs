//! Wire-level stdin/stdout framing for the agent's stream-json protocol.

use serde_json::Value;

/// Build the single-line JSON envelope written to stdin for a user message.
#[must_use]
pub fn build_user_envelope(text: &str) -> String {
    serde_json::json!({
        "type": "user",
        "message": {
            "role": "user",
            "content": [{"type": "text", "text": text}],
        }
    })
    .to_string()
}

/// Whether a parsed frame is the `system`/`init` frame that completes spawn.
#[must_use]
pub fn is_init_frame(frame: &Value) -> bool {
    frame.get("type").and_then(Value::as_str) == Some("system")
        && frame.get("subtype").and_then(Value::as_str) == Some("init")
}

/// Parse one line of agent stdout into a frame. Malformed lines are not an
/// error - the caller should log and skip them, per the "dumb pipe"
/// framing contract.
#[must_use]
pub fn parse_line(line: &str) -> Option<Value> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    serde_json::from_str(trimmed).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_round_trips_through_json() {
        let line = build_user_envelope("hello world");
        let parsed: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["type"], "user");
        assert_eq!(parsed["message"]["content"][0]["text"], "hello world");
    }

    #[test]
    fn recognizes_init_frame() {
        let frame: Value = serde_json::json!({"type": "system", "subtype": "init"});
        assert!(is_init_frame(&frame));
    }

    #[test]
    fn rejects_non_init_frames() {
        let frame: Value = serde_json::json!({"type": "assistant"});
        assert!(!is_init_frame(&frame));
    }

    #[test]
    fn blank_lines_parse_to_none() {
        assert!(parse_line("   ").is_none());
        assert!(parse_line("").is_none());
    }

    #[test]
    fn malformed_json_parses_to_none_not_error() {
        assert!(parse_line("{not json").is_none());
    }
}
