//! Agent launch argument vectors, per the stream-json CLI contract.

use iris_core::{SessionId, TeamConfig};

const SHARED_FLAGS: &[&str] = &[
    "--print",
    "--verbose",
    "--input-format",
    "stream-json",
    "--output-format",
    "stream-json",
];

/// Build the argument vector used to resume an existing session.
#[must_use]
pub fn resume_args(session_id: SessionId, config: &TeamConfig) -> Vec<String> {
    let mut args = vec!["--resume".to_string(), session_id.to_string()];
    push_shared(&mut args, config);
    args
}

/// Build the argument vector used for session-file initialization: a
/// short-lived, non-resumed invocation that prints a single response and
/// exits.
#[must_use]
pub fn session_init_args(session_id: SessionId) -> Vec<String> {
    vec![
        "--session-id".to_string(),
        session_id.to_string(),
        "--print".to_string(),
        "ping".to_string(),
    ]
}

fn push_shared(args: &mut Vec<String>, config: &TeamConfig) {
    args.extend(SHARED_FLAGS.iter().map(ToString::to_string));

    if config.skip_permissions {
        args.push("--dangerously-skip-permissions".to_string());
    }
    if !config.allowed_tools.is_empty() {
        args.push("--allowed-tools".to_string());
        args.push(config.allowed_tools.join(","));
    }
    if !config.disallowed_tools.is_empty() {
        args.push("--disallowed-tools".to_string());
        args.push(config.disallowed_tools.join(","));
    }
    if let Some(prompt) = config.system_prompt() {
        args.push("--append-system-prompt".to_string());
        args.push(prompt);
    }
}
