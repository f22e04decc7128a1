//! Team configuration: the whole of Iris's in-scope configuration surface.
//!
//! A `TeamConfig` is an already-parsed snapshot handed to constructors; loading
//! it from a file, watching it for changes, and interpolating environment
//! variables are all the responsibility of a layer above this crate.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How a tool-call permission request should be handled for a team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrantPermission {
    /// Always allow.
    Yes,
    /// Always deny.
    No,
    /// Route through the pending-approval flow.
    Ask,
    /// Forward the decision to a connected frontend.
    Forward,
}

/// Explicit SSH options that override the user's parsed `~/.ssh/config` for a
/// remote team's host alias.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteOptions {
    /// Override the port (default 22).
    pub port: Option<u16>,
    /// Path to a private key identity file.
    pub identity_file: Option<String>,
    /// Passphrase for the identity file, if encrypted.
    pub passphrase: Option<String>,
    /// Connect timeout override.
    #[serde(default, with = "duration_millis_opt")]
    pub connect_timeout: Option<Duration>,
    /// Keepalive interval override.
    #[serde(default, with = "duration_millis_opt")]
    pub keepalive_interval: Option<Duration>,
    /// Whether to enforce strict host-key checking. Defaults to `true` when unset.
    pub strict_host_key_checking: Option<bool>,
}

mod duration_millis_opt {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(d) => serializer.serialize_some(&d.as_millis()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis: Option<u64> = Option::deserialize(deserializer)?;
        Ok(millis.map(Duration::from_millis))
    }
}

/// Configuration for a single team, as resolved before a transport or session
/// is ever created for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamConfig {
    /// The team's unique name.
    pub team_name: String,
    /// Local project directory, or the directory on the remote host.
    pub path: String,
    /// If set, this team's agent runs over SSH instead of as a local child
    /// process. Holds the raw `ssh`/`user@host` spec from which the host
    /// alias is derived.
    pub remote: Option<String>,
    /// Explicit per-team SSH overrides, layered over the parsed user config.
    pub remote_options: Option<RemoteOptions>,
    /// How long a transport may sit idle before self-terminating.
    #[serde(with = "duration_millis")]
    pub idle_timeout: Duration,
    /// Whether to launch the agent with `--dangerously-skip-permissions`.
    pub skip_permissions: bool,
    /// Tools the agent is allowed to invoke without further gating.
    pub allowed_tools: Vec<String>,
    /// Tools the agent is never allowed to invoke.
    pub disallowed_tools: Vec<String>,
    /// The team's fixed identity preamble, prepended to any per-team
    /// extension when building `--append-system-prompt`.
    pub identity_template: Option<String>,
    /// Per-team extension text, concatenated after `identity_template` to
    /// form the final `--append-system-prompt` value.
    pub append_system_prompt: Option<String>,
    /// How tool-call permission requests are handled for this team.
    pub grant_permission: GrantPermission,
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u128(value.as_millis())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

impl TeamConfig {
    /// Default idle timeout applied when a team's config omits one.
    pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

    /// Build a minimal local team config with sensible defaults.
    #[must_use]
    pub fn local(team_name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            team_name: team_name.into(),
            path: path.into(),
            remote: None,
            remote_options: None,
            idle_timeout: Self::DEFAULT_IDLE_TIMEOUT,
            skip_permissions: false,
            allowed_tools: Vec::new(),
            disallowed_tools: Vec::new(),
            identity_template: None,
            append_system_prompt: None,
            grant_permission: GrantPermission::Ask,
        }
    }

    /// Whether this team's agent runs over SSH.
    #[must_use]
    pub fn is_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// The full `--append-system-prompt` value: the identity template
    /// concatenated with the per-team extension, in that order. `None` if
    /// neither is set.
    #[must_use]
    pub fn system_prompt(&self) -> Option<String> {
        match (&self.identity_template, &self.append_system_prompt) {
            (Some(identity), Some(extension)) => Some(format!("{identity}\n\n{extension}")),
            (Some(identity), None) => Some(identity.clone()),
            (None, Some(extension)) => Some(extension.clone()),
            (None, None) => None,
        }
    }
}
