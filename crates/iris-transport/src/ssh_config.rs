//! Resolving the effective SSH configuration for a remote team.
//!
//! Precedence (highest first): explicit [`RemoteOptions`], the user's parsed
//! `~/.ssh/config` entry for the host alias, then built-in defaults.

use std::time::Duration;

use iris_core::RemoteOptions;

const DEFAULT_PORT: u16 = 22;
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_KEEPALIVE: Duration = Duration::from_secs(30);

/// The SSH connection parameters actually used to reach a remote team.
#[derive(Debug, Clone)]
pub struct ResolvedSshConfig {
    /// Resolved hostname or IP.
    pub host: String,
    /// Resolved port.
    pub port: u16,
    /// Resolved login user.
    pub user: String,
    /// Path to a private key identity file, if any.
    pub identity_file: Option<String>,
    /// Passphrase for the identity file, if encrypted.
    pub passphrase: Option<String>,
    /// Connect timeout.
    pub connect_timeout: Duration,
    /// Keepalive interval.
    pub keepalive_interval: Duration,
    /// Whether to verify the server's host key against the known_hosts file.
    pub strict_host_key_checking: bool,
}

/// Extract the host alias from a team's `remote` spec, e.g. `"ssh deploy@build-1"`
/// or `"build-1"` both yield `"build-1"`.
#[must_use]
pub fn host_alias(remote_spec: &str) -> String {
    let spec = remote_spec.strip_prefix("ssh ").unwrap_or(remote_spec).trim();
    match spec.rsplit_once('@') {
        Some((_user, host)) => host.to_string(),
        None => spec.to_string(),
    }
}

/// Extract the explicit login user from a team's `remote` spec, if one was
/// given as `user@host`.
#[must_use]
pub fn explicit_user(remote_spec: &str) -> Option<String> {
    let spec = remote_spec.strip_prefix("ssh ").unwrap_or(remote_spec).trim();
    spec.rsplit_once('@').map(|(user, _host)| user.to_string())
}

/// Resolve the effective SSH config for `remote_spec`, layering `overrides`
/// over the user's parsed SSH config for the derived host alias.
///
/// # Errors
///
/// Never fails on its own - a missing or unreadable `~/.ssh/config` simply
/// means the alias falls back to built-in defaults, same as OpenSSH does.
#[must_use]
pub fn resolve(remote_spec: &str, overrides: Option<&RemoteOptions>) -> ResolvedSshConfig {
    let alias = host_alias(remote_spec);
    let parsed = parse_user_config(&alias);

    let default_user = std::env::var("USER").unwrap_or_else(|_| "root".to_string());

    let host = parsed
        .as_ref()
        .and_then(|c| c.host_name.clone())
        .unwrap_or_else(|| alias.clone());

    // RemoteOptions carries no user override; an explicit `user@host` in the
    // team's `remote` spec always wins over the parsed config's `User` line.
    let user = explicit_user(remote_spec)
        .or_else(|| parsed.as_ref().and_then(|c| c.user.clone()))
        .unwrap_or(default_user);

    let port = overrides
        .and_then(|o| o.port)
        .or_else(|| parsed.as_ref().and_then(|c| c.port))
        .unwrap_or(DEFAULT_PORT);

    let identity_file = overrides
        .and_then(|o| o.identity_file.clone())
        .or_else(|| parsed.as_ref().and_then(|c| c.identity_file.clone()));

    let passphrase = overrides.and_then(|o| o.passphrase.clone());

    let connect_timeout = overrides
        .and_then(|o| o.connect_timeout)
        .unwrap_or(DEFAULT_CONNECT_TIMEOUT);

    let keepalive_interval = overrides
        .and_then(|o| o.keepalive_interval)
        .unwrap_or(DEFAULT_KEEPALIVE);

    let strict_host_key_checking = overrides
        .and_then(|o| o.strict_host_key_checking)
        .unwrap_or(true);

    ResolvedSshConfig {
        host,
        port,
        user,
        identity_file,
        passphrase,
        connect_timeout,
        keepalive_interval,
        strict_host_key_checking,
    }
}

struct ParsedUserConfig {
    host_name: Option<String>,
    port: Option<u16>,
    user: Option<String>,
    identity_file: Option<String>,
}

fn parse_user_config(alias: &str) -> Option<ParsedUserConfig> {
    let config = russh_config::parse_home(alias).ok()?;
    Some(ParsedUserConfig {
        host_name: Some(config.host_name),
        port: Some(config.port),
        user: Some(config.user),
        identity_file: config.identity_file,
    })
}

/// Escape a remote path for safe inclusion in a single-quoted shell string.
#[must_use]
pub fn escape_single_quoted(path: &str) -> String {
    format!("'{}'", path.replace('\'', "'\\''"))
}
