//! Team-name and project-path validation.
//!
//! Rejects anything that could escape the intended team directory or inject
//! shell metacharacters into a downstream command line.

use std::path::Path;

use crate::error::{CoreError, CoreResult};

const MAX_TEAM_NAME_LEN: usize = 100;
const DISALLOWED_TEAM_NAME_CHARS: &[char] = &[
    '/', '\\', ';', '&', '|', '$', '`', '\'', '"', '\0', '\n', '\r',
];

const SYSTEM_PATH_PREFIXES: &[&str] = &["/etc", "/usr/bin", "/System/", "/Windows/"];

/// Validate a team name: non-empty, bounded length, no path separators or
/// shell metacharacters, no `..` traversal.
pub fn validate_team_name(name: &str) -> CoreResult<()> {
    if name.is_empty() {
        return Err(CoreError::InvalidTeamName {
            name: name.to_string(),
            reason: "team name must not be empty".to_string(),
        });
    }
    if name.len() > MAX_TEAM_NAME_LEN {
        return Err(CoreError::InvalidTeamName {
            name: name.to_string(),
            reason: format!("team name exceeds {MAX_TEAM_NAME_LEN} bytes"),
        });
    }
    if name.contains("..") {
        return Err(CoreError::InvalidTeamName {
            name: name.to_string(),
            reason: "team name must not contain '..'".to_string(),
        });
    }
    if let Some(c) = name.chars().find(|c| DISALLOWED_TEAM_NAME_CHARS.contains(c) || c.is_control()) {
        return Err(CoreError::InvalidTeamName {
            name: name.to_string(),
            reason: format!("team name contains disallowed character {c:?}"),
        });
    }
    Ok(())
}

/// Validate a local project path: absolute, exists, and does not resolve
/// into a known system directory.
///
/// Remote teams skip this check entirely - the path is interpreted on the
/// remote host, which this process cannot inspect.
pub fn validate_project_path(path: &str) -> CoreResult<()> {
    let p = Path::new(path);
    if !p.is_absolute() {
        return Err(CoreError::InvalidPath {
            path: path.to_string(),
            reason: "path must be absolute".to_string(),
        });
    }

    let canonical = p.canonicalize().map_err(|e| CoreError::InvalidPath {
        path: path.to_string(),
        reason: format!("path does not exist or is unreadable: {e}"),
    })?;

    let canonical_str = canonical.to_string_lossy();
    if SYSTEM_PATH_PREFIXES
        .iter()
        .any(|prefix| canonical_str.starts_with(prefix))
    {
        return Err(CoreError::InvalidPath {
            path: path.to_string(),
            reason: "path resolves into a reserved system directory".to_string(),
        });
    }
    if canonical_str.contains("/.ssh") {
        return Err(CoreError::InvalidPath {
            path: path.to_string(),
            reason: "path resolves into a user's .ssh directory".to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_name() {
        assert!(validate_team_name("").is_err());
    }

    #[test]
    fn rejects_path_separators() {
        assert!(validate_team_name("alpha/beta").is_err());
    }

    #[test]
    fn rejects_shell_metacharacters() {
        assert!(validate_team_name("alpha;rm -rf").is_err());
    }

    #[test]
    fn rejects_traversal() {
        assert!(validate_team_name("../alpha").is_err());
    }

    #[test]
    fn accepts_plain_name() {
        assert!(validate_team_name("alpha-team_2").is_ok());
    }

    #[test]
    fn rejects_relative_path() {
        assert!(validate_project_path("relative/dir").is_err());
    }

    #[test]
    fn rejects_missing_path() {
        assert!(validate_project_path("/definitely/does/not/exist/xyz").is_err());
    }

    #[test]
    fn accepts_existing_absolute_path() {
        let dir = std::env::temp_dir();
        assert!(validate_project_path(dir.to_str().unwrap()).is_ok());
    }

    #[test]
    fn rejects_etc() {
        assert!(validate_project_path("/etc").is_err());
    }
}
