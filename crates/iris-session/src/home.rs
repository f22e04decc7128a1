//! Resolving the durable on-disk path of an agent's session file.
//!
//! The agent convention is `<home>/.claude/projects/<escaped-project-path>/<sessionId>.jsonl`,
//! where the escaped path replaces every `/` in the absolute project path
//! with `-`.

use std::io;
use std::path::{Path, PathBuf};

use iris_core::SessionId;

/// The user's home directory, resolved the same way the agent CLI resolves
/// it: `$HOME` with no Iris-specific override.
#[derive(Debug, Clone)]
pub struct IrisHome {
    root: PathBuf,
}

impl IrisHome {
    /// Resolve `$HOME`.
    ///
    /// # Errors
    ///
    /// Returns an error if `$HOME` is not set.
    pub fn resolve() -> io::Result<Self> {
        let home = std::env::var("HOME")
            .map_err(|_| io::Error::new(io::ErrorKind::NotFound, "HOME environment variable is not set"))?;
        Ok(Self { root: PathBuf::from(home) })
    }

    /// Construct from an explicit path (used by tests).
    #[must_use]
    pub fn from_path(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The directory holding all projects' session files.
    #[must_use]
    pub fn projects_dir(&self) -> PathBuf {
        self.root.join(".claude").join("projects")
    }

    /// The directory holding session files for a single project path.
    #[must_use]
    pub fn project_dir(&self, project_path: &str) -> PathBuf {
        self.projects_dir().join(escape_project_path(project_path))
    }

    /// The full path of a session's durable `.jsonl` file.
    #[must_use]
    pub fn session_file(&self, project_path: &str, session_id: SessionId) -> PathBuf {
        self.project_dir(project_path).join(format!("{session_id}.jsonl"))
    }
}

/// Replace path separators with `-`, matching the agent's escaping
/// convention for project directory names.
#[must_use]
pub fn escape_project_path(project_path: &str) -> String {
    project_path.replace(['/', '\\'], "-")
}

/// Whether a session's durable file exists on disk.
#[must_use]
pub fn session_file_exists(home: &IrisHome, project_path: &str, session_id: SessionId) -> bool {
    Path::new(&home.session_file(project_path, session_id)).is_file()
}
