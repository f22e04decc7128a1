//! Task shapes flowing through the per-target queues.

use std::time::Duration;

use chrono::{DateTime, Utc};
use iris_core::TaskId;

/// What kind of operation a task represents.
#[derive(Debug, Clone)]
pub enum TaskKind {
    /// A plain tell: `content` is sent to the agent verbatim.
    Tell,
    /// A slash command: formatted as `/<name>` or `/<name> <args>` before
    /// being sent as a tell.
    Command {
        /// Command name, without the leading slash.
        name: String,
        /// Optional argument string appended after the name.
        args: Option<String>,
    },
    /// A sleep instruction: sent as a tell; reserved for future
    /// specialization (e.g. a dedicated wire message the agent interprets
    /// natively instead of as free text).
    Sleep,
}

impl TaskKind {
    /// A short, stable label for metrics/logging.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Tell => "tell",
            Self::Command { .. } => "command",
            Self::Sleep => "sleep",
        }
    }
}

/// What a caller submits to [`crate::Orchestrator::enqueue`].
#[derive(Debug, Clone)]
pub struct TaskSpec {
    /// Team on whose behalf this task runs.
    pub from_team: String,
    /// Team the task addresses.
    pub to_team: String,
    /// What kind of operation this is.
    pub kind: TaskKind,
    /// The tell text (for `Command`, the un-formatted argument payload).
    pub content: String,
    /// Per-task deadline; defaults to the orchestrator's configured default.
    pub timeout: Option<Duration>,
}

impl TaskSpec {
    /// Build a plain tell task.
    #[must_use]
    pub fn tell(from_team: impl Into<String>, to_team: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            from_team: from_team.into(),
            to_team: to_team.into(),
            kind: TaskKind::Tell,
            content: content.into(),
            timeout: None,
        }
    }

    /// Build a slash-command task.
    #[must_use]
    pub fn command(
        from_team: impl Into<String>,
        to_team: impl Into<String>,
        name: impl Into<String>,
        args: Option<String>,
    ) -> Self {
        Self {
            from_team: from_team.into(),
            to_team: to_team.into(),
            kind: TaskKind::Command { name: name.into(), args },
            content: String::new(),
            timeout: None,
        }
    }

    /// The text actually sent to the transport for this task.
    #[must_use]
    pub fn dispatch_text(&self) -> String {
        match &self.kind {
            TaskKind::Tell | TaskKind::Sleep => self.content.clone(),
            TaskKind::Command { name, args } => match args {
                Some(args) => format!("/{name} {args}"),
                None => format!("/{name}"),
            },
        }
    }
}

/// A task's outcome, produced once its dispatch completes.
#[derive(Debug, Clone)]
pub struct AsyncTaskResult {
    /// The task's assigned id.
    pub task_id: TaskId,
    /// What kind of task this was.
    pub kind_label: &'static str,
    /// The team the task addressed.
    pub to_team: String,
    /// Whether the dispatch succeeded.
    pub success: bool,
    /// The distilled response text, if successful.
    pub response: Option<String>,
    /// The error message, if unsuccessful.
    pub error: Option<String>,
    /// Wall-clock duration of the dispatch.
    pub duration: Duration,
    /// When the task finished.
    pub completed_at: DateTime<Utc>,
}

pub(crate) struct QueuedTask {
    pub(crate) id: TaskId,
    pub(crate) spec: TaskSpec,
    pub(crate) result_tx: Option<tokio::sync::oneshot::Sender<AsyncTaskResult>>,
}
