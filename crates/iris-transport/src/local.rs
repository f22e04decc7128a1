//! Local transport: drives an agent subprocess over stdio.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use iris_core::{CacheEntry, CacheEntryType, SessionId, TeamConfig};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::Mutex;
use tracing::{Instrument, error, info, info_span};

use crate::args::resume_args;
use crate::core::{TransportCore, TransportMetrics};
use crate::error::{TransportError, TransportResult};
use crate::frame::build_user_envelope;
use crate::state::TransportState;
use crate::transport::Transport;

/// The command used to launch the agent CLI. Overridable for tests.
const DEFAULT_AGENT_BIN: &str = "claude";

const GRACEFUL_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// An agent process spawned and owned by this machine.
pub struct LocalTransport {
    config: TeamConfig,
    session_id: SessionId,
    agent_bin: String,
    core: Arc<TransportCore>,
    child: Mutex<Option<Child>>,
    stdin: Mutex<Option<ChildStdin>>,
}

impl LocalTransport {
    /// Build a transport for `config`, not yet spawned.
    #[must_use]
    pub fn new(config: TeamConfig, session_id: SessionId) -> Self {
        Self {
            config,
            session_id,
            agent_bin: DEFAULT_AGENT_BIN.to_string(),
            core: Arc::new(TransportCore::new()),
            child: Mutex::new(None),
            stdin: Mutex::new(None),
        }
    }

    /// Override the agent binary path (used by tests and alternate installs).
    #[must_use]
    pub fn with_agent_bin(mut self, bin: impl Into<String>) -> Self {
        self.agent_bin = bin.into();
        self
    }

    async fn write_line(&self, line: &str) -> TransportResult<()> {
        let mut guard = self.stdin.lock().await;
        let stdin = guard.as_mut().ok_or(TransportError::NotReady("no stdin".to_string()))?;
        stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|e| TransportError::Io(e.to_string()))?;
        stdin
            .write_all(b"\n")
            .await
            .map_err(|e| TransportError::Io(e.to_string()))?;
        stdin.flush().await.map_err(|e| TransportError::Io(e.to_string()))
    }
}

#[async_trait::async_trait]
impl Transport for LocalTransport {
    #[tracing::instrument(skip(self), fields(team = %self.config.team_name, session = %self.session_id))]
    async fn spawn(&self, spawn_timeout: Duration) -> TransportResult<()> {
        self.core.set_state(TransportState::Spawning).await;

        let args = resume_args(self.session_id, &self.config);
        let mut command = Command::new(&self.agent_bin);
        command
            .args(&args)
            .current_dir(&self.config.path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|e| {
            TransportError::SpawnFailed(format!("failed to launch {}: {e}", self.agent_bin))
        })?;

        let stdin = child.stdin.take().ok_or_else(|| TransportError::SpawnFailed("no stdin handle".to_string()))?;
        let stdout = child.stdout.take().ok_or_else(|| TransportError::SpawnFailed("no stdout handle".to_string()))?;
        let stderr = child.stderr.take();

        *self.stdin.lock().await = Some(stdin);
        *self.child.lock().await = Some(child);

        let core = Arc::clone(&self.core);
        let team = self.config.team_name.clone();
        tokio::spawn(
            async move {
                let mut reader = BufReader::new(stdout).lines();
                loop {
                    match reader.next_line().await {
                        Ok(Some(line)) => core.on_line(&line).await,
                        Ok(None) => break,
                        Err(e) => {
                            error!(error = %e, "error reading agent stdout");
                            break;
                        },
                    }
                }
                core.on_closed().await;
            }
            .instrument(info_span!("local_transport_reader", %team)),
        );

        if let Some(stderr) = stderr {
            tokio::spawn(
                async move {
                    let mut reader = BufReader::new(stderr).lines();
                    while let Ok(Some(line)) = reader.next_line().await {
                        if let Some(path) = line.strip_prefix("Logging to: ") {
                            info!(log_path = %path, "agent debug log location");
                        }
                    }
                }
                .instrument(info_span!("local_transport_stderr")),
            );
        }

        let notify = self.core.attach(CacheEntryType::Spawn, "ping").await;
        self.write_line(&build_user_envelope("ping")).await?;

        tokio::time::timeout(spawn_timeout, notify.notified())
            .await
            .map_err(|_| TransportError::InitTimeout(spawn_timeout))?;

        Ok(())
    }

    async fn execute_tell(&self, text: &str, timeout: Duration) -> TransportResult<CacheEntry> {
        if self.core.state().await != TransportState::Ready {
            return Err(TransportError::NotReady(self.core.state().await.to_string()));
        }
        self.core.set_state(TransportState::Busy).await;
        let notify = self.core.attach(CacheEntryType::Tell, text).await;
        self.write_line(&build_user_envelope(text)).await?;
        self.core.await_completion(notify, timeout).await
    }

    async fn cancel(&self) -> TransportResult<()> {
        let mut guard = self.stdin.lock().await;
        if let Some(stdin) = guard.as_mut() {
            // ESC byte: best-effort, the agent may ignore it.
            let _ = stdin.write_all(&[0x1b]).await;
            let _ = stdin.flush().await;
        }
        Ok(())
    }

    async fn terminate(&self) -> TransportResult<()> {
        self.core.set_state(TransportState::Terminating).await;
        let mut guard = self.child.lock().await;
        if let Some(child) = guard.as_mut() {
            #[cfg(unix)]
            {
                use nix::sys::signal::{Signal, kill};
                use nix::unistd::Pid;
                if let Some(id) = child.id() {
                    let _ = kill(Pid::from_raw(id as i32), Signal::SIGTERM);
                }
            }

            let graceful = tokio::time::timeout(GRACEFUL_SHUTDOWN_GRACE, child.wait()).await;
            if graceful.is_err() {
                let _ = child.start_kill();
                let _ = child.wait().await;
            }
        }
        drop(guard);
        self.core.set_state(TransportState::Stopped).await;
        Ok(())
    }

    async fn status(&self) -> TransportState {
        self.core.state().await
    }

    async fn metrics(&self) -> TransportMetrics {
        self.core.metrics().await
    }
}
