//! Per-target FIFO dispatch over the session manager and process pool.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use chrono::Utc;
use iris_core::TaskId;
use iris_pool::ProcessPool;
use iris_session::SessionManager;
use tokio::sync::{Mutex, oneshot};
use tracing::{info, instrument, warn};

use crate::error::{OrchestratorError, OrchestratorResult};
use crate::task::{AsyncTaskResult, QueuedTask, TaskSpec};

const MAX_QUEUE_SIZE: usize = 100;
const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(30);

struct TargetQueue {
    tasks: VecDeque<QueuedTask>,
    worker_running: bool,
}

impl TargetQueue {
    fn new() -> Self {
        Self {
            tasks: VecDeque::new(),
            worker_running: false,
        }
    }
}

/// Accepts tell/command/sleep operations, serializes them per target team,
/// and dispatches them through the session manager and process pool.
pub struct Orchestrator {
    session_manager: Arc<SessionManager>,
    pool: Arc<ProcessPool>,
    queues: Arc<Mutex<HashMap<String, TargetQueue>>>,
    default_timeout: Duration,
    shutting_down: Arc<AtomicBool>,
}

impl Orchestrator {
    /// Build an orchestrator over the given session manager and pool.
    #[must_use]
    pub fn new(session_manager: Arc<SessionManager>, pool: Arc<ProcessPool>) -> Self {
        Self {
            session_manager,
            pool,
            queues: Arc::new(Mutex::new(HashMap::new())),
            default_timeout: DEFAULT_TASK_TIMEOUT,
            shutting_down: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Override the default per-task timeout.
    #[must_use]
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Enqueue a task for its target's FIFO and return its id immediately;
    /// does not await completion.
    #[instrument(skip(self, spec), fields(to = %spec.to_team, kind = spec.kind.label()))]
    pub async fn enqueue(&self, spec: TaskSpec) -> OrchestratorResult<TaskId> {
        self.enqueue_inner(spec, None).await
    }

    /// Enqueue a task and return a receiver that resolves with its result,
    /// for callers that want to await completion without bypassing the FIFO.
    pub async fn enqueue_and_watch(
        &self,
        spec: TaskSpec,
    ) -> OrchestratorResult<(TaskId, oneshot::Receiver<AsyncTaskResult>)> {
        let (tx, rx) = oneshot::channel();
        let id = self.enqueue_inner(spec, Some(tx)).await?;
        Ok((id, rx))
    }

    async fn enqueue_inner(
        &self,
        spec: TaskSpec,
        result_tx: Option<oneshot::Sender<AsyncTaskResult>>,
    ) -> OrchestratorResult<TaskId> {
        if self.shutting_down.load(Ordering::Acquire) {
            return Err(OrchestratorError::ShuttingDown);
        }

        let to_team = spec.to_team.clone();
        let from_team = spec.from_team.clone();
        let id = TaskId::new();
        let task = QueuedTask { id, spec, result_tx };

        let should_spawn_worker = {
            let mut queues = self.queues.lock().await;
            let queue = queues.entry(to_team.clone()).or_insert_with(TargetQueue::new);
            if queue.tasks.len() >= MAX_QUEUE_SIZE {
                return Err(OrchestratorError::QueueFull(to_team));
            }
            queue.tasks.push_back(task);
            if queue.worker_running {
                false
            } else {
                queue.worker_running = true;
                true
            }
        };

        // Tracked so the pool can see queue depth when deciding eviction
        // eligibility (§4.4: idle requires no task for the key still queued).
        self.pool.note_task_enqueued(&from_team, &to_team).await;

        if should_spawn_worker {
            self.spawn_worker(to_team);
        }

        Ok(id)
    }

    fn spawn_worker(&self, target: String) {
        let session_manager = self.session_manager.clone();
        let pool = self.pool.clone();
        let queues = self.queues.clone();
        let default_timeout = self.default_timeout;

        tokio::spawn(async move {
            loop {
                let next = {
                    let mut queues = queues.lock().await;
                    let Some(queue) = queues.get_mut(&target) else { break };
                    match queue.tasks.pop_front() {
                        Some(task) => Some(task),
                        None => {
                            queue.worker_running = false;
                            None
                        },
                    }
                };

                let Some(task) = next else { break };
                pool.note_task_dequeued(&task.spec.from_team, &target).await;
                dispatch_one(&session_manager, &pool, default_timeout, task).await;
            }
        });
    }

    /// The synchronous facade: resolve the session then send directly
    /// through the pool, bypassing the target's FIFO.
    ///
    /// Correctness between this path and the queued path relies on the
    /// transport's own `busy` rejection, not on any coordination here: a
    /// caller using both paths for the same target simply contends for the
    /// same transport.
    #[instrument(skip(self, text), fields(to = %to_team))]
    pub async fn send_message(
        &self,
        from_team: &str,
        to_team: &str,
        text: &str,
        timeout: Option<Duration>,
    ) -> OrchestratorResult<String> {
        let session = self.session_manager.get_or_create_session(from_team, to_team).await?;
        let response = self
            .pool
            .send_message(from_team, to_team, session.session_id, text, timeout)
            .await?;
        Ok(response)
    }

    /// Close every per-target FIFO and terminate the pool. Already-queued
    /// tasks are dropped without producing a result.
    pub async fn shutdown(&self) {
        self.shutting_down.store(true, Ordering::Release);
        let mut queues = self.queues.lock().await;
        for (target, queue) in queues.drain() {
            if !queue.tasks.is_empty() {
                warn!(%target, dropped = queue.tasks.len(), "dropped queued tasks on shutdown");
            }
            for task in &queue.tasks {
                self.pool.note_task_dequeued(&task.spec.from_team, &target).await;
            }
        }
        drop(queues);
        self.pool.terminate_all().await;
        info!("orchestrator shut down");
    }
}

async fn dispatch_one(session_manager: &Arc<SessionManager>, pool: &Arc<ProcessPool>, default_timeout: Duration, task: QueuedTask) {
    let started = Instant::now();
    let timeout = task.spec.timeout.unwrap_or(default_timeout);
    let dispatch_text = task.spec.dispatch_text();

    let outcome = async {
        let session = session_manager.get_or_create_session(&task.spec.from_team, &task.spec.to_team).await?;
        session_manager.touch(session.session_id).await?;
        let response = pool
            .send_message(&task.spec.from_team, &task.spec.to_team, session.session_id, &dispatch_text, Some(timeout))
            .await?;
        session_manager.mark_responded(session.session_id).await?;
        Ok::<String, OrchestratorError>(response)
    }
    .await;

    let (success, response, error) = match outcome {
        Ok(response) => (true, Some(response), None),
        Err(err) => (false, None, Some(err.to_string())),
    };

    if !success {
        if let Some(error) = &error {
            warn!(to = %task.spec.to_team, %error, "task dispatch failed");
        }
    }

    let result = AsyncTaskResult {
        task_id: task.id,
        kind_label: task.spec.kind.label(),
        to_team: task.spec.to_team.clone(),
        success,
        response,
        error,
        duration: started.elapsed(),
        completed_at: Utc::now(),
    };

    if let Some(tx) = task.result_tx {
        let _ = tx.send(result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iris_core::TeamConfig;
    use iris_pool::PoolConfig;
    use iris_session::LocalProcessInitRunner;
    use iris_storage::{Database, SessionStore};
    use std::collections::HashMap as StdHashMap;
    use std::time::Duration;

    async fn harness(team_names: &[&str]) -> Orchestrator {
        let mut teams = StdHashMap::new();
        for name in team_names {
            teams.insert((*name).to_string(), TeamConfig::local(*name, "/tmp"));
        }
        let db = Database::connect_memory().await.unwrap();
        let session_manager = Arc::new(SessionManager::new(
            teams.clone(),
            SessionStore::new(db),
            Arc::new(LocalProcessInitRunnerStub),
        ));
        let pool = Arc::new(ProcessPool::new(teams, PoolConfig {
            spawn_timeout: Duration::from_millis(50),
            ..PoolConfig::default()
        }));
        Orchestrator::new(session_manager, pool)
    }

    struct LocalProcessInitRunnerStub;

    #[async_trait::async_trait]
    impl iris_session::SessionInitRunner for LocalProcessInitRunnerStub {
        async fn init_session(
            &self,
            _config: &TeamConfig,
            _session_id: iris_core::SessionId,
            _timeout: Duration,
        ) -> iris_session::SessionResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn enqueue_succeeds_and_returns_a_task_id() {
        let orchestrator = harness(&["caller", "alpha"]).await;
        let result = orchestrator.enqueue(TaskSpec::tell("caller", "alpha", "hi")).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn queue_full_is_rejected() {
        let orchestrator = harness(&["caller", "alpha"]).await;

        // Pre-fill the target's FIFO directly (bypassing the worker, which
        // would otherwise race to drain it) so this test is deterministic.
        {
            let mut queues = orchestrator.queues.lock().await;
            let queue = queues.entry("alpha".to_string()).or_insert_with(TargetQueue::new);
            queue.worker_running = true; // suppress spawning a real worker
            for _ in 0..MAX_QUEUE_SIZE {
                queue.tasks.push_back(QueuedTask {
                    id: TaskId::new(),
                    spec: TaskSpec::tell("caller", "alpha", "x"),
                    result_tx: None,
                });
            }
        }

        let result = orchestrator.enqueue(TaskSpec::tell("caller", "alpha", "one more")).await;
        assert!(matches!(result, Err(OrchestratorError::QueueFull(_))));
    }

    #[tokio::test]
    async fn shutdown_rejects_further_enqueues() {
        let orchestrator = harness(&["caller", "alpha"]).await;
        orchestrator.shutdown().await;
        let result = orchestrator.enqueue(TaskSpec::tell("caller", "alpha", "hi")).await;
        assert!(matches!(result, Err(OrchestratorError::ShuttingDown)));
    }

    #[test]
    fn command_dispatch_text_includes_args() {
        let spec = TaskSpec::command("caller", "alpha", "compact", Some("now".to_string()));
        assert_eq!(spec.dispatch_text(), "/compact now");
        let spec = TaskSpec::command("caller", "alpha", "compact", None);
        assert_eq!(spec.dispatch_text(), "/compact");
    }
}
