//! The bounded, idle-evictable pool of live transports.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use iris_core::{CacheEntryType, SessionId, TeamConfig};
use iris_transport::TransportState;
use tokio::sync::{Mutex, Notify};
use tracing::{info, instrument, warn};

use crate::distill::{distill_response, error_message};
use crate::error::{PoolError, PoolResult};
use crate::factory::{DefaultTransportFactory, TransportFactory};
use crate::handle::TransportHandle;

const DEFAULT_MAX_PROCESSES: usize = 16;
const DEFAULT_HEALTH_SWEEP_INTERVAL: Duration = Duration::from_secs(30);
const DEFAULT_SPAWN_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_TELL_TIMEOUT: Duration = Duration::from_secs(30);

/// Pool-wide tunables.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum number of live transports held at once.
    pub max_processes: usize,
    /// How often [`ProcessPool::run_health_sweep`] should be called by an
    /// owning loop.
    pub health_sweep_interval: Duration,
    /// Deadline for a freshly spawned transport's `init` frame.
    pub spawn_timeout: Duration,
    /// Default deadline for a single tell when the caller doesn't specify one.
    pub default_tell_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_processes: DEFAULT_MAX_PROCESSES,
            health_sweep_interval: DEFAULT_HEALTH_SWEEP_INTERVAL,
            spawn_timeout: DEFAULT_SPAWN_TIMEOUT,
            default_tell_timeout: DEFAULT_TELL_TIMEOUT,
        }
    }
}

type Key = (String, String);

enum Slot {
    Spawning(Arc<Notify>),
    Ready(Arc<TransportHandle>),
}

/// A point-in-time snapshot of one pooled transport's status.
#[derive(Debug, Clone)]
pub struct TransportStatusSnapshot {
    /// Source team.
    pub from_team: String,
    /// Destination team.
    pub to_team: String,
    /// Lifecycle state.
    pub state: TransportState,
}

/// Owns at most `maxProcesses` transports keyed by `(fromTeam, toTeam)`,
/// spawning on first use and evicting the least-recently-used idle entry
/// when the pool is full.
pub struct ProcessPool {
    teams: HashMap<String, TeamConfig>,
    config: PoolConfig,
    entries: Mutex<HashMap<Key, Slot>>,
    factory: Arc<dyn TransportFactory>,
    /// Count of tasks an external scheduler (the orchestrator) has reported
    /// as still sitting in a target's queue. The pool itself never enqueues
    /// anything here - it only reads this to decide eviction eligibility,
    /// per §4.4's "no task for its key is in the orchestrator queue" clause.
    pending_tasks: Mutex<HashMap<Key, usize>>,
}

impl ProcessPool {
    /// Build a pool over the given team registry, using local/remote
    /// transports chosen by each team's configuration.
    #[must_use]
    pub fn new(teams: HashMap<String, TeamConfig>, config: PoolConfig) -> Self {
        Self::with_factory(teams, config, Arc::new(DefaultTransportFactory))
    }

    /// Build a pool with an explicit transport factory, for tests that
    /// substitute a [`iris_transport::MockTransport`].
    #[must_use]
    pub fn with_factory(teams: HashMap<String, TeamConfig>, config: PoolConfig, factory: Arc<dyn TransportFactory>) -> Self {
        Self {
            teams,
            config,
            entries: Mutex::new(HashMap::new()),
            factory,
            pending_tasks: Mutex::new(HashMap::new()),
        }
    }

    /// Record that a task targeting `(from_team, to_team)` has been placed
    /// on the orchestrator's queue for that pair. Called by the orchestrator
    /// on enqueue; has no effect on a pool that is never paired with a queue
    /// (e.g. tests using only the synchronous facade).
    pub async fn note_task_enqueued(&self, from_team: &str, to_team: &str) {
        let key = (from_team.to_string(), to_team.to_string());
        let mut pending = self.pending_tasks.lock().await;
        let count = pending.entry(key).or_insert(0);
        *count = count.saturating_add(1);
    }

    /// Record that a previously-enqueued task for `(from_team, to_team)` has
    /// been popped off the orchestrator's queue (dispatched or dropped).
    /// Called by the orchestrator once per matching `note_task_enqueued`.
    pub async fn note_task_dequeued(&self, from_team: &str, to_team: &str) {
        let key = (from_team.to_string(), to_team.to_string());
        let mut pending = self.pending_tasks.lock().await;
        if let Some(count) = pending.get_mut(&key) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                pending.remove(&key);
            }
        }
    }

    async fn queued_count(&self, key: &Key) -> usize {
        self.pending_tasks.lock().await.get(key).copied().unwrap_or(0)
    }

    fn team_config(&self, to_team: &str) -> PoolResult<&TeamConfig> {
        self.teams.get(to_team).ok_or_else(|| PoolError::UnknownTeam(to_team.to_string()))
    }

    /// Return the transport for `(from_team, to_team)`, spawning and
    /// inserting one if none exists yet.
    #[instrument(skip(self), fields(from = %from_team, to = %to_team))]
    pub async fn get_or_create_transport(
        &self,
        from_team: &str,
        to_team: &str,
        session_id: SessionId,
    ) -> PoolResult<Arc<TransportHandle>> {
        let key = (from_team.to_string(), to_team.to_string());

        loop {
            let wait_on = {
                let mut entries = self.entries.lock().await;
                match entries.get(&key) {
                    Some(Slot::Ready(handle)) if !handle.transport.status().await.is_terminal() => {
                        return Ok(handle.clone());
                    },
                    Some(Slot::Ready(_)) => {
                        entries.remove(&key);
                        None
                    },
                    Some(Slot::Spawning(notify)) => Some(notify.clone()),
                    None => {
                        let notify = Arc::new(Notify::new());
                        entries.insert(key.clone(), Slot::Spawning(notify));
                        None
                    },
                }
            };

            if let Some(notify) = wait_on {
                notify.notified().await;
                continue;
            }

            return self.spawn_and_insert(from_team, to_team, session_id, key).await;
        }
    }

    async fn spawn_and_insert(
        &self,
        from_team: &str,
        to_team: &str,
        session_id: SessionId,
        key: Key,
    ) -> PoolResult<Arc<TransportHandle>> {
        self.evict_if_full(&key).await;

        let config = match self.team_config(to_team) {
            Ok(config) => config.clone(),
            Err(err) => {
                self.clear_placeholder(&key).await;
                return Err(err);
            },
        };

        let transport = self.factory.create(config, session_id);

        match transport.spawn(self.config.spawn_timeout).await {
            Ok(()) => {
                let handle = Arc::new(TransportHandle::new(from_team, to_team, transport));
                let mut entries = self.entries.lock().await;
                let notify = match entries.remove(&key) {
                    Some(Slot::Spawning(notify)) => notify,
                    _ => Arc::new(Notify::new()),
                };
                entries.insert(key, Slot::Ready(handle.clone()));
                notify.notify_waiters();
                info!(%to_team, %session_id, "spawned transport");
                Ok(handle)
            },
            Err(err) => {
                self.clear_placeholder(&key).await;
                Err(err.into())
            },
        }
    }

    async fn clear_placeholder(&self, key: &Key) {
        let mut entries = self.entries.lock().await;
        if let Some(Slot::Spawning(notify)) = entries.remove(key) {
            notify.notify_waiters();
        }
    }

    /// Evict the least-recently-used idle transport if the pool is at
    /// capacity. `incoming`'s own placeholder is already inserted by the
    /// time this runs, so it is excluded from both the count and the
    /// eviction search.
    async fn evict_if_full(&self, incoming: &Key) {
        let candidate = {
            let entries = self.entries.lock().await;
            let other_count = entries.len().saturating_sub(usize::from(entries.contains_key(incoming)));
            if other_count < self.config.max_processes {
                return;
            }
            let mut oldest: Option<(Key, Arc<TransportHandle>)> = None;
            for (key, slot) in entries.iter() {
                if key == incoming {
                    continue;
                }
                let Slot::Ready(handle) = slot else { continue };
                let queued = self.queued_count(key).await;
                if handle.is_idle(queued).await {
                    let last_used = handle.last_used_at().await;
                    let replace = match &oldest {
                        None => true,
                        Some((_, current)) => last_used < current.last_used_at().await,
                    };
                    if replace {
                        oldest = Some((key.clone(), handle.clone()));
                    }
                }
            }
            oldest
        };

        if let Some((key, handle)) = candidate {
            let _ = handle.transport.terminate().await;
            self.entries.lock().await.remove(&key);
            warn!(from = %key.0, to = %key.1, "evicted idle transport to make room");
        }
    }

    /// Fetch-or-create the transport for `(from_team, to_team)`, send
    /// `text` as a tell, and return the distilled response text.
    #[instrument(skip(self, text), fields(to = %to_team))]
    pub async fn send_message(
        &self,
        from_team: &str,
        to_team: &str,
        session_id: SessionId,
        text: &str,
        timeout: Option<Duration>,
    ) -> PoolResult<String> {
        let timeout = timeout.unwrap_or(self.config.default_tell_timeout);
        let handle = self.get_or_create_transport(from_team, to_team, session_id).await?;

        if !handle.mark_in_flight() {
            return Err(PoolError::Transport(iris_transport::TransportError::Busy));
        }
        handle.touch().await;
        let result = handle.transport.execute_tell(text, timeout).await;
        handle.clear_in_flight();

        let entry = result?;
        debug_assert!(matches!(entry.kind(), CacheEntryType::Tell | CacheEntryType::Command));
        if entry.is_error() {
            return Err(PoolError::AgentError(error_message(&entry)));
        }
        Ok(distill_response(&entry))
    }

    /// Gracefully terminate and remove the transport for `(from_team, to_team)`.
    pub async fn terminate_process(&self, from_team: &str, to_team: &str) -> PoolResult<()> {
        let key = (from_team.to_string(), to_team.to_string());
        let handle = {
            let mut entries = self.entries.lock().await;
            match entries.remove(&key) {
                Some(Slot::Ready(handle)) => Some(handle),
                Some(other) => {
                    entries.insert(key.clone(), other);
                    None
                },
                None => None,
            }
        };
        let Some(handle) = handle else {
            return Err(PoolError::NotFound(format!("{from_team}->{to_team}")));
        };
        handle.transport.terminate().await?;
        Ok(())
    }

    /// Terminate every live transport.
    pub async fn terminate_all(&self) {
        let handles: Vec<Arc<TransportHandle>> = {
            let mut entries = self.entries.lock().await;
            let handles = entries
                .values()
                .filter_map(|slot| match slot {
                    Slot::Ready(handle) => Some(handle.clone()),
                    Slot::Spawning(_) => None,
                })
                .collect();
            entries.clear();
            handles
        };
        for handle in handles {
            let _ = handle.transport.terminate().await;
        }
    }

    /// Snapshot the state of every live transport.
    pub async fn get_status(&self) -> Vec<TransportStatusSnapshot> {
        let entries = self.entries.lock().await;
        let mut snapshots = Vec::new();
        for slot in entries.values() {
            if let Slot::Ready(handle) = slot {
                snapshots.push(TransportStatusSnapshot {
                    from_team: handle.from_team.clone(),
                    to_team: handle.to_team.clone(),
                    state: handle.transport.status().await,
                });
            }
        }
        snapshots
    }

    /// Remove every transport whose state is `stopped` or `error`, without
    /// calling `terminate` (they are already gone or unusable).
    #[instrument(skip(self))]
    pub async fn run_health_sweep(&self) -> usize {
        let mut entries = self.entries.lock().await;
        let mut dead = Vec::new();
        for (key, slot) in entries.iter() {
            if let Slot::Ready(handle) = slot {
                if handle.transport.status().await.is_terminal() {
                    dead.push(key.clone());
                }
            }
        }
        for key in &dead {
            entries.remove(key);
        }
        if !dead.is_empty() {
            info!(count = dead.len(), "health sweep reaped dead transports");
        }
        dead.len()
    }

    /// How many transports are currently live.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Whether the pool currently holds no transports.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iris_core::TeamConfig;
    use iris_transport::{MockResponse, MockTransport, Transport};
    use std::sync::Mutex as StdMutex;

    fn team(name: &str) -> TeamConfig {
        TeamConfig::local(name, "/tmp")
    }

    /// A factory that always hands out the same scripted mock, so tests can
    /// drive `ProcessPool` end-to-end without a real agent binary.
    struct MockFactory {
        responses: StdMutex<Vec<MockResponse>>,
    }

    impl TransportFactory for MockFactory {
        fn create(&self, _config: TeamConfig, _session_id: SessionId) -> Arc<dyn Transport> {
            let responses = std::mem::take(&mut *self.responses.lock().unwrap());
            Arc::new(MockTransport::new(responses))
        }
    }

    fn mock_pool(teams: HashMap<String, TeamConfig>, config: PoolConfig, responses: Vec<MockResponse>) -> ProcessPool {
        ProcessPool::with_factory(teams, config, Arc::new(MockFactory { responses: StdMutex::new(responses) }))
    }

    #[tokio::test]
    async fn get_or_create_transport_spawns_once_then_reuses() {
        let mut teams = HashMap::new();
        teams.insert("alpha".to_string(), team("alpha"));
        let pool = mock_pool(teams, PoolConfig::default(), vec![MockResponse::Text("pong".to_string())]);

        let session_id = SessionId::new();
        let first = pool.get_or_create_transport("caller", "alpha", session_id).await.unwrap();
        let second = pool.get_or_create_transport("caller", "alpha", session_id).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(pool.len().await, 1);
    }

    #[tokio::test]
    async fn unknown_team_is_rejected() {
        let pool = ProcessPool::new(HashMap::new(), PoolConfig::default());
        let result = pool.get_or_create_transport("caller", "nobody", SessionId::new()).await;
        assert!(matches!(result, Err(PoolError::UnknownTeam(_))));
    }

    #[tokio::test]
    async fn send_message_distills_the_canned_response() {
        let mut teams = HashMap::new();
        teams.insert("alpha".to_string(), team("alpha"));
        let pool = mock_pool(teams, PoolConfig::default(), vec![MockResponse::Text("pong".to_string())]);

        let response = pool.send_message("caller", "alpha", SessionId::new(), "ping", None).await.unwrap();
        assert_eq!(response, "pong");
    }

    #[tokio::test]
    async fn send_message_surfaces_agent_errors() {
        let mut teams = HashMap::new();
        teams.insert("alpha".to_string(), team("alpha"));
        let pool = mock_pool(teams, PoolConfig::default(), vec![MockResponse::Error("boom".to_string())]);

        // execute_tell itself succeeds (transport-level), but the entry's
        // result frame is marked is_error, so the task must still fail.
        let result = pool.send_message("caller", "alpha", SessionId::new(), "ping", None).await;
        match result {
            Err(PoolError::AgentError(message)) => assert_eq!(message, "boom"),
            other => panic!("expected PoolError::AgentError, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn eviction_makes_room_for_a_new_pair_at_capacity() {
        let mut teams = HashMap::new();
        teams.insert("alpha".to_string(), team("alpha"));
        teams.insert("beta".to_string(), team("beta"));
        let pool = mock_pool(
            teams,
            PoolConfig { max_processes: 1, ..PoolConfig::default() },
            vec![MockResponse::Text("a".to_string()), MockResponse::Text("b".to_string())],
        );

        pool.get_or_create_transport("caller", "alpha", SessionId::new()).await.unwrap();
        assert_eq!(pool.len().await, 1);
        pool.get_or_create_transport("caller", "beta", SessionId::new()).await.unwrap();
        assert_eq!(pool.len().await, 1);

        let statuses = pool.get_status().await;
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].to_team, "beta");
    }

    #[tokio::test]
    async fn eviction_skips_a_pair_with_queued_tasks() {
        let mut teams = HashMap::new();
        teams.insert("alpha".to_string(), team("alpha"));
        teams.insert("beta".to_string(), team("beta"));
        let pool = mock_pool(
            teams,
            PoolConfig { max_processes: 1, ..PoolConfig::default() },
            vec![MockResponse::Text("a".to_string()), MockResponse::Text("b".to_string())],
        );

        pool.get_or_create_transport("caller", "alpha", SessionId::new()).await.unwrap();
        // A task is still sitting in alpha's orchestrator queue, so alpha
        // must not be picked for eviction even though its transport is
        // otherwise idle.
        pool.note_task_enqueued("caller", "alpha").await;

        pool.get_or_create_transport("caller", "beta", SessionId::new()).await.unwrap();

        let statuses = pool.get_status().await;
        let to_teams: Vec<&str> = statuses.iter().map(|s| s.to_team.as_str()).collect();
        assert!(to_teams.contains(&"alpha"), "alpha must survive eviction while tasks are queued for it");
    }

    #[tokio::test]
    async fn terminate_process_on_unknown_key_errors() {
        let pool = ProcessPool::new(HashMap::new(), PoolConfig::default());
        let result = pool.terminate_process("caller", "alpha").await;
        assert!(matches!(result, Err(PoolError::NotFound(_))));
    }

    #[tokio::test]
    async fn health_sweep_reaps_terminated_transports() {
        let mut teams = HashMap::new();
        teams.insert("alpha".to_string(), team("alpha"));
        let pool = mock_pool(teams, PoolConfig::default(), vec![]);

        let handle = pool.get_or_create_transport("caller", "alpha", SessionId::new()).await.unwrap();
        handle.transport().terminate().await.unwrap();

        let reaped = pool.run_health_sweep().await;
        assert_eq!(reaped, 1);
        assert!(pool.is_empty().await);
    }

    #[allow(dead_code)]
    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn pool_is_send_and_sync() {
        assert_send_sync::<ProcessPool>();
    }
}
