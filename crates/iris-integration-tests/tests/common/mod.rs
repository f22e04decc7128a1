//! Shared end-to-end test harness: wires a [`SessionManager`] and
//! [`ProcessPool`] over in-memory storage and scripted mock transports, the
//! way a real binary wires them over a real store and real agent processes.

use std::collections::HashMap;
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use iris_core::{SessionId, TeamConfig};
use iris_orchestrator::Orchestrator;
use iris_pool::{PoolConfig, ProcessPool};
use iris_session::{SessionInitRunner, SessionManager, SessionResult};
use iris_storage::{Database, SessionStore};
use iris_transport::{MockResponse, MockTransport, Transport};
use std::sync::Arc;

/// A `SessionInitRunner` that never shells out; every session "initializes"
/// immediately, so tests never touch a real agent binary.
pub struct NoopInitRunner;

#[async_trait::async_trait]
impl SessionInitRunner for NoopInitRunner {
    async fn init_session(&self, _config: &TeamConfig, _session_id: SessionId, _timeout: Duration) -> SessionResult<()> {
        Ok(())
    }
}

/// Hands out a scripted [`MockTransport`] per target team, so distinct
/// targets can be scripted independently within the same test.
pub struct ScriptedFactory {
    responses: StdMutex<HashMap<String, Vec<MockResponse>>>,
    delay: StdMutex<HashMap<String, Duration>>,
}

impl ScriptedFactory {
    /// Build a factory with no scripted responses yet.
    #[must_use]
    pub fn new() -> Self {
        Self { responses: StdMutex::new(HashMap::new()), delay: StdMutex::new(HashMap::new()) }
    }

    /// Queue `response` to be returned the next time `team` is addressed.
    pub fn script(&self, team: &str, response: MockResponse) {
        self.responses.lock().expect("mock lock").entry(team.to_string()).or_default().push(response);
    }

    /// Make every transport spawned for `team` sleep `delay` before
    /// returning its scripted response, to let tests observe concurrency.
    pub fn with_delay(&self, team: &str, delay: Duration) {
        self.delay.lock().expect("mock lock").insert(team.to_string(), delay);
    }
}

impl iris_pool::TransportFactory for ScriptedFactory {
    fn create(&self, config: TeamConfig, _session_id: SessionId) -> Arc<dyn Transport> {
        let responses = self.responses.lock().expect("mock lock").remove(&config.team_name).unwrap_or_default();
        let delay = self.delay.lock().expect("mock lock").get(&config.team_name).copied();
        match delay {
            Some(delay) => Arc::new(DelayedTransport { inner: MockTransport::new(responses), delay }),
            None => Arc::new(MockTransport::new(responses)),
        }
    }
}

/// Wraps a [`MockTransport`], sleeping `delay` before every `execute_tell`
/// so concurrency tests can observe overlap between distinct targets.
struct DelayedTransport {
    inner: MockTransport,
    delay: Duration,
}

#[async_trait::async_trait]
impl Transport for DelayedTransport {
    async fn spawn(&self, spawn_timeout: Duration) -> iris_transport::TransportResult<()> {
        self.inner.spawn(spawn_timeout).await
    }

    async fn execute_tell(&self, text: &str, timeout: Duration) -> iris_transport::TransportResult<iris_core::CacheEntry> {
        tokio::time::sleep(self.delay).await;
        self.inner.execute_tell(text, timeout).await
    }

    async fn cancel(&self) -> iris_transport::TransportResult<()> {
        self.inner.cancel().await
    }

    async fn terminate(&self) -> iris_transport::TransportResult<()> {
        self.inner.terminate().await
    }

    async fn status(&self) -> iris_transport::TransportState {
        self.inner.status().await
    }

    async fn metrics(&self) -> iris_transport::TransportMetrics {
        self.inner.metrics().await
    }
}

/// A fully-wired harness over in-memory storage and scripted transports.
pub struct Harness {
    pub session_manager: Arc<SessionManager>,
    pub pool: Arc<ProcessPool>,
    pub factory: Arc<ScriptedFactory>,
}

impl Harness {
    /// Build a harness whose team registry is `teams`, each a local team at
    /// an arbitrary (never touched) path.
    pub async fn new(team_names: &[&str]) -> Self {
        Self::with_pool_config(team_names, PoolConfig::default()).await
    }

    /// Build a harness with an explicit pool configuration (e.g. a small
    /// `max_processes` for eviction tests).
    pub async fn with_pool_config(team_names: &[&str], pool_config: PoolConfig) -> Self {
        let mut teams = HashMap::new();
        for name in team_names {
            teams.insert((*name).to_string(), TeamConfig::local(*name, "/tmp"));
        }

        let db = Database::connect_memory().await.expect("connect in-memory store");
        let session_manager = Arc::new(SessionManager::new(teams.clone(), SessionStore::new(db), Arc::new(NoopInitRunner)));

        let factory = Arc::new(ScriptedFactory::new());
        let pool = Arc::new(ProcessPool::with_factory(teams, pool_config, factory.clone()));

        Self { session_manager, pool, factory }
    }

    /// Build an orchestrator over this harness's session manager and pool.
    #[must_use]
    pub fn orchestrator(&self) -> Orchestrator {
        Orchestrator::new(self.session_manager.clone(), self.pool.clone())
    }
}
