//! `SessionManager`: durable `(fromTeam, toTeam) -> sessionId` identity.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use iris_core::{SessionId, SessionRow, SessionStatus, TeamConfig, validate::{validate_project_path, validate_team_name}};
use iris_storage::{SessionFilter, SessionStore};
use tokio::sync::{Mutex, Notify};
use tracing::{info, instrument};

use crate::cache::SessionCache;
use crate::error::{SessionError, SessionResult};
use crate::init_runner::SessionInitRunner;

const DEFAULT_SESSION_INIT_TIMEOUT: Duration = Duration::from_secs(30);

type PairKey = (String, String);

/// Owns every team's configuration plus the durable session table, and is
/// the only path through which a `(fromTeam, toTeam)` pair is bound to a
/// session id.
pub struct SessionManager {
    teams: HashMap<String, TeamConfig>,
    store: SessionStore,
    cache: SessionCache,
    init_runner: Arc<dyn SessionInitRunner>,
    session_init_timeout: Duration,
    /// Pairs currently being created, so concurrent first-touches of the
    /// same pair await the single in-flight creation instead of each
    /// inserting their own row. Mirrors the pool's spawn-placeholder dedup.
    creating: Mutex<HashMap<PairKey, Arc<Notify>>>,
}

impl SessionManager {
    /// Build a manager over `store`, with `teams` as the registry and
    /// `init_runner` used to materialize session files on first use.
    #[must_use]
    pub fn new(
        teams: HashMap<String, TeamConfig>,
        store: SessionStore,
        init_runner: Arc<dyn SessionInitRunner>,
    ) -> Self {
        Self {
            teams,
            store,
            cache: SessionCache::new(),
            init_runner,
            session_init_timeout: DEFAULT_SESSION_INIT_TIMEOUT,
            creating: Mutex::new(HashMap::new()),
        }
    }

    /// Override the default 30s session-init timeout.
    #[must_use]
    pub fn with_session_init_timeout(mut self, timeout: Duration) -> Self {
        self.session_init_timeout = timeout;
        self
    }

    /// Startup recovery: force every durable row's `process_state` back to
    /// `Stopped`, clearing stale runtime intent from a prior process.
    #[instrument(skip(self))]
    pub async fn recover_on_startup(&self) -> SessionResult<()> {
        self.store.reset_process_state().await?;
        info!("session process state reset on startup");
        Ok(())
    }

    fn team_config(&self, team_name: &str) -> SessionResult<&TeamConfig> {
        validate_team_name(team_name).map_err(|e| SessionError::UnknownTeam(e.to_string()))?;
        self.teams
            .get(team_name)
            .ok_or_else(|| SessionError::UnknownTeam(team_name.to_string()))
    }

    /// Return the existing session for `(from_team, to_team)`, creating one
    /// on first use.
    ///
    /// Creation is entirely on-demand: nothing is pre-spawned at startup.
    /// Concurrent first-touches of the same pair are serialized through a
    /// creation placeholder, so at most one row is ever inserted per pair.
    #[instrument(skip(self), fields(from = %from_team, to = %to_team))]
    pub async fn get_or_create_session(&self, from_team: &str, to_team: &str) -> SessionResult<SessionRow> {
        self.team_config(from_team)?;
        self.team_config(to_team)?;
        let key: PairKey = (from_team.to_string(), to_team.to_string());

        loop {
            if let Some(row) = self.cache.get(from_team, to_team).await {
                return Ok(row);
            }
            if let Some(row) = self.store.get_by_pair(from_team, to_team).await? {
                self.cache.put(row.clone()).await;
                return Ok(row);
            }

            let wait_on = {
                let mut creating = self.creating.lock().await;
                match creating.get(&key) {
                    Some(notify) => Some(notify.clone()),
                    None => {
                        creating.insert(key.clone(), Arc::new(Notify::new()));
                        None
                    },
                }
            };

            if let Some(notify) = wait_on {
                notify.notified().await;
                continue;
            }

            let result = self.create_session(from_team, to_team).await;
            let notify = {
                let mut creating = self.creating.lock().await;
                creating.remove(&key)
            };
            if let Some(notify) = notify {
                notify.notify_waiters();
            }
            return result;
        }
    }

    async fn create_session(&self, from_team: &str, to_team: &str) -> SessionResult<SessionRow> {
        let to_config = self.team_config(to_team)?;
        if !to_config.is_remote() {
            validate_project_path(&to_config.path).map_err(|e| SessionError::InvalidPath {
                team: to_team.to_string(),
                reason: e.to_string(),
            })?;
        }
        let session_id = SessionId::new();
        self.init_runner
            .init_session(to_config, session_id, self.session_init_timeout)
            .await?;

        let row = SessionRow::new(session_id, from_team, to_team);
        self.store.insert(&row).await?;
        self.cache.put(row.clone()).await;
        info!(%session_id, "created new session");
        Ok(row)
    }

    /// Look up a row by session id, bypassing the pair cache.
    pub async fn get_session(&self, session_id: SessionId) -> SessionResult<Option<SessionRow>> {
        Ok(self.store.get(session_id).await?)
    }

    /// Look up a row by `(from_team, to_team)` without creating one.
    pub async fn get_session_by_pair(&self, from_team: &str, to_team: &str) -> SessionResult<Option<SessionRow>> {
        if let Some(row) = self.cache.get(from_team, to_team).await {
            return Ok(Some(row));
        }
        Ok(self.store.get_by_pair(from_team, to_team).await?)
    }

    /// Record that a session was just addressed, bumping its message count
    /// and refreshing `lastUsedAt`.
    pub async fn touch(&self, session_id: SessionId) -> SessionResult<()> {
        let Some(mut row) = self.store.get(session_id).await? else {
            return Err(SessionError::Storage(iris_storage::StorageError::NotFound(session_id.to_string())));
        };
        row.touch();
        self.store.update(&row).await?;
        self.cache.put(row).await;
        Ok(())
    }

    /// Record that a response was just delivered for `session_id`.
    pub async fn mark_responded(&self, session_id: SessionId) -> SessionResult<()> {
        let Some(mut row) = self.store.get(session_id).await? else {
            return Err(SessionError::Storage(iris_storage::StorageError::NotFound(session_id.to_string())));
        };
        row.mark_responded();
        self.store.update(&row).await?;
        self.cache.put(row).await;
        Ok(())
    }

    /// Update the runtime `processState` recorded against a session.
    pub async fn set_process_state(&self, session_id: SessionId, state: iris_core::ProcessState) -> SessionResult<()> {
        let Some(mut row) = self.store.get(session_id).await? else {
            return Err(SessionError::Storage(iris_storage::StorageError::NotFound(session_id.to_string())));
        };
        row.process_state = state;
        self.store.update(&row).await?;
        self.cache.put(row).await;
        Ok(())
    }

    /// Record (or clear) which cache entry the session's transport is
    /// currently attached to.
    pub async fn set_current_cache_session_id(&self, session_id: SessionId, id: Option<String>) -> SessionResult<()> {
        let Some(mut row) = self.store.get(session_id).await? else {
            return Err(SessionError::Storage(iris_storage::StorageError::NotFound(session_id.to_string())));
        };
        row.current_cache_session_id = id;
        self.store.update(&row).await?;
        self.cache.put(row).await;
        Ok(())
    }

    /// Transition a session's durable status.
    pub async fn set_status(&self, session_id: SessionId, status: SessionStatus) -> SessionResult<()> {
        let Some(mut row) = self.store.get(session_id).await? else {
            return Err(SessionError::Storage(iris_storage::StorageError::NotFound(session_id.to_string())));
        };
        row.status = status;
        self.store.update(&row).await?;
        self.cache.put(row).await;
        Ok(())
    }

    /// Delete a session outright (distinct from archiving).
    pub async fn delete_session(&self, session_id: SessionId) -> SessionResult<()> {
        if let Some(row) = self.store.get(session_id).await? {
            self.cache.invalidate(&row.from_team, &row.to_team).await;
        }
        self.store.delete(session_id).await?;
        Ok(())
    }

    /// List sessions matching `filter`.
    pub async fn list_sessions(&self, filter: &SessionFilter) -> SessionResult<Vec<SessionRow>> {
        Ok(self.store.list(filter).await?)
    }
}
