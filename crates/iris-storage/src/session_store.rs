//! The durable session table: `(from_team, to_team) -> session_id`.

use iris_core::{ProcessState, SessionId, SessionRow, SessionStatus};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::db::Database;
use crate::error::{StorageError, StorageResult};

const TABLE: &str = "session";

/// On-disk record shape. Identical to [`SessionRow`] but keeps its own type
/// so the wire format can evolve independently of the in-memory type.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionRecord {
    session_id: String,
    from_team: String,
    to_team: String,
    status: SessionStatus,
    process_state: ProcessState,
    message_count: u64,
    created_at: chrono::DateTime<chrono::Utc>,
    last_used_at: chrono::DateTime<chrono::Utc>,
    last_response_at: Option<chrono::DateTime<chrono::Utc>>,
    current_cache_session_id: Option<String>,
}

impl From<&SessionRow> for SessionRecord {
    fn from(row: &SessionRow) -> Self {
        Self {
            session_id: row.session_id.to_string(),
            from_team: row.from_team.clone(),
            to_team: row.to_team.clone(),
            status: row.status,
            process_state: row.process_state,
            message_count: row.message_count,
            created_at: row.created_at,
            last_used_at: row.last_used_at,
            last_response_at: row.last_response_at,
            current_cache_session_id: row.current_cache_session_id.clone(),
        }
    }
}

impl TryFrom<SessionRecord> for SessionRow {
    type Error = StorageError;

    fn try_from(rec: SessionRecord) -> Result<Self, Self::Error> {
        let session_id: SessionId = rec
            .session_id
            .parse()
            .map_err(|e| StorageError::Serialization(format!("bad session_id: {e}")))?;
        Ok(Self {
            session_id,
            from_team: rec.from_team,
            to_team: rec.to_team,
            status: rec.status,
            process_state: rec.process_state,
            message_count: rec.message_count,
            created_at: rec.created_at,
            last_used_at: rec.last_used_at,
            last_response_at: rec.last_response_at,
            current_cache_session_id: rec.current_cache_session_id,
        })
    }
}

/// Optional filter for [`SessionStore::list`].
#[derive(Debug, Clone, Default)]
pub struct SessionFilter {
    /// Restrict to sessions addressed to this team.
    pub to_team: Option<String>,
    /// Restrict to sessions with this status.
    pub status: Option<SessionStatus>,
}

/// Durable store of session rows, backed by an embedded `SurrealDB`
/// instance.
pub struct SessionStore {
    db: Database,
}

impl SessionStore {
    /// Wrap an already-connected database.
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Insert a new session row. Fails if `session_id` already exists.
    #[instrument(skip(self, row), fields(session_id = %row.session_id))]
    pub async fn insert(&self, row: &SessionRow) -> StorageResult<()> {
        let record = SessionRecord::from(row);
        let created: Option<SessionRecord> = self
            .db
            .client()
            .create((TABLE, row.session_id.to_string()))
            .content(record)
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;
        if created.is_none() {
            return Err(StorageError::Query("insert returned no record".to_string()));
        }
        debug!("inserted session row");
        Ok(())
    }

    /// Look up a row by its session id.
    pub async fn get(&self, session_id: SessionId) -> StorageResult<Option<SessionRow>> {
        let record: Option<SessionRecord> = self
            .db
            .client()
            .select((TABLE, session_id.to_string()))
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;
        record.map(SessionRow::try_from).transpose()
    }

    /// Look up a row by its `(from_team, to_team)` pair.
    pub async fn get_by_pair(&self, from_team: &str, to_team: &str) -> StorageResult<Option<SessionRow>> {
        let mut response = self
            .db
            .client()
            .query("SELECT * FROM type::table($table) WHERE from_team = $from AND to_team = $to LIMIT 1")
            .bind(("table", TABLE))
            .bind(("from", from_team.to_string()))
            .bind(("to", to_team.to_string()))
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;
        let records: Vec<SessionRecord> = response.take(0).map_err(|e| StorageError::Query(e.to_string()))?;
        records.into_iter().next().map(SessionRow::try_from).transpose()
    }

    /// Replace the stored row for `session_id` with `row` in full.
    #[instrument(skip(self, row), fields(session_id = %row.session_id))]
    pub async fn update(&self, row: &SessionRow) -> StorageResult<()> {
        let record = SessionRecord::from(row);
        let _: Option<SessionRecord> = self
            .db
            .client()
            .update((TABLE, row.session_id.to_string()))
            .content(record)
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;
        Ok(())
    }

    /// Delete a session row outright.
    pub async fn delete(&self, session_id: SessionId) -> StorageResult<()> {
        let _: Option<SessionRecord> = self
            .db
            .client()
            .delete((TABLE, session_id.to_string()))
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;
        Ok(())
    }

    /// List rows matching `filter`.
    pub async fn list(&self, filter: &SessionFilter) -> StorageResult<Vec<SessionRow>> {
        let mut query = format!("SELECT * FROM {TABLE}");
        let mut clauses = Vec::new();
        if filter.to_team.is_some() {
            clauses.push("to_team = $to_team");
        }
        if filter.status.is_some() {
            clauses.push("status = $status");
        }
        if !clauses.is_empty() {
            query.push_str(" WHERE ");
            query.push_str(&clauses.join(" AND "));
        }

        let mut builder = self.db.client().query(query);
        if let Some(to_team) = &filter.to_team {
            builder = builder.bind(("to_team", to_team.clone()));
        }
        if let Some(status) = filter.status {
            builder = builder.bind(("status", status));
        }
        let mut response = builder.await.map_err(|e| StorageError::Query(e.to_string()))?;
        let records: Vec<SessionRecord> = response.take(0).map_err(|e| StorageError::Query(e.to_string()))?;
        records.into_iter().map(SessionRow::try_from).collect()
    }

    /// Startup recovery: force every row's `process_state` to `Stopped` and
    /// clear `current_cache_session_id`. Durable identities are untouched.
    #[instrument(skip(self))]
    pub async fn reset_process_state(&self) -> StorageResult<()> {
        let query = format!(
            "UPDATE {TABLE} SET process_state = $stopped, current_cache_session_id = NONE"
        );
        self.db
            .client()
            .query(query)
            .bind(("stopped", ProcessState::Stopped))
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;
        debug!("reset process_state for all sessions");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_store() -> SessionStore {
        let db = Database::connect_memory().await.expect("connect memory db");
        SessionStore::new(db)
    }

    #[tokio::test]
    async fn insert_then_get_round_trips() {
        let store = memory_store().await;
        let row = SessionRow::new(SessionId::new(), "caller", "alpha");
        store.insert(&row).await.unwrap();

        let fetched = store.get(row.session_id).await.unwrap().unwrap();
        assert_eq!(fetched.from_team, "caller");
        assert_eq!(fetched.to_team, "alpha");
        assert_eq!(fetched.status, SessionStatus::Active);
    }

    #[tokio::test]
    async fn get_by_pair_finds_the_row() {
        let store = memory_store().await;
        let row = SessionRow::new(SessionId::new(), "caller", "alpha");
        store.insert(&row).await.unwrap();

        let fetched = store.get_by_pair("caller", "alpha").await.unwrap().unwrap();
        assert_eq!(fetched.session_id, row.session_id);
    }

    #[tokio::test]
    async fn missing_pair_returns_none() {
        let store = memory_store().await;
        assert!(store.get_by_pair("caller", "nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_persists_changes() {
        let store = memory_store().await;
        let mut row = SessionRow::new(SessionId::new(), "caller", "alpha");
        store.insert(&row).await.unwrap();

        row.touch();
        row.process_state = ProcessState::Processing;
        store.update(&row).await.unwrap();

        let fetched = store.get(row.session_id).await.unwrap().unwrap();
        assert_eq!(fetched.message_count, 1);
        assert_eq!(fetched.process_state, ProcessState::Processing);
    }

    #[tokio::test]
    async fn reset_process_state_clears_runtime_intent() {
        let store = memory_store().await;
        let mut row = SessionRow::new(SessionId::new(), "caller", "alpha");
        row.process_state = ProcessState::Processing;
        row.current_cache_session_id = Some("entry-1".to_string());
        store.insert(&row).await.unwrap();

        store.reset_process_state().await.unwrap();

        let fetched = store.get(row.session_id).await.unwrap().unwrap();
        assert_eq!(fetched.process_state, ProcessState::Stopped);
        assert!(fetched.current_cache_session_id.is_none());
        // durable identity untouched
        assert_eq!(fetched.from_team, "caller");
    }

    #[tokio::test]
    async fn delete_removes_the_row() {
        let store = memory_store().await;
        let row = SessionRow::new(SessionId::new(), "caller", "alpha");
        store.insert(&row).await.unwrap();
        store.delete(row.session_id).await.unwrap();
        assert!(store.get(row.session_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_filters_by_to_team() {
        let store = memory_store().await;
        store
            .insert(&SessionRow::new(SessionId::new(), "caller", "alpha"))
            .await
            .unwrap();
        store
            .insert(&SessionRow::new(SessionId::new(), "caller", "beta"))
            .await
            .unwrap();

        let alpha_only = store
            .list(&SessionFilter {
                to_team: Some("alpha".to_string()),
                status: None,
            })
            .await
            .unwrap();
        assert_eq!(alpha_only.len(), 1);
        assert_eq!(alpha_only[0].to_team, "alpha");
    }
}
