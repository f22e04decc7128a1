//! A small in-process LRU cache of session rows, with a time-to-live.
//!
//! Absorbs hot reads of `(fromTeam, toTeam) -> SessionRow` without hitting
//! the storage layer on every tell. A stale entry is treated as a cache
//! miss, not removed eagerly - the next successful read replaces it.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use iris_core::SessionRow;
use tokio::sync::Mutex;

const DEFAULT_TTL: Duration = Duration::from_secs(60);
const DEFAULT_CAPACITY: usize = 512;

struct Entry {
    row: SessionRow,
    inserted_at: Instant,
}

/// LRU cache keyed by `(from_team, to_team)`.
pub struct SessionCache {
    ttl: Duration,
    capacity: usize,
    entries: Mutex<HashMap<(String, String), Entry>>,
    order: Mutex<Vec<(String, String)>>,
}

impl SessionCache {
    /// Build a cache with the default 60s TTL and a generous capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_params(DEFAULT_TTL, DEFAULT_CAPACITY)
    }

    /// Build a cache with explicit TTL and capacity (used by tests).
    #[must_use]
    pub fn with_params(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity,
            entries: Mutex::new(HashMap::new()),
            order: Mutex::new(Vec::new()),
        }
    }

    /// Fetch a row by pair, if present and not yet stale.
    pub async fn get(&self, from_team: &str, to_team: &str) -> Option<SessionRow> {
        let key = (from_team.to_string(), to_team.to_string());
        let entries = self.entries.lock().await;
        let entry = entries.get(&key)?;
        if entry.inserted_at.elapsed() > self.ttl {
            return None;
        }
        Some(entry.row.clone())
    }

    /// Insert or refresh a row, evicting the least-recently-inserted entry
    /// if this would exceed capacity.
    pub async fn put(&self, row: SessionRow) {
        let key = (row.from_team.clone(), row.to_team.clone());
        let mut entries = self.entries.lock().await;
        let mut order = self.order.lock().await;

        if !entries.contains_key(&key) && entries.len() >= self.capacity {
            if let Some(oldest) = order.first().cloned() {
                entries.remove(&oldest);
                order.remove(0);
            }
        }
        order.retain(|k| k != &key);
        order.push(key.clone());
        entries.insert(
            key,
            Entry {
                row,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Drop a row outright (used after `deleteSession`).
    pub async fn invalidate(&self, from_team: &str, to_team: &str) {
        let key = (from_team.to_string(), to_team.to_string());
        self.entries.lock().await.remove(&key);
        self.order.lock().await.retain(|k| k != &key);
    }
}

impl Default for SessionCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iris_core::SessionId;

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let cache = SessionCache::new();
        let row = SessionRow::new(SessionId::new(), "caller", "alpha");
        cache.put(row.clone()).await;
        let fetched = cache.get("caller", "alpha").await.unwrap();
        assert_eq!(fetched.session_id, row.session_id);
    }

    #[tokio::test]
    async fn stale_entries_are_treated_as_misses() {
        let cache = SessionCache::with_params(Duration::from_millis(1), 8);
        let row = SessionRow::new(SessionId::new(), "caller", "alpha");
        cache.put(row).await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(cache.get("caller", "alpha").await.is_none());
    }

    #[tokio::test]
    async fn capacity_evicts_oldest() {
        let cache = SessionCache::with_params(Duration::from_secs(60), 2);
        cache.put(SessionRow::new(SessionId::new(), "caller", "a")).await;
        cache.put(SessionRow::new(SessionId::new(), "caller", "b")).await;
        cache.put(SessionRow::new(SessionId::new(), "caller", "c")).await;

        assert!(cache.get("caller", "a").await.is_none());
        assert!(cache.get("caller", "b").await.is_some());
        assert!(cache.get("caller", "c").await.is_some());
    }

    #[tokio::test]
    async fn invalidate_removes_entry() {
        let cache = SessionCache::new();
        cache.put(SessionRow::new(SessionId::new(), "caller", "alpha")).await;
        cache.invalidate("caller", "alpha").await;
        assert!(cache.get("caller", "alpha").await.is_none());
    }
}
