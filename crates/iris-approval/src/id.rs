//! Permission identifiers.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use serde::{Deserialize, Serialize};

static COUNTER: AtomicU64 = AtomicU64::new(0);

/// Identifier for a pending approval, shaped `perm_<ms>_<counter>`.
///
/// The millisecond timestamp keeps ids roughly sortable by creation time;
/// the counter disambiguates ids minted within the same millisecond.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionId(String);

impl PermissionId {
    /// Mint a fresh, monotonically-unique permission id.
    #[must_use]
    pub fn new() -> Self {
        let ms = Utc::now().timestamp_millis();
        let counter = COUNTER.fetch_add(1, Ordering::Relaxed);
        Self(format!("perm_{ms}_{counter}"))
    }

    /// Borrow the id as a plain string, e.g. for map lookups.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for PermissionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PermissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
