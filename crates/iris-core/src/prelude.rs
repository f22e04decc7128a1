//! Prelude module - commonly used types for convenient import.
//!
//! Use `use iris_core::prelude::*;` to import all essential types.

// Errors
pub use crate::{CoreError, CoreResult};

// Ids
pub use crate::{SessionId, TaskId};

// Cache entry
pub use crate::{CacheEntry, CacheEntryType};

// Session
pub use crate::{ProcessState, SessionRow, SessionStatus};

// Team configuration
pub use crate::{GrantPermission, RemoteOptions, TeamConfig};

// Validation
pub use crate::validate::{validate_project_path, validate_team_name};
