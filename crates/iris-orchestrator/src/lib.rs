//! Per-target FIFO async task queue over the session manager and process
//! pool: at most one tell/command/sleep in flight per target at a time,
//! different targets proceeding concurrently.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]

mod error;
mod orchestrator;
mod task;

pub use error::{OrchestratorError, OrchestratorResult};
pub use orchestrator::Orchestrator;
pub use task::{AsyncTaskResult, TaskKind, TaskSpec};
