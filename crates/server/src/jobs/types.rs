// crates/server/src/jobs/types.rs
//! Types for the background job system.

use chrono::{DateTime, Utc};
use dbt_jobs_core::{JobId, JobStatus};
use serde::Serialize;
use thiserror::Error;

/// An execution currently held by the runner.
#[derive(Debug, Clone, Serialize)]
pub struct ActiveJob {
    pub job_id: JobId,
    pub label: String,
    /// Waiting for a worker slot.
    pub queued: bool,
    pub submitted_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
}

/// Emitted once per submitted execution when it finishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobEvent {
    pub job_id: JobId,
    pub label: String,
    /// `Failed` if the execution panicked.
    pub status: JobStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("job runner is shutting down")]
pub struct RunnerClosed;
