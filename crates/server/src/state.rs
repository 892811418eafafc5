// crates/server/src/state.rs
//! Application state for the Axum server.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dbt_jobs_core::exec::DbtExecutor;
use dbt_jobs_db::Database;

use crate::dispatch::{Dispatcher, DEFAULT_DEDUP_WINDOW};
use crate::jobs::JobRunner;

/// Shared application state accessible from all route handlers.
pub struct AppState {
    /// Server start time for uptime tracking.
    pub start_time: Instant,
    /// Job ledger.
    pub db: Database,
    /// Run/test coalescing in front of the job runner.
    pub dispatcher: Dispatcher,
    /// Background runner for detached executions.
    pub jobs: Arc<JobRunner>,
    /// Executor behind the synchronous `/command` endpoint. Always runs
    /// dbt in this process, whatever executor the dispatcher uses.
    pub command_executor: Arc<dyn DbtExecutor>,
}

impl AppState {
    /// Assemble state from its parts.
    ///
    /// `job_executor` runs dispatched jobs; `command_executor` serves
    /// `/command`. They are the same local executor unless jobs are routed
    /// through the authenticated callback.
    pub fn new(
        db: Database,
        jobs: Arc<JobRunner>,
        job_executor: Arc<dyn DbtExecutor>,
        command_executor: Arc<dyn DbtExecutor>,
        dedup_window: Duration,
    ) -> Arc<Self> {
        let dispatcher = Dispatcher::new(db.clone(), Arc::clone(&jobs), job_executor, dedup_window);
        Arc::new(Self {
            start_time: Instant::now(),
            db,
            dispatcher,
            jobs,
            command_executor,
        })
    }

    /// State with one executor for both roles and the default window.
    pub fn with_executor(db: Database, executor: Arc<dyn DbtExecutor>) -> Arc<Self> {
        Self::new(
            db,
            Arc::new(JobRunner::new(4)),
            Arc::clone(&executor),
            executor,
            DEFAULT_DEDUP_WINDOW,
        )
    }

    /// Get the server uptime in seconds.
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
