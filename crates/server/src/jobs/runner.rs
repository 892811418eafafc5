// crates/server/src/jobs/runner.rs
//! Central job runner that owns all background executions.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::Utc;
use dbt_jobs_core::{JobId, JobStatus};
use tokio::sync::{broadcast, Semaphore};
use tokio_util::task::TaskTracker;

use super::types::{ActiveJob, JobEvent, RunnerClosed};

type ActiveMap = Arc<RwLock<HashMap<JobId, ActiveJob>>>;

/// Bounded worker pool for detached executions.
///
/// `submit` never waits: the execution is spawned immediately and queues
/// on a semaphore inside its own task until a worker slot frees up. There
/// is no cancellation and no execution timeout; completion is observed
/// through `subscribe` (or the ledger), never by the submitter.
pub struct JobRunner {
    tracker: TaskTracker,
    permits: Arc<Semaphore>,
    active: ActiveMap,
    events: broadcast::Sender<JobEvent>,
}

impl JobRunner {
    /// Create a runner allowing `max_concurrent` executions at once.
    pub fn new(max_concurrent: usize) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            tracker: TaskTracker::new(),
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
            active: Arc::new(RwLock::new(HashMap::new())),
            events,
        }
    }

    /// Spawn an execution. The future resolves to the job's terminal status.
    pub fn submit<Fut>(
        &self,
        job_id: JobId,
        label: impl Into<String>,
        execution: Fut,
    ) -> Result<(), RunnerClosed>
    where
        Fut: Future<Output = JobStatus> + Send + 'static,
    {
        if self.tracker.is_closed() {
            return Err(RunnerClosed);
        }
        let label = label.into();

        match self.active.write() {
            Ok(mut active) => {
                active.insert(
                    job_id.clone(),
                    ActiveJob {
                        job_id: job_id.clone(),
                        label: label.clone(),
                        queued: true,
                        submitted_at: Utc::now(),
                        started_at: None,
                    },
                );
            }
            Err(e) => tracing::error!("RwLock poisoned writing active jobs: {e}"),
        }

        let completion = Completion {
            job_id: job_id.clone(),
            label,
            status: JobStatus::Failed,
            active: Arc::clone(&self.active),
            events: self.events.clone(),
        };
        let permits = Arc::clone(&self.permits);
        let active = Arc::clone(&self.active);

        self.tracker.spawn(async move {
            // Move the whole guard into the task so it drops when the task ends.
            let mut completion = completion;
            // The semaphore is never closed, so this only waits for a slot.
            let _permit = permits.acquire_owned().await.ok();
            match active.write() {
                Ok(mut active) => {
                    if let Some(job) = active.get_mut(&job_id) {
                        job.queued = false;
                        job.started_at = Some(Utc::now());
                    }
                }
                Err(e) => tracing::error!("RwLock poisoned writing active jobs: {e}"),
            }
            completion.status = execution.await;
        });

        Ok(())
    }

    /// Subscribe to completion events.
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.events.subscribe()
    }

    /// Snapshot of executions that have not finished yet, oldest first.
    pub fn active_jobs(&self) -> Vec<ActiveJob> {
        match self.active.read() {
            Ok(active) => {
                let mut jobs: Vec<ActiveJob> = active.values().cloned().collect();
                jobs.sort_by_key(|j| j.submitted_at);
                jobs
            }
            Err(e) => {
                tracing::error!("RwLock poisoned reading active jobs: {e}");
                Vec::new()
            }
        }
    }

    pub fn active_count(&self) -> usize {
        self.tracker.len()
    }

    pub fn is_closed(&self) -> bool {
        self.tracker.is_closed()
    }

    /// Stop accepting executions and wait up to `grace` for in-flight ones.
    ///
    /// Returns `true` if everything finished. Executions still running when
    /// the grace period ends are abandoned with their jobs left `started`.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        self.tracker.close();
        let in_flight = self.tracker.len();
        if in_flight > 0 {
            tracing::info!(in_flight, grace_secs = grace.as_secs(), "Waiting for background jobs");
        }
        match tokio::time::timeout(grace, self.tracker.wait()).await {
            Ok(()) => true,
            Err(_) => {
                tracing::warn!(
                    abandoned = self.tracker.len(),
                    "Background jobs still running at shutdown; their ledger status stays 'started'"
                );
                false
            }
        }
    }
}

/// Bookkeeping that runs when an execution task ends, including by panic.
struct Completion {
    job_id: JobId,
    label: String,
    status: JobStatus,
    active: ActiveMap,
    events: broadcast::Sender<JobEvent>,
}

impl Drop for Completion {
    fn drop(&mut self) {
        match self.active.write() {
            Ok(mut active) => {
                active.remove(&self.job_id);
            }
            Err(e) => tracing::error!("RwLock poisoned removing active job: {e}"),
        }
        // Ignore send errors (no subscribers is fine).
        let _ = self.events.send(JobEvent {
            job_id: self.job_id.clone(),
            label: std::mem::take(&mut self.label),
            status: self.status,
        });
    }
}
