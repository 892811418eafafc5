// crates/server/src/dispatch.rs
//! Job dispatcher: decides whether a run/test request starts new work or
//! coalesces onto a recent job, and hands new work to the `JobRunner`.

use std::sync::Arc;
use std::time::Duration;

use dbt_jobs_core::exec::DbtExecutor;
use dbt_jobs_core::{CommandError, DbtCommand, JobId, JobStatus, OperationKind};
use dbt_jobs_db::{Database, DbError};
use serde::Serialize;
use thiserror::Error;

use crate::jobs::JobRunner;

/// Default trailing window during which a previous job blocks a new one.
pub const DEFAULT_DEDUP_WINDOW: Duration = Duration::from_secs(60 * 60);

/// What a dispatch call decided.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchOutcome {
    pub message: String,
    pub job_id: JobId,
    /// The same work already succeeded inside the window.
    pub skip_job: bool,
    /// A new job was created and submitted by this call.
    #[serde(skip)]
    pub launched: bool,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Invalid model name: {0}")]
    InvalidModel(#[from] CommandError),

    #[error("Job ledger error: {0}")]
    Ledger(#[from] DbError),

    #[error("Service is shutting down")]
    ShuttingDown,
}

/// Request coalescing in front of the job runner.
///
/// The lookup-then-insert is not atomic: two identical requests racing
/// through `dispatch` can both launch. That duplicate is accepted.
pub struct Dispatcher {
    db: Database,
    runner: Arc<JobRunner>,
    executor: Arc<dyn DbtExecutor>,
    window: Duration,
}

impl Dispatcher {
    pub fn new(
        db: Database,
        runner: Arc<JobRunner>,
        executor: Arc<dyn DbtExecutor>,
        window: Duration,
    ) -> Self {
        Self {
            db,
            runner,
            executor,
            window,
        }
    }

    /// Start `operation` for `model_name`, or return the recent job that
    /// already covers it.
    pub async fn dispatch(
        &self,
        model_name: &str,
        operation: OperationKind,
    ) -> Result<DispatchOutcome, DispatchError> {
        let command = DbtCommand::for_model(operation, model_name)?;

        let latest = self
            .db
            .find_recent_job(model_name, operation, self.window)
            .await?;

        match latest {
            Some(job) if job.status != JobStatus::Failed => {
                tracing::info!(
                    job_id = %job.job_id,
                    model = model_name,
                    operation = %operation,
                    status = %job.status,
                    "Reusing recent job"
                );
                Ok(DispatchOutcome {
                    message: format!(
                        "Model {operation} {model_name} is already launched during a previous call"
                    ),
                    job_id: job.job_id,
                    skip_job: job.status == JobStatus::Success,
                    launched: false,
                })
            }
            _ => {
                let job_id = self.db.create_job(model_name, operation).await?;
                self.launch(job_id.clone(), command).await?;
                tracing::info!(job_id = %job_id, model = model_name, operation = %operation, "Job launched");
                Ok(DispatchOutcome {
                    message: format!("Model {operation} {model_name} is launched"),
                    job_id,
                    skip_job: false,
                    launched: true,
                })
            }
        }
    }

    async fn launch(&self, job_id: JobId, command: DbtCommand) -> Result<(), DispatchError> {
        let execution = execute_job(
            self.db.clone(),
            Arc::clone(&self.executor),
            job_id.clone(),
            command.clone(),
        );
        if self.runner.submit(job_id.clone(), command.to_string(), execution).is_err() {
            // The row exists but nothing will run it; close it out.
            tracing::warn!(job_id = %job_id, "Runner closed before job could be scheduled");
            if let Err(e) = self.db.set_job_status(&job_id, JobStatus::Failed).await {
                tracing::error!(job_id = %job_id, error = %e, "Failed to mark unscheduled job as failed");
            }
            return Err(DispatchError::ShuttingDown);
        }
        Ok(())
    }
}

/// The detached execution step: run the command, then write the terminal
/// status. Errors end here; the originating request has already returned.
async fn execute_job(
    db: Database,
    executor: Arc<dyn DbtExecutor>,
    job_id: JobId,
    command: DbtCommand,
) -> JobStatus {
    tracing::info!(job_id = %job_id, command = %command, executor = executor.name(), "Running job");

    // Run on its own task so a panicking executor still ends in `failed`.
    let run = {
        let command = command.clone();
        tokio::spawn(async move { executor.execute(&command).await })
    };

    let status = match run.await {
        Ok(Ok(output)) => {
            tracing::info!(job_id = %job_id, elapsed_ms = output.elapsed_ms, "Job succeeded");
            JobStatus::Success
        }
        Ok(Err(e)) => {
            tracing::error!(job_id = %job_id, command = %command, error = %e, "Job failed");
            JobStatus::Failed
        }
        Err(e) => {
            tracing::error!(job_id = %job_id, command = %command, error = %e, "Job execution panicked");
            JobStatus::Failed
        }
    };

    match db.set_job_status(&job_id, status).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::warn!(job_id = %job_id, status = %status, "Job was no longer 'started'; status not updated")
        }
        Err(e) => {
            tracing::error!(job_id = %job_id, status = %status, error = %e, "Failed to record job status")
        }
    }
    status
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use dbt_jobs_core::exec::{ExecError, ExecOutput};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::sync::{broadcast, Notify};

    use crate::jobs::JobEvent;

    /// Executor that records commands and succeeds or fails on demand.
    struct FakeExecutor {
        fail: bool,
        calls: Mutex<Vec<String>>,
    }

    impl FakeExecutor {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                fail,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DbtExecutor for FakeExecutor {
        async fn execute(&self, command: &DbtCommand) -> Result<ExecOutput, ExecError> {
            self.calls.lock().unwrap().push(command.to_string());
            if self.fail {
                Err(ExecError::NonZeroExit {
                    code: Some(1),
                    output: "Compilation Error".into(),
                })
            } else {
                Ok(ExecOutput::default())
            }
        }

        fn name(&self) -> &str {
            "fake"
        }
    }

    /// Executor that blocks until the test opens the gate.
    struct GatedExecutor {
        gate: Notify,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl DbtExecutor for GatedExecutor {
        async fn execute(&self, _command: &DbtCommand) -> Result<ExecOutput, ExecError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.gate.notified().await;
            Ok(ExecOutput::default())
        }

        fn name(&self) -> &str {
            "gated"
        }
    }

    struct PanickingExecutor;

    #[async_trait]
    impl DbtExecutor for PanickingExecutor {
        async fn execute(&self, _command: &DbtCommand) -> Result<ExecOutput, ExecError> {
            panic!("executor blew up");
        }

        fn name(&self) -> &str {
            "panicking"
        }
    }

    async fn setup(
        executor: Arc<dyn DbtExecutor>,
    ) -> (Dispatcher, Database, broadcast::Receiver<JobEvent>) {
        let db = Database::new_in_memory().await.unwrap();
        let runner = Arc::new(JobRunner::new(2));
        let rx = runner.subscribe();
        let dispatcher = Dispatcher::new(db.clone(), runner, executor, DEFAULT_DEDUP_WINDOW);
        (dispatcher, db, rx)
    }

    async fn wait_for(rx: &mut broadcast::Receiver<JobEvent>, job_id: &str) -> JobEvent {
        loop {
            let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .expect("timeout waiting for job")
                .expect("channel error");
            if event.job_id == job_id {
                return event;
            }
        }
    }

    #[tokio::test]
    async fn test_first_dispatch_launches() {
        let exec = FakeExecutor::new(false);
        let (dispatcher, db, mut rx) = setup(exec.clone()).await;

        let out = dispatcher.dispatch("wine_list", OperationKind::Run).await.unwrap();
        assert!(out.launched);
        assert!(!out.skip_job);
        assert_eq!(out.message, "Model run wine_list is launched");

        let event = wait_for(&mut rx, &out.job_id).await;
        assert_eq!(event.status, JobStatus::Success);
        assert_eq!(db.get_job_status(&out.job_id).await.unwrap(), Some(JobStatus::Success));
        assert_eq!(exec.calls(), vec!["run --select wine_list"]);
    }

    #[tokio::test]
    async fn test_resubmit_while_running_then_after_success() {
        let exec = Arc::new(GatedExecutor {
            gate: Notify::new(),
            calls: AtomicUsize::new(0),
        });
        let (dispatcher, db, mut rx) = setup(exec.clone()).await;

        let first = dispatcher.dispatch("wine_list", OperationKind::Run).await.unwrap();
        let second = dispatcher.dispatch("wine_list", OperationKind::Run).await.unwrap();
        assert!(first.launched);
        assert!(!second.launched);
        assert_eq!(second.job_id, first.job_id);
        assert!(!second.skip_job);
        assert_eq!(db.get_job_status(&first.job_id).await.unwrap(), Some(JobStatus::Started));

        exec.gate.notify_one();
        let event = wait_for(&mut rx, &first.job_id).await;
        assert_eq!(event.status, JobStatus::Success);

        let third = dispatcher.dispatch("wine_list", OperationKind::Run).await.unwrap();
        assert_eq!(third.job_id, first.job_id);
        assert!(third.skip_job);
        assert!(!third.launched);
        assert_eq!(exec.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_panicking_executor_marks_job_failed() {
        let (dispatcher, db, mut rx) = setup(Arc::new(PanickingExecutor)).await;

        let first = dispatcher.dispatch("wine_list", OperationKind::Test).await.unwrap();
        let event = wait_for(&mut rx, &first.job_id).await;
        assert_eq!(event.status, JobStatus::Failed);
        assert_eq!(db.get_job_status(&first.job_id).await.unwrap(), Some(JobStatus::Failed));

        let retry = dispatcher.dispatch("wine_list", OperationKind::Test).await.unwrap();
        assert!(retry.launched);
        assert_ne!(retry.job_id, first.job_id);
    }

    #[tokio::test]
    async fn test_started_job_is_reused_without_skip() {
        let exec = FakeExecutor::new(false);
        let (dispatcher, db, _rx) = setup(exec.clone()).await;
        let existing = db.create_job("wine_list", OperationKind::Run).await.unwrap();

        let out = dispatcher.dispatch("wine_list", OperationKind::Run).await.unwrap();
        assert_eq!(out.job_id, existing);
        assert!(!out.launched);
        assert!(!out.skip_job);
        assert_eq!(out.message, "Model run wine_list is already launched during a previous call");
        assert!(exec.calls().is_empty());
    }

    #[tokio::test]
    async fn test_succeeded_job_is_reused_with_skip() {
        let exec = FakeExecutor::new(false);
        let (dispatcher, db, _rx) = setup(exec.clone()).await;
        let existing = db.create_job("wine_list", OperationKind::Test).await.unwrap();
        db.set_job_status(&existing, JobStatus::Success).await.unwrap();

        let out = dispatcher.dispatch("wine_list", OperationKind::Test).await.unwrap();
        assert_eq!(out.job_id, existing);
        assert!(out.skip_job);
        assert!(!out.launched);
    }

    #[tokio::test]
    async fn test_failed_job_is_retried_with_new_id() {
        let exec = FakeExecutor::new(true);
        let (dispatcher, db, mut rx) = setup(exec.clone()).await;

        let first = dispatcher.dispatch("unknown_model", OperationKind::Test).await.unwrap();
        let event = wait_for(&mut rx, &first.job_id).await;
        assert_eq!(event.status, JobStatus::Failed);
        assert_eq!(db.get_job_status(&first.job_id).await.unwrap(), Some(JobStatus::Failed));

        let second = dispatcher.dispatch("unknown_model", OperationKind::Test).await.unwrap();
        assert!(second.launched);
        assert_ne!(second.job_id, first.job_id);
        wait_for(&mut rx, &second.job_id).await;
        assert_eq!(exec.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_job_outside_window_is_ignored() {
        let exec = FakeExecutor::new(false);
        let (dispatcher, db, _rx) = setup(exec).await;
        let old = db
            .create_job_at(
                "wine_list",
                OperationKind::Run,
                chrono::Utc::now() - chrono::Duration::hours(2),
            )
            .await
            .unwrap();
        db.set_job_status(&old, JobStatus::Success).await.unwrap();

        let out = dispatcher.dispatch("wine_list", OperationKind::Run).await.unwrap();
        assert!(out.launched);
        assert_ne!(out.job_id, old);
    }

    #[tokio::test]
    async fn test_invalid_model_touches_nothing() {
        let exec = FakeExecutor::new(false);
        let (dispatcher, db, _rx) = setup(exec.clone()).await;

        let err = dispatcher.dispatch("a;b", OperationKind::Run).await.unwrap_err();
        assert!(matches!(err, DispatchError::InvalidModel(_)));

        let recent = db
            .find_recent_job("a;b", OperationKind::Run, DEFAULT_DEDUP_WINDOW)
            .await
            .unwrap();
        assert!(recent.is_none());
        assert!(exec.calls().is_empty());
    }

    #[tokio::test]
    async fn test_closed_runner_fails_the_new_job() {
        let exec = FakeExecutor::new(false);
        let db = Database::new_in_memory().await.unwrap();
        let runner = Arc::new(JobRunner::new(1));
        runner.shutdown(Duration::from_millis(10)).await;
        let dispatcher = Dispatcher::new(db.clone(), runner, exec, DEFAULT_DEDUP_WINDOW);

        let err = dispatcher.dispatch("wine_list", OperationKind::Run).await.unwrap_err();
        assert!(matches!(err, DispatchError::ShuttingDown));

        let job = db
            .find_recent_job("wine_list", OperationKind::Run, DEFAULT_DEDUP_WINDOW)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(job.status, JobStatus::Failed);
    }

    #[tokio::test]
    async fn test_ledger_unavailable_is_surfaced() {
        let exec = FakeExecutor::new(false);
        let (dispatcher, db, _rx) = setup(exec).await;
        db.close().await;

        let err = dispatcher.dispatch("wine_list", OperationKind::Run).await.unwrap_err();
        match err {
            DispatchError::Ledger(e) => assert!(e.is_unavailable()),
            other => panic!("expected ledger error, got {other:?}"),
        }
    }
}
