//! Job ledger queries: create, dedup lookup, terminal status writes.

use std::time::Duration;

use chrono::{DateTime, Utc};
use dbt_jobs_core::{JobId, JobStatus, OperationKind};
use serde::Serialize;
use uuid::Uuid;

use crate::{Database, DbError, DbResult};

/// One row of the `dbt_jobs` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobRecord {
    pub job_id: JobId,
    pub model_name: String,
    pub operation: OperationKind,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
}

type JobRow = (String, String, String, String, i64);

impl TryFrom<JobRow> for JobRecord {
    type Error = DbError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        let (job_id, model_name, operation, status, created_at) = row;
        let operation = operation
            .parse::<OperationKind>()
            .map_err(|e| DbError::Corrupt(format!("job {job_id}: {e}")))?;
        let status = status
            .parse::<JobStatus>()
            .map_err(|e| DbError::Corrupt(format!("job {job_id}: {e}")))?;
        let created_at = DateTime::from_timestamp(created_at, 0).ok_or_else(|| {
            DbError::Corrupt(format!("job {job_id}: bad timestamp {created_at}"))
        })?;
        Ok(JobRecord {
            job_id,
            model_name,
            operation,
            status,
            created_at,
        })
    }
}

impl Database {
    /// Insert a new `started` job stamped with the current time.
    pub async fn create_job(&self, model_name: &str, operation: OperationKind) -> DbResult<JobId> {
        self.create_job_at(model_name, operation, Utc::now()).await
    }

    /// Insert a new `started` job with an explicit creation time.
    pub async fn create_job_at(
        &self,
        model_name: &str,
        operation: OperationKind,
        created_at: DateTime<Utc>,
    ) -> DbResult<JobId> {
        let job_id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO dbt_jobs (job_id, model_name, operation, status, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&job_id)
        .bind(model_name)
        .bind(operation.as_str())
        .bind(JobStatus::Started.as_str())
        .bind(created_at.timestamp())
        .execute(self.pool())
        .await?;
        Ok(job_id)
    }

    /// Most recent job for `(model_name, operation)` created within `window`
    /// of now, regardless of its status.
    pub async fn find_recent_job(
        &self,
        model_name: &str,
        operation: OperationKind,
        window: Duration,
    ) -> DbResult<Option<JobRecord>> {
        let window_secs = i64::try_from(window.as_secs()).unwrap_or(i64::MAX);
        let since = Utc::now().timestamp().saturating_sub(window_secs);
        let row: Option<JobRow> = sqlx::query_as(
            "SELECT job_id, model_name, operation, status, created_at
             FROM dbt_jobs
             WHERE model_name = ? AND operation = ? AND created_at >= ?
             ORDER BY created_at DESC, id DESC
             LIMIT 1",
        )
        .bind(model_name)
        .bind(operation.as_str())
        .bind(since)
        .fetch_optional(self.pool())
        .await?;
        row.map(JobRecord::try_from).transpose()
    }

    /// Move a `started` job to a terminal status.
    ///
    /// Returns `true` if the row changed. A job that is unknown or already
    /// terminal is left untouched and yields `false`.
    pub async fn set_job_status(&self, job_id: &str, status: JobStatus) -> DbResult<bool> {
        if !status.is_terminal() {
            return Err(DbError::InvalidTransition(status));
        }
        let result = sqlx::query("UPDATE dbt_jobs SET status = ? WHERE job_id = ? AND status = ?")
            .bind(status.as_str())
            .bind(job_id)
            .bind(JobStatus::Started.as_str())
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Current status of a job, or `None` if the identifier is unknown.
    pub async fn get_job_status(&self, job_id: &str) -> DbResult<Option<JobStatus>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT status FROM dbt_jobs WHERE job_id = ?")
            .bind(job_id)
            .fetch_optional(self.pool())
            .await?;
        row.map(|(status,)| {
            status
                .parse::<JobStatus>()
                .map_err(|e| DbError::Corrupt(format!("job {job_id}: {e}")))
        })
        .transpose()
    }

    /// Full ledger row for a job.
    pub async fn get_job(&self, job_id: &str) -> DbResult<Option<JobRecord>> {
        let row: Option<JobRow> = sqlx::query_as(
            "SELECT job_id, model_name, operation, status, created_at
             FROM dbt_jobs WHERE job_id = ?",
        )
        .bind(job_id)
        .fetch_optional(self.pool())
        .await?;
        row.map(JobRecord::try_from).transpose()
    }
}
