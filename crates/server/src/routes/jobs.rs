// crates/server/src/routes/jobs.rs
//! Job status endpoints.
//!
//! - GET /job?job_id=<id>: ledger status of one job
//! - GET /jobs/active: executions still running or queued
//! - GET /jobs/{job_id}: full ledger row

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use dbt_jobs_core::JobStatus;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::jobs::ActiveJob;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct JobQuery {
    pub job_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct JobStatusResponse {
    pub job_status: JobStatus,
}

/// Body of a 404 for an unknown job identifier.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct JobNotFound {
    pub message: String,
}

impl JobNotFound {
    fn response(job_id: &str) -> Response {
        let body = JobNotFound {
            message: format!("job {job_id} not found"),
        };
        (StatusCode::NOT_FOUND, Json(body)).into_response()
    }
}

/// GET /job - Current status of a job.
pub async fn get_job_status(
    State(state): State<Arc<AppState>>,
    Query(query): Query<JobQuery>,
) -> ApiResult<Response> {
    let job_id = query
        .job_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::BadRequest("job_id must not be empty".into()))?;

    match state.db.get_job_status(&job_id).await? {
        Some(job_status) => Ok(Json(JobStatusResponse { job_status }).into_response()),
        None => {
            tracing::debug!(job_id = %job_id, "Job not found");
            Ok(JobNotFound::response(&job_id))
        }
    }
}

/// GET /jobs/{job_id} - Full ledger row for a job.
pub async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> ApiResult<Response> {
    Ok(match state.db.get_job(&job_id).await? {
        Some(job) => Json(job).into_response(),
        None => JobNotFound::response(&job_id),
    })
}

/// GET /jobs/active - List executions that have not finished.
pub async fn list_active_jobs(State(state): State<Arc<AppState>>) -> Json<Vec<ActiveJob>> {
    Json(state.jobs.active_jobs())
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/job", get(get_job_status))
        .route("/jobs/active", get(list_active_jobs))
        .route("/jobs/{job_id}", get(get_job))
}
