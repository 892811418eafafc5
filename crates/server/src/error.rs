// crates/server/src/error.rs
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use dbt_jobs_core::exec::ExecError;
use dbt_jobs_core::CommandError;
use dbt_jobs_db::DbError;
use serde::Serialize;
use thiserror::Error;

use crate::dispatch::DispatchError;

/// Structured JSON error response for API errors
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}

/// API error types that map to HTTP status codes
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Rejected command: {0}")]
    Command(#[from] CommandError),

    #[error("Command failed: {0}")]
    Exec(#[from] ExecError),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl From<DispatchError> for ApiError {
    fn from(e: DispatchError) -> Self {
        match e {
            DispatchError::InvalidModel(err) => ApiError::BadRequest(err.to_string()),
            DispatchError::Ledger(err) => ApiError::Database(err),
            DispatchError::ShuttingDown => {
                ApiError::ServiceUnavailable("job runner is shutting down".into())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            ApiError::Database(db_err) if db_err.is_unavailable() => {
                tracing::error!(error = %db_err, "Job ledger unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    ErrorResponse::with_details("Job ledger unavailable", db_err.to_string()),
                )
            }
            ApiError::Database(db_err) => {
                tracing::error!(error = %db_err, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::with_details("Database error", db_err.to_string()),
                )
            }
            ApiError::Command(cmd_err) => {
                tracing::warn!(error = %cmd_err, "Rejected command");
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse::with_details("Rejected command", cmd_err.to_string()),
                )
            }
            ApiError::Exec(exec_err) => {
                tracing::error!(error = %exec_err, "dbt command failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::with_details("dbt command failed", exec_err.to_string()),
                )
            }
            ApiError::ServiceUnavailable(msg) => {
                tracing::warn!(message = %msg, "Service unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    ErrorResponse::with_details("Service unavailable", msg.clone()),
                )
            }
            ApiError::BadRequest(msg) => {
                tracing::warn!(message = %msg, "Bad request");
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse::with_details("Bad request", msg.clone()),
                )
            }
        };

        (status, Json(error_response)).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
