// crates/server/src/routes/models.rs
//! Run/test submission endpoints.
//!
//! - POST /run_model?model_name=<name>: 201
//! - POST /test_model?model_name=<name>: 202

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use dbt_jobs_core::OperationKind;
use serde::Deserialize;

use crate::dispatch::DispatchOutcome;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ModelQuery {
    pub model_name: Option<String>,
}

async fn submit(
    state: &AppState,
    query: ModelQuery,
    operation: OperationKind,
) -> ApiResult<DispatchOutcome> {
    let model_name = query
        .model_name
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("model_name must not be empty".into()))?;

    Ok(state.dispatcher.dispatch(&model_name, operation).await?)
}

/// POST /run_model - Launch (or reuse) a `dbt run` for one model.
pub async fn run_model(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ModelQuery>,
) -> ApiResult<(StatusCode, Json<DispatchOutcome>)> {
    let outcome = submit(&state, query, OperationKind::Run).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// POST /test_model - Launch (or reuse) a `dbt test` for one model.
pub async fn test_model(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ModelQuery>,
) -> ApiResult<(StatusCode, Json<DispatchOutcome>)> {
    let outcome = submit(&state, query, OperationKind::Test).await?;
    Ok((StatusCode::ACCEPTED, Json(outcome)))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/run_model", post(run_model))
        .route("/test_model", post(test_model))
}
