// crates/server/src/routes/root.rs
//! Liveness endpoints.
//!
//! - GET /: fixed liveness message
//! - GET /health: status, version and uptime

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct RootResponse {
    pub message: String,
}

/// Response for the health check endpoint.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub active_jobs: usize,
}

/// GET / - Liveness probe.
pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "App is active".to_string(),
    })
}

/// GET /health - Health check endpoint.
///
/// Returns server status, version, uptime and the number of executions
/// still running or queued.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.uptime_secs(),
        active_jobs: state.jobs.active_count(),
    })
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
}
