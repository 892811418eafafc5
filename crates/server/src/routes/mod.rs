//! API route handlers for the dbt-jobs server.

pub mod command;
pub mod jobs;
pub mod models;
pub mod root;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

/// Create the combined router.
///
/// Routes:
/// - GET  / - Liveness message
/// - GET  /health - Status, version, uptime
/// - POST /run_model?model_name= - Launch or reuse a dbt run
/// - POST /test_model?model_name= - Launch or reuse a dbt test
/// - GET  /job?job_id= - Ledger status of a job
/// - GET  /jobs/active - In-flight executions
/// - GET  /jobs/{job_id} - Full ledger row
/// - POST /command?command= - Run a validated dbt command synchronously
pub fn api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(root::router())
        .merge(models::router())
        .merge(jobs::router())
        .merge(command::router())
        .with_state(state)
}
