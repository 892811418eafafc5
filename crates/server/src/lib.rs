// crates/server/src/lib.rs
//! dbt-jobs server library.
//!
//! Axum HTTP API that launches `dbt run` / `dbt test` for single models,
//! coalesces repeated requests onto recent jobs, and reports job status
//! from a SQLite ledger.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod jobs;
pub mod routes;
pub mod state;

pub use config::{Config, LogFormat};
pub use dispatch::{DispatchOutcome, Dispatcher};
pub use error::*;
pub use routes::api_routes;
pub use state::AppState;

use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the Axum application with all routes and middleware.
///
/// This sets up:
/// - job and command routes
/// - CORS (allows any origin)
/// - Request tracing
pub fn create_app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(api_routes(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
