// crates/server/src/routes/command.rs
//! Synchronous dbt invocation.
//!
//! - POST /command?command=<verb> [--select <selector>...]

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use dbt_jobs_core::DbtCommand;
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CommandQuery {
    #[serde(default)]
    pub command: String,
}

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct CommandResponse {
    pub command: String,
    pub elapsed_ms: u64,
}

/// POST /command - Run a validated dbt command and wait for it.
///
/// Only the verbs and selector syntax `DbtCommand::parse` accepts reach the
/// process; anything else is a 400. A non-zero exit is a 500.
pub async fn run_command(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CommandQuery>,
) -> ApiResult<(StatusCode, Json<CommandResponse>)> {
    let command = DbtCommand::parse(&query.command)?;
    tracing::info!(command = %command, executor = state.command_executor.name(), "Running command");

    let output = state.command_executor.execute(&command).await?;
    tracing::info!(command = %command, elapsed_ms = output.elapsed_ms, "Command completed");

    Ok((
        StatusCode::CREATED,
        Json(CommandResponse {
            command: command.to_string(),
            elapsed_ms: output.elapsed_ms,
        }),
    ))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/command", post(run_command))
}
