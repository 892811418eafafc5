// crates/server/src/main.rs
//! dbt-jobs server binary.
//!
//! Opens the job ledger, builds the executors, serves the HTTP API, and on
//! Ctrl-C/SIGTERM drains background jobs before closing the ledger.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use dbt_jobs_core::exec::{create_executor, create_local_executor, DbtExecutor, ExecutionMode};
use dbt_jobs_db::Database;
use dbt_jobs_server::jobs::JobRunner;
use dbt_jobs_server::{create_app, AppState, Config, LogFormat};
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "warn,dbt_jobs_server=info,dbt_jobs_core=info,dbt_jobs_db=info,tower_http=info";

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    match format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_current_span(false)
            .with_env_filter(filter)
            .init(),
    }
}

/// Resolves when the process receives Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();
    init_tracing(config.log_format);
    config.validate()?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting dbt-jobs");

    // Step 1: Open the ledger
    let db_path = match &config.database_path {
        Some(path) => path.clone(),
        None => dbt_jobs_db::default_db_path()?,
    };
    let db = Database::with_max_connections(&db_path, config.db_max_connections)
        .await
        .with_context(|| format!("opening job ledger at {}", db_path.display()))?;

    // Step 2: Executors. `/command` always runs dbt locally; dispatched jobs
    // go through the callback when configured.
    let exec_config = config.executor_config();
    let command_executor: Arc<dyn DbtExecutor> = Arc::new(create_local_executor(&exec_config)?);
    let job_executor = match exec_config.mode {
        ExecutionMode::Local => Arc::clone(&command_executor),
        ExecutionMode::Callback => create_executor(&exec_config)?,
    };
    info!(
        job_executor = job_executor.name(),
        dbt_bin = %exec_config.dbt_bin,
        "Executors ready"
    );

    // Step 3: Runner, dispatcher, state
    let runner = Arc::new(JobRunner::new(config.max_concurrent_jobs));
    let state = AppState::new(
        db.clone(),
        Arc::clone(&runner),
        job_executor,
        command_executor,
        config.dedup_window(),
    );
    let app = create_app(state);

    // Step 4: Serve until a shutdown signal
    let addr = config.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, dedup_window_secs = config.dedup_window_secs, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Step 5: Drain background jobs, then close the ledger
    if !runner.shutdown(config.shutdown_grace()).await {
        tracing::warn!("Shutdown grace period elapsed with jobs still running");
    }
    db.close().await;

    Ok(())
}
