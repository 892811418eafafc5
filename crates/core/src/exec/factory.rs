// crates/core/src/exec/factory.rs
//! Executor factory: creates executors from configuration.

use std::sync::Arc;

use super::callback::CallbackExecutor;
use super::config::{ExecutionMode, ExecutorConfig};
use super::executor::DbtExecutor;
use super::local::LocalDbtExecutor;
use super::token::{IdentityTokenSource, MetadataTokenSource, StaticTokenSource};
use super::types::ExecError;

/// Executor that spawns dbt in this process. Backs the synchronous
/// `/command` endpoint regardless of the execution mode.
pub fn create_local_executor(config: &ExecutorConfig) -> Result<LocalDbtExecutor, ExecError> {
    let mut words = config.dbt_bin.split_whitespace();
    let program = words
        .next()
        .ok_or_else(|| ExecError::NotConfigured("dbt binary is empty".into()))?;
    Ok(LocalDbtExecutor::new(program)
        .with_leading_args(words.map(str::to_string).collect())
        .with_project_dir(config.project_dir.clone())
        .with_profiles_dir(config.profiles_dir.clone()))
}

/// Executor used for background jobs, selected by `config.mode`.
pub fn create_executor(config: &ExecutorConfig) -> Result<Arc<dyn DbtExecutor>, ExecError> {
    match config.mode {
        ExecutionMode::Local => Ok(Arc::new(create_local_executor(config)?)),
        ExecutionMode::Callback => {
            let base_url = config.service_url.as_deref().ok_or_else(|| {
                ExecError::NotConfigured("callback mode requires a service URL".into())
            })?;
            let client = reqwest::Client::new();
            let tokens: Arc<dyn IdentityTokenSource> = match &config.identity_token {
                Some(token) => Arc::new(StaticTokenSource::new(token.clone())),
                None => Arc::new(MetadataTokenSource::new(client.clone())),
            };
            Ok(Arc::new(CallbackExecutor::new(client, base_url, tokens)))
        }
    }
}
