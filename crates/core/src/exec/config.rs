// crates/core/src/exec/config.rs
//! Executor configuration types.

use std::path::PathBuf;
use std::str::FromStr;

use crate::types::UnknownVariant;

/// Where background dbt work is carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// Spawn dbt in this process.
    #[default]
    Local,
    /// POST to the service's own `/command` endpoint with an identity token.
    Callback,
}

impl FromStr for ExecutionMode {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(ExecutionMode::Local),
            "callback" => Ok(ExecutionMode::Callback),
            other => Err(UnknownVariant {
                kind: "execution mode",
                value: other.to_string(),
            }),
        }
    }
}

/// Configuration for building executors.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub mode: ExecutionMode,
    /// dbt program; extra whitespace-separated words become leading args
    /// (e.g. "uv run dbt").
    pub dbt_bin: String,
    pub project_dir: Option<PathBuf>,
    pub profiles_dir: Option<PathBuf>,
    /// Public base URL of this service, required in callback mode.
    pub service_url: Option<String>,
    /// Pre-minted identity token; the metadata server is used when absent.
    pub identity_token: Option<String>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::Local,
            dbt_bin: "dbt".into(),
            project_dir: None,
            profiles_dir: None,
            service_url: None,
            identity_token: None,
        }
    }
}
