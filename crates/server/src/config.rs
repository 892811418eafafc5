// crates/server/src/config.rs
//! Command-line and environment configuration for the server binary.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use clap::Parser;
use dbt_jobs_core::exec::{ExecutionMode, ExecutorConfig};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{other}' (expected text or json)")),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid bind address '{0}'")]
    BadAddress(String),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("--service-url is required when --execution-mode is callback")]
    MissingServiceUrl,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "dbt-jobs")]
#[command(about = "HTTP job-tracking API in front of dbt run/test")]
#[command(version)]
pub struct Config {
    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 8000)]
    pub port: u16,

    /// Interface to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Job ledger SQLite file (defaults to the user cache directory)
    #[arg(long, env = "DBT_JOBS_DB")]
    pub database_path: Option<PathBuf>,

    /// Connection pool size for the ledger
    #[arg(long, env = "DB_MAX_CONNECTIONS", default_value_t = dbt_jobs_db::DEFAULT_MAX_CONNECTIONS)]
    pub db_max_connections: u32,

    /// dbt executable, optionally followed by leading arguments
    #[arg(long, env = "DBT_BIN", default_value = "dbt")]
    pub dbt_bin: String,

    /// Passed to dbt as --project-dir
    #[arg(long, env = "DBT_PROJECT_DIR")]
    pub project_dir: Option<PathBuf>,

    /// Passed to dbt as --profiles-dir
    #[arg(long, env = "DBT_PROFILES_DIR")]
    pub profiles_dir: Option<PathBuf>,

    /// How dispatched jobs reach dbt: local or callback
    #[arg(long, env = "EXECUTION_MODE", default_value = "local")]
    pub execution_mode: ExecutionMode,

    /// Public base URL of this service, used by callback mode
    #[arg(long, env = "SERVICE_URL")]
    pub service_url: Option<String>,

    /// Fixed identity token for callback mode instead of the metadata server
    #[arg(long, env = "IDENTITY_TOKEN", hide_env_values = true)]
    pub identity_token: Option<String>,

    /// Seconds a previous job for the same model and operation is reused
    #[arg(long, env = "DEDUP_WINDOW_SECS", default_value_t = 3600)]
    pub dedup_window_secs: u64,

    /// Executions allowed to run at the same time
    #[arg(long, env = "MAX_CONCURRENT_JOBS", default_value_t = 4)]
    pub max_concurrent_jobs: usize,

    /// Seconds to wait for running jobs on shutdown
    #[arg(long, env = "SHUTDOWN_GRACE_SECS", default_value_t = 30)]
    pub shutdown_grace_secs: u64,

    /// Log output: text or json
    #[arg(long, env = "LOG_FORMAT", default_value = "text")]
    pub log_format: LogFormat,
}

impl Config {
    /// Check values clap cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()?;
        if self.dedup_window_secs == 0 {
            return Err(ConfigError::Zero("--dedup-window-secs"));
        }
        if self.max_concurrent_jobs == 0 {
            return Err(ConfigError::Zero("--max-concurrent-jobs"));
        }
        if self.db_max_connections == 0 {
            return Err(ConfigError::Zero("--db-max-connections"));
        }
        if self.execution_mode == ExecutionMode::Callback && self.service_url.is_none() {
            return Err(ConfigError::MissingServiceUrl);
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse().map_err(|_| ConfigError::BadAddress(addr))
    }

    pub fn dedup_window(&self) -> Duration {
        Duration::from_secs(self.dedup_window_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    /// Executor settings for dispatched jobs.
    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            mode: self.execution_mode,
            dbt_bin: self.dbt_bin.clone(),
            project_dir: self.project_dir.clone(),
            profiles_dir: self.profiles_dir.clone(),
            service_url: self.service_url.clone(),
            identity_token: self.identity_token.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        let mut argv = vec!["dbt-jobs"];
        argv.extend_from_slice(args);
        Config::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_explicit_flags() {
        let config = parse(&[
            "--port",
            "9000",
            "--host",
            "127.0.0.1",
            "--dedup-window-secs",
            "60",
            "--max-concurrent-jobs",
            "2",
            "--log-format",
            "json",
            "--dbt-bin",
            "uv run dbt",
        ]);
        assert_eq!(config.port, 9000);
        assert_eq!(config.bind_addr().unwrap().to_string(), "127.0.0.1:9000");
        assert_eq!(config.dedup_window(), Duration::from_secs(60));
        assert_eq!(config.max_concurrent_jobs, 2);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.executor_config().dbt_bin, "uv run dbt");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_callback_requires_service_url() {
        let config = parse(&["--execution-mode", "callback"]);
        assert_eq!(config.validate(), Err(ConfigError::MissingServiceUrl));

        let config = parse(&[
            "--execution-mode",
            "callback",
            "--service-url",
            "https://dbt-jobs.example.run.app",
        ]);
        assert!(config.validate().is_ok());
        assert_eq!(config.executor_config().mode, ExecutionMode::Callback);
    }

    #[test]
    fn test_zero_values_rejected() {
        let config = parse(&["--dedup-window-secs", "0"]);
        assert_eq!(config.validate(), Err(ConfigError::Zero("--dedup-window-secs")));

        let config = parse(&["--max-concurrent-jobs", "0"]);
        assert_eq!(config.validate(), Err(ConfigError::Zero("--max-concurrent-jobs")));
    }

    #[test]
    fn test_bad_host_rejected() {
        let config = parse(&["--host", "not an address"]);
        assert!(matches!(config.validate(), Err(ConfigError::BadAddress(_))));
    }

    #[test]
    fn test_unknown_enum_values_fail_parsing() {
        assert!(Config::try_parse_from(["dbt-jobs", "--log-format", "xml"]).is_err());
        assert!(Config::try_parse_from(["dbt-jobs", "--execution-mode", "remote"]).is_err());
    }
}
