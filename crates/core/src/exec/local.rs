// crates/core/src/exec/local.rs
//! Local executor: spawns the `dbt` process and waits for it to exit.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use tokio::process::Command as TokioCommand;

use super::executor::DbtExecutor;
use super::types::{tail, ExecError, ExecOutput};
use crate::command::DbtCommand;

/// Characters of process output kept in errors and logs.
const OUTPUT_TAIL_CHARS: usize = 2000;

/// Executor that runs dbt as a child process of the server.
///
/// Arguments are passed as a vector, never through a shell.
#[derive(Debug, Clone)]
pub struct LocalDbtExecutor {
    program: String,
    leading_args: Vec<String>,
    project_dir: Option<PathBuf>,
    profiles_dir: Option<PathBuf>,
}

impl LocalDbtExecutor {
    /// Create an executor for the given dbt binary (e.g. "dbt").
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
            project_dir: None,
            profiles_dir: None,
        }
    }

    /// Arguments placed before the dbt verb, for wrappers such as
    /// `uv run dbt` or `python -m dbt`.
    pub fn with_leading_args(mut self, args: Vec<String>) -> Self {
        self.leading_args = args;
        self
    }

    pub fn with_project_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.project_dir = dir;
        self
    }

    pub fn with_profiles_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.profiles_dir = dir;
        self
    }

    fn build_args(&self, command: &DbtCommand) -> Vec<String> {
        let mut args = self.leading_args.clone();
        args.extend(command.to_args());
        if let Some(dir) = &self.project_dir {
            args.push("--project-dir".to_string());
            args.push(dir.display().to_string());
        }
        if let Some(dir) = &self.profiles_dir {
            args.push("--profiles-dir".to_string());
            args.push(dir.display().to_string());
        }
        args
    }
}

#[async_trait]
impl DbtExecutor for LocalDbtExecutor {
    async fn execute(&self, command: &DbtCommand) -> Result<ExecOutput, ExecError> {
        let args = self.build_args(command);
        let t0 = Instant::now();
        tracing::info!(program = %self.program, args = ?args, "dbt: spawning");

        let output = TokioCommand::new(&self.program)
            .args(&args)
            // Null stdin so the child never blocks waiting for input
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, program = %self.program, "dbt: failed to spawn process");
                ExecError::SpawnFailed(e.to_string())
            })?;

        let elapsed_ms = t0.elapsed().as_millis() as u64;
        let stdout = String::from_utf8_lossy(&output.stdout);

        if !output.status.success() {
            // dbt reports model errors on stdout; stderr carries crashes.
            let stderr = String::from_utf8_lossy(&output.stderr);
            let combined = format!("{stdout}{stderr}");
            let output_tail = tail(combined.trim_end(), OUTPUT_TAIL_CHARS).to_string();
            tracing::error!(
                elapsed_ms,
                exit_code = ?output.status.code(),
                command = %command,
                "dbt: non-zero exit"
            );
            return Err(ExecError::NonZeroExit {
                code: output.status.code(),
                output: output_tail,
            });
        }

        tracing::debug!(elapsed_ms, command = %command, "dbt: finished");
        Ok(ExecOutput {
            output: tail(&stdout, OUTPUT_TAIL_CHARS).to_string(),
            elapsed_ms,
        })
    }

    fn name(&self) -> &str {
        "local"
    }
}
