// crates/core/src/exec/executor.rs
//! DbtExecutor trait defining how a dbt command gets carried out.

use async_trait::async_trait;

use super::types::{ExecError, ExecOutput};
use crate::command::DbtCommand;

/// Something that can carry out a validated dbt command.
///
/// Implementations include:
/// - `LocalDbtExecutor`: spawns the dbt binary in this process
/// - `CallbackExecutor`: asks the service's own `/command` endpoint to run it
#[async_trait]
pub trait DbtExecutor: Send + Sync {
    /// Run the command to completion. Any failure, including a non-zero
    /// exit, is an `Err`.
    async fn execute(&self, command: &DbtCommand) -> Result<ExecOutput, ExecError>;

    /// Executor name for logging (e.g. "local", "callback").
    fn name(&self) -> &str;
}
