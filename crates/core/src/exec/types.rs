// crates/core/src/exec/types.rs
//! Output and error types for dbt execution.

use thiserror::Error;

use super::token::TokenError;

/// Result of a dbt invocation that completed successfully.
#[derive(Debug, Clone, Default)]
pub struct ExecOutput {
    /// Captured stdout (local) or response body (callback).
    pub output: String,
    pub elapsed_ms: u64,
}

/// Errors that can occur while executing a dbt command.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("Failed to spawn dbt process: {0}")]
    SpawnFailed(String),

    #[error("dbt exited with code {code:?}: {output}")]
    NonZeroExit { code: Option<i32>, output: String },

    #[error("Identity token unavailable: {0}")]
    Token(#[from] TokenError),

    #[error("Callback request failed: {0}")]
    Http(String),

    #[error("Callback returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Executor not configured: {0}")]
    NotConfigured(String),
}

/// Last `max_chars` characters of `s`, cut on a char boundary.
pub(crate) fn tail(s: &str, max_chars: usize) -> &str {
    let count = s.chars().count();
    if count <= max_chars {
        return s;
    }
    match s.char_indices().nth(count - max_chars) {
        Some((idx, _)) => &s[idx..],
        None => s,
    }
}
