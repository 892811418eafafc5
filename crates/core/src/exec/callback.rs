// crates/core/src/exec/callback.rs
//! Callback executor: runs dbt by calling the service's own `/command`
//! endpoint with an identity token, so the work lands on an instance that
//! is allowed to run it.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use super::executor::DbtExecutor;
use super::token::IdentityTokenSource;
use super::types::{tail, ExecError, ExecOutput};
use crate::command::DbtCommand;

const BODY_TAIL_CHARS: usize = 500;

pub struct CallbackExecutor {
    client: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn IdentityTokenSource>,
}

impl CallbackExecutor {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        tokens: Arc<dyn IdentityTokenSource>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens,
        }
    }

    /// Token audience: the service root, always with a trailing slash.
    pub fn audience(&self) -> String {
        format!("{}/", self.base_url)
    }

    fn command_url(&self) -> String {
        format!("{}/command", self.base_url)
    }
}

#[async_trait]
impl DbtExecutor for CallbackExecutor {
    async fn execute(&self, command: &DbtCommand) -> Result<ExecOutput, ExecError> {
        let t0 = Instant::now();
        let token = self.tokens.fetch(&self.audience()).await?;

        tracing::info!(url = %self.command_url(), command = %command, "dbt callback: posting");
        let resp = self
            .client
            .post(self.command_url())
            .query(&[("command", command.to_string())])
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| ExecError::Http(e.to_string()))?;

        let status = resp.status();
        let body = match resp.text().await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(status = status.as_u16(), error = %e, command = %command, "dbt callback: failed to read response body");
                String::new()
            }
        };
        let elapsed_ms = t0.elapsed().as_millis() as u64;

        if !status.is_success() {
            tracing::error!(elapsed_ms, status = status.as_u16(), command = %command, "dbt callback: request rejected");
            return Err(ExecError::Status {
                status: status.as_u16(),
                body: tail(&body, BODY_TAIL_CHARS).to_string(),
            });
        }

        Ok(ExecOutput {
            output: body,
            elapsed_ms,
        })
    }

    fn name(&self) -> &str {
        "callback"
    }
}
