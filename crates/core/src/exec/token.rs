// crates/core/src/exec/token.rs
//! Identity tokens for calls that cross the service's own auth boundary.

use async_trait::async_trait;
use thiserror::Error;

/// Default GCE / Cloud Run metadata endpoint for OIDC identity tokens.
pub const METADATA_IDENTITY_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/identity";

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("metadata server request failed: {0}")]
    Request(String),

    #[error("metadata server returned HTTP {0}")]
    Status(u16),

    #[error("metadata server returned an empty token")]
    Empty,
}

/// Source of bearer tokens scoped to an audience URL.
#[async_trait]
pub trait IdentityTokenSource: Send + Sync {
    async fn fetch(&self, audience: &str) -> Result<String, TokenError>;
}

/// Fetches identity tokens from the instance metadata server.
pub struct MetadataTokenSource {
    client: reqwest::Client,
    endpoint: String,
}

impl MetadataTokenSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_endpoint(client, METADATA_IDENTITY_URL)
    }

    pub fn with_endpoint(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl IdentityTokenSource for MetadataTokenSource {
    async fn fetch(&self, audience: &str) -> Result<String, TokenError> {
        let resp = self
            .client
            .get(&self.endpoint)
            .query(&[("audience", audience)])
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| TokenError::Request(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(TokenError::Status(resp.status().as_u16()));
        }

        let token = resp
            .text()
            .await
            .map_err(|e| TokenError::Request(e.to_string()))?;
        let token = token.trim();
        if token.is_empty() {
            return Err(TokenError::Empty);
        }
        Ok(token.to_string())
    }
}

/// A fixed token, for deployments where the token is minted outside the service.
pub struct StaticTokenSource(String);

impl StaticTokenSource {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl IdentityTokenSource for StaticTokenSource {
    async fn fetch(&self, _audience: &str) -> Result<String, TokenError> {
        Ok(self.0.clone())
    }
}
