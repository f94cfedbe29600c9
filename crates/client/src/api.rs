//! REST client for the analysis status endpoint.
//!
//! Wraps `GET /scripts/{script_id}/versions/{version_id}/analysis/status`
//! using [`reqwest`].

use async_trait::async_trait;
use reel_core::StatusSnapshot;

/// The script version whose status is watched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusTarget {
    pub script_id: String,
    pub version_id: String,
}

impl StatusTarget {
    pub fn new(script_id: impl Into<String>, version_id: impl Into<String>) -> Self {
        Self {
            script_id: script_id.into(),
            version_id: version_id.into(),
        }
    }
}

/// Errors from the status REST layer.
#[derive(Debug, thiserror::Error)]
pub enum StatusApiError {
    /// The HTTP request itself failed (network, DNS, TLS, body decode).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend rejected the credentials (401/403).
    #[error("Not authorized to read status ({status})")]
    Unauthorized { status: u16 },

    /// The backend returned another non-2xx status code.
    #[error("Status API error ({status}): {body}")]
    Api { status: u16, body: String },
}

impl StatusApiError {
    /// Whether retrying the same request could succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Unauthorized { .. })
    }
}

/// Anything that can produce a status snapshot for a target.
#[async_trait]
pub trait StatusSource: Send + Sync + 'static {
    async fn get_status(&self, target: &StatusTarget) -> Result<StatusSnapshot, StatusApiError>;
}

/// HTTP client for the status endpoint of one backend.
pub struct StatusApi {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl StatusApi {
    /// * `base_url` - Backend base URL, e.g. `https://api.example.com/v1`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Reuse an existing [`reqwest::Client`] (shared connection pool).
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            token: None,
        }
    }

    /// Send `Authorization: Bearer <token>` with every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn status_url(&self, target: &StatusTarget) -> String {
        format!(
            "{}/scripts/{}/versions/{}/analysis/status",
            self.base_url, target.script_id, target.version_id
        )
    }

    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, StatusApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let code = status.as_u16();
        if code == 401 || code == 403 {
            return Err(StatusApiError::Unauthorized { status: code });
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        Err(StatusApiError::Api { status: code, body })
    }
}

#[async_trait]
impl StatusSource for StatusApi {
    async fn get_status(&self, target: &StatusTarget) -> Result<StatusSnapshot, StatusApiError> {
        let mut request = self.client.get(self.status_url(target));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        tracing::debug!(
            script_id = %target.script_id,
            version_id = %target.version_id,
            "Fetching analysis status",
        );

        let response = Self::ensure_success(request.send().await?).await?;
        Ok(response.json::<StatusSnapshot>().await?)
    }
}
