//! Production implementation of SimulationBackend over HTTP.

use crate::backend::{BackendOp, SimulationBackend};
use crate::error::BackendError;
use crate::types::{BackendSummary, SimulationConfig, StatusSnapshot};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// Maximum number of body characters kept in a status error.
const ERROR_BODY_LIMIT: usize = 200;

/// JSON-over-HTTP client for the dispatch service's `/api` routes.
pub struct HttpBackend {
    http: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpBackend {
    /// Creates a backend client rooted at `base_url` (e.g. `http://localhost:8080`).
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, BackendError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::network(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    /// Returns the full URL for an operation.
    pub fn endpoint(&self, op: BackendOp) -> String {
        format!("{}{}", self.base_url, op.path())
    }

    fn map_error(&self, err: reqwest::Error) -> BackendError {
        if err.is_timeout() {
            BackendError::Timeout(self.timeout.as_millis() as u64)
        } else if err.is_decode() {
            BackendError::Decode(err.to_string())
        } else {
            BackendError::Network(err.to_string())
        }
    }

    async fn check(&self, response: Response) -> Result<Response, BackendError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(BackendError::Status {
            code: status.as_u16(),
            body: body.chars().take(ERROR_BODY_LIMIT).collect(),
        })
    }

    async fn post(&self, op: BackendOp, config: Option<&SimulationConfig>) -> Result<(), BackendError> {
        let url = self.endpoint(op);
        debug!(%url, "POST");

        let request = self.http.post(&url);
        let request = match config {
            Some(config) => request.json(config),
            None => request,
        };

        let response = request.send().await.map_err(|e| self.map_error(e))?;
        // Body is informational only
        self.check(response).await.map(|_| ())
    }

    async fn get<T: DeserializeOwned>(&self, op: BackendOp) -> Result<T, BackendError> {
        let url = self.endpoint(op);
        debug!(%url, "GET");

        let response = self
            .http
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| self.map_error(e))?;

        let response = self.check(response).await?;
        let bytes = response.bytes().await.map_err(|e| self.map_error(e))?;
        serde_json::from_slice(&bytes).map_err(|e| BackendError::Decode(e.to_string()))
    }
}

#[async_trait]
impl SimulationBackend for HttpBackend {
    async fn start(&self, config: &SimulationConfig) -> Result<(), BackendError> {
        self.post(BackendOp::Start, Some(config)).await
    }

    async fn stop(&self) -> Result<(), BackendError> {
        self.post(BackendOp::Stop, None).await
    }

    async fn restart(&self, config: &SimulationConfig) -> Result<(), BackendError> {
        self.post(BackendOp::Restart, Some(config)).await
    }

    async fn status(&self) -> Result<StatusSnapshot, BackendError> {
        self.get(BackendOp::Status).await
    }

    async fn summary(&self) -> Result<BackendSummary, BackendError> {
        self.get(BackendOp::Summary).await
    }
}
