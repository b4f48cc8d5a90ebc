//! JSON-over-HTTP client for the SQL execution service.
//!
//! Posts each call to `{endpoint}/{Action}` (`Execute`, `BeginTransaction`,
//! `CommitTransaction`, `RollbackTransaction`) and maps failures onto the
//! driver's error taxonomy. Requests are never retried here: a statement
//! that timed out may already have been applied.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{DataApiError, Result};
use crate::service::wire::{
    BeginTransactionRequest, BeginTransactionResponse, CommitTransactionRequest,
    CommitTransactionResponse, ExecuteStatementRequest, ExecuteStatementResponse,
    RollbackTransactionRequest, RollbackTransactionResponse, ServiceErrorBody,
};
use crate::service::DataApiService;

/// Configuration for the HTTP service client.
#[derive(Debug, Clone)]
pub struct HttpServiceConfig {
    /// Connection timeout duration.
    pub connect_timeout: Duration,
    /// Whole-request timeout duration.
    pub read_timeout: Duration,
    /// User agent string.
    pub user_agent: String,
    /// Extra headers sent with every request (e.g. a pre-computed authorization).
    pub default_headers: Vec<(String, String)>,
}

impl Default for HttpServiceConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            read_timeout: Duration::from_secs(60),
            user_agent: format!("data-api-rs/{}", env!("CARGO_PKG_VERSION")),
            default_headers: Vec::new(),
        }
    }
}

/// HTTP client for the service's REST endpoints.
#[derive(Debug)]
pub struct HttpDataApiService {
    client: Client,
    endpoint: String,
    config: HttpServiceConfig,
}

impl HttpDataApiService {
    /// Creates a client for the service at `endpoint`, e.g. `http://localhost:8080`.
    pub fn new(endpoint: impl Into<String>, config: HttpServiceConfig) -> Result<Self> {
        let endpoint = endpoint.into();
        if endpoint.trim().is_empty() {
            return Err(DataApiError::Config("service endpoint is empty".to_string()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        for (name, value) in &config.default_headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| DataApiError::Config(format!("invalid header name {}: {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| DataApiError::Config(format!("invalid header value: {}", e)))?;
            headers.insert(name, value);
        }

        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.read_timeout)
            .user_agent(&config.user_agent)
            .default_headers(headers)
            .build()
            .map_err(|e| DataApiError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            config,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn config(&self) -> &HttpServiceConfig {
        &self.config
    }

    fn action_url(&self, action: &str) -> String {
        format!("{}/{}", self.endpoint, action)
    }

    async fn post<Req, Resp>(&self, action: &str, body: &Req) -> Result<Resp>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let url = self.action_url(action);
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| DataApiError::Connectivity(format!("{} request failed: {}", action, e)))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            DataApiError::Connectivity(format!("Failed to read {} response: {}", action, e))
        })?;

        if !status.is_success() {
            let err = classify_failure(status, &text);
            warn!("{} failed with HTTP {}: {}", action, status.as_u16(), err);
            return Err(err);
        }

        serde_json::from_str(&text).map_err(|e| {
            DataApiError::Marshal(format!(
                "Failed to parse {} response: {} - body: {}",
                action, e, text
            ))
        })
    }
}

#[async_trait]
impl DataApiService for HttpDataApiService {
    async fn execute_statement(
        &self,
        request: ExecuteStatementRequest,
    ) -> Result<ExecuteStatementResponse> {
        self.post("Execute", &request).await
    }

    async fn begin_transaction(
        &self,
        request: BeginTransactionRequest,
    ) -> Result<BeginTransactionResponse> {
        self.post("BeginTransaction", &request).await
    }

    async fn commit_transaction(
        &self,
        request: CommitTransactionRequest,
    ) -> Result<CommitTransactionResponse> {
        self.post("CommitTransaction", &request).await
    }

    async fn rollback_transaction(
        &self,
        request: RollbackTransactionRequest,
    ) -> Result<RollbackTransactionResponse> {
        self.post("RollbackTransaction", &request).await
    }
}

/// Maps a non-2xx response onto the error taxonomy.
fn classify_failure(status: StatusCode, body: &str) -> DataApiError {
    let parsed: ServiceErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = parsed
        .message
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                format!("HTTP {}", status.as_u16())
            } else {
                trimmed.to_string()
            }
        });

    if matches!(
        status,
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT
    ) {
        return DataApiError::Connectivity(message);
    }

    if mentions_dead_transaction(&message) {
        DataApiError::TransactionExpired(message)
    } else {
        DataApiError::RemoteRejected(message)
    }
}

fn mentions_dead_transaction(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    if !lower.contains("transaction") {
        return false;
    }
    ["not found", "expired", "timed out", "timeout", "invalid transaction"]
        .iter()
        .any(|needle| lower.contains(needle))
}
