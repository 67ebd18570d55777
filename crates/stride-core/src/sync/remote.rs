//! Remote service contract and its HTTP client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

use crate::models::Collection;
use crate::store::Document;
use crate::util::{compact_text, is_http_url, normalize_text_option};

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Invalid remote configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Remote HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Remote API error: {message} ({status})")]
    Api { status: u16, message: String },
    #[error("Invalid remote response: {0}")]
    InvalidResponse(String),
    #[error("Invalid queued payload: {0}")]
    InvalidPayload(String),
    #[error("Record {0} has no server id yet")]
    MissingServerId(String),
    #[error("Remote call timed out after {0:?}")]
    Timeout(Duration),
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Retry policy classification for remote failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    Retryable,
    Permanent,
}

/// Classify an HTTP status into retry behavior.
pub const fn classify_http_status(status: u16) -> RetryClass {
    match status {
        408 | 409 | 423 | 425 | 429 | 500..=599 => RetryClass::Retryable,
        _ => RetryClass::Permanent,
    }
}

impl RemoteError {
    /// Whether a later pass can reasonably expect a different outcome
    pub const fn retry_class(&self) -> RetryClass {
        match self {
            Self::Http(_) | Self::Timeout(_) | Self::MissingServerId(_) => RetryClass::Retryable,
            Self::Api { status, .. } => classify_http_status(*status),
            Self::InvalidConfiguration(_) | Self::InvalidResponse(_) | Self::InvalidPayload(_) => {
                RetryClass::Permanent
            }
        }
    }
}

/// The remote side of synchronization.
///
/// Delivery is at-least-once: a call whose acknowledgement was lost is sent
/// again on a later pass.
#[async_trait]
pub trait RemoteService: Send + Sync {
    /// Create the record remotely, returning its server id
    async fn create(&self, collection: Collection, payload: &Document) -> RemoteResult<String>;

    async fn update(
        &self,
        collection: Collection,
        server_id: &str,
        payload: &Document,
    ) -> RemoteResult<()>;

    async fn delete(&self, collection: Collection, server_id: &str) -> RemoteResult<()>;
}

/// Stand-in remote for local-only mode; every call fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalOnlyRemote;

#[async_trait]
impl RemoteService for LocalOnlyRemote {
    async fn create(&self, _collection: Collection, _payload: &Document) -> RemoteResult<String> {
        Err(not_configured())
    }

    async fn update(
        &self,
        _collection: Collection,
        _server_id: &str,
        _payload: &Document,
    ) -> RemoteResult<()> {
        Err(not_configured())
    }

    async fn delete(&self, _collection: Collection, _server_id: &str) -> RemoteResult<()> {
        Err(not_configured())
    }
}

fn not_configured() -> RemoteError {
    RemoteError::InvalidConfiguration("no remote service configured".to_string())
}

/// REST client: `POST {base}/{collection}`, `PUT`/`DELETE {base}/{collection}/{id}`.
#[derive(Clone)]
pub struct HttpRemoteService {
    base_url: String,
    auth_token: Option<String>,
    client: reqwest::Client,
}

impl std::fmt::Debug for HttpRemoteService {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("HttpRemoteService")
            .field("base_url", &self.base_url)
            .field(
                "auth_token",
                &self.auth_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl HttpRemoteService {
    pub fn new(base_url: impl Into<String>) -> RemoteResult<Self> {
        let base_url = normalize_base_url(base_url.into())?;
        Ok(Self {
            base_url,
            auth_token: None,
            client: reqwest::Client::builder().build()?,
        })
    }

    /// Send `Authorization: Bearer <token>` with every request
    #[must_use]
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = normalize_text_option(Some(token.into()));
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn collection_url(&self, collection: Collection) -> String {
        format!("{}/{}", self.base_url, collection.name())
    }

    fn record_url(&self, collection: Collection, server_id: &str) -> String {
        format!("{}/{}/{}", self.base_url, collection.name(), server_id)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let request = request.header(reqwest::header::ACCEPT, "application/json");
        match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn check(response: reqwest::Response) -> RemoteResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(RemoteError::Api {
            status: status.as_u16(),
            message: parse_api_error(status, &body),
        })
    }
}

#[async_trait]
impl RemoteService for HttpRemoteService {
    async fn create(&self, collection: Collection, payload: &Document) -> RemoteResult<String> {
        let response = self
            .authorize(self.client.post(self.collection_url(collection)))
            .json(payload)
            .send()
            .await?;
        let response = Self::check(response).await?;

        let created = response.json::<CreateResponse>().await?;
        created.into_server_id()
    }

    async fn update(
        &self,
        collection: Collection,
        server_id: &str,
        payload: &Document,
    ) -> RemoteResult<()> {
        let response = self
            .authorize(self.client.put(self.record_url(collection, server_id)))
            .json(payload)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn delete(&self, collection: Collection, server_id: &str) -> RemoteResult<()> {
        let response = self
            .authorize(self.client.delete(self.record_url(collection, server_id)))
            .send()
            .await?;
        match Self::check(response).await {
            Ok(_) => Ok(()),
            // Already gone remotely: a retried delete whose first ack was lost
            Err(RemoteError::Api { status: 404, .. }) => Ok(()),
            Err(error) => Err(error),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateResponse {
    server_id: Option<serde_json::Value>,
    id: Option<serde_json::Value>,
}

impl CreateResponse {
    fn into_server_id(self) -> RemoteResult<String> {
        let value = self.server_id.or(self.id).ok_or_else(|| {
            RemoteError::InvalidResponse("response did not include serverId/id".to_string())
        })?;

        let server_id = match value {
            serde_json::Value::String(id) => id.trim().to_string(),
            serde_json::Value::Number(id) => id.to_string(),
            other => {
                return Err(RemoteError::InvalidResponse(format!(
                    "unsupported server id value: {other}"
                )))
            }
        };

        if server_id.is_empty() {
            return Err(RemoteError::InvalidResponse(
                "server id must not be empty".to_string(),
            ));
        }
        Ok(server_id)
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return compact_text(&message);
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        trimmed
    }
}

fn normalize_base_url(raw: String) -> RemoteResult<String> {
    let base_url = normalize_text_option(Some(raw)).ok_or_else(|| {
        RemoteError::InvalidConfiguration("base URL must not be empty".to_string())
    })?;
    if is_http_url(&base_url) {
        Ok(base_url.trim_end_matches('/').to_string())
    } else {
        Err(RemoteError::InvalidConfiguration(
            "base URL must include http:// or https://".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalize_base_url_rejects_invalid_values() {
        assert!(normalize_base_url(String::new()).is_err());
        assert!(normalize_base_url("api.example.com".to_string()).is_err());
        assert_eq!(
            normalize_base_url(" https://api.example.com/v1/ ".to_string()).unwrap(),
            "https://api.example.com/v1"
        );
    }

    #[test]
    fn record_urls_use_collection_names() {
        let remote = HttpRemoteService::new("https://api.example.com/v1").unwrap();
        assert_eq!(
            remote.collection_url(Collection::Cravings),
            "https://api.example.com/v1/cravings"
        );
        assert_eq!(
            remote.record_url(Collection::Progress, "42"),
            "https://api.example.com/v1/progress/42"
        );
    }

    #[test]
    fn debug_redacts_token() {
        let remote = HttpRemoteService::new("https://api.example.com")
            .unwrap()
            .with_bearer_token("secret");
        let debug = format!("{remote:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn create_response_accepts_string_or_numeric_ids() {
        let from_server_id: CreateResponse =
            serde_json::from_value(json!({ "serverId": "srv-1" })).unwrap();
        assert_eq!(from_server_id.into_server_id().unwrap(), "srv-1");

        let from_numeric_id: CreateResponse = serde_json::from_value(json!({ "id": 17 })).unwrap();
        assert_eq!(from_numeric_id.into_server_id().unwrap(), "17");

        let missing: CreateResponse = serde_json::from_value(json!({})).unwrap();
        assert!(matches!(
            missing.into_server_id(),
            Err(RemoteError::InvalidResponse(_))
        ));
    }

    #[test]
    fn parse_api_error_prefers_json_message() {
        assert_eq!(
            parse_api_error(StatusCode::BAD_REQUEST, r#"{"message":"bad payload"}"#),
            "bad payload"
        );
        assert_eq!(parse_api_error(StatusCode::BAD_GATEWAY, "  "), "HTTP 502");
        assert_eq!(
            parse_api_error(StatusCode::INTERNAL_SERVER_ERROR, "boom"),
            "boom"
        );
    }

    #[test]
    fn classify_http_status_for_retry_policy() {
        assert_eq!(classify_http_status(500), RetryClass::Retryable);
        assert_eq!(classify_http_status(429), RetryClass::Retryable);
        assert_eq!(classify_http_status(400), RetryClass::Permanent);
        assert_eq!(
            RemoteError::Timeout(Duration::from_secs(1)).retry_class(),
            RetryClass::Retryable
        );
    }

    #[tokio::test]
    async fn local_only_remote_rejects_calls() {
        let error = LocalOnlyRemote
            .create(Collection::Tasks, &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(error, RemoteError::InvalidConfiguration(_)));
    }
}
