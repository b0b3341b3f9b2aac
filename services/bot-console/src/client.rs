//! Trading bridge HTTP client

use std::time::Duration;

use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{AuthError, BotError, CredentialError};
use crate::session::Session;

/// Header carrying a per-mutation correlation id
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Fallback when the bridge gives no usable detail
const GENERIC_DETAIL: &str = "Request failed";

/// Longest body text passed through as a detail
const MAX_DETAIL_LEN: usize = 200;

/// Client for the trading bridge control plane
pub struct BridgeClient {
    client: Client,
    base_url: String,
    session: Session,
}

/// Transport-level failure before it is mapped into a domain error
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum BridgeFailure {
    Auth(AuthError),
    Status { status: StatusCode, detail: String },
    Timeout,
    Transport(String),
    Decode(String),
}

impl BridgeClient {
    /// Create new bridge client
    pub fn new(base_url: &str, session: Session, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Send a request and return the successful response.
    ///
    /// Only the path is ever logged; query strings may carry credentials.
    pub(crate) async fn call<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&B>,
    ) -> Result<Response, BridgeFailure> {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.client.request(method.clone(), &url);
        if !query.is_empty() {
            req = req.query(query);
        }
        if let Some(body) = body {
            req = req.json(body);
        }
        if method != Method::GET {
            let request_id = Uuid::new_v4();
            debug!("{} {} request_id={}", method, path, request_id);
            req = req.header(REQUEST_ID_HEADER, request_id.to_string());
        } else {
            debug!("{} {}", method, path);
        }
        let req = self.session.authorize(req).map_err(BridgeFailure::Auth)?;

        let response = req.send().await.map_err(|e| {
            let e = e.without_url();
            if e.is_timeout() {
                BridgeFailure::Timeout
            } else {
                BridgeFailure::Transport(e.to_string())
            }
        })?;

        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            let detail = extract_detail(status, &text);
            warn!("{} {} failed: {} - {}", method, path, status, detail);
            Err(BridgeFailure::Status { status, detail })
        }
    }

    pub(crate) async fn call_json<B, T>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&B>,
    ) -> Result<T, BridgeFailure>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.call(method, path, query, body).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| BridgeFailure::Decode(e.without_url().to_string()))
    }
}

/// Pull a human-readable message out of an error body.
///
/// Looks at `detail`, `error` and `message` keys (FastAPI-style `detail`
/// lists are joined), then the raw text, then a generic message.
pub fn extract_detail(status: StatusCode, body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["detail", "error", "message"] {
            match json.get(key) {
                Some(serde_json::Value::String(s)) if !s.trim().is_empty() => {
                    return s.trim().to_string();
                }
                Some(serde_json::Value::Array(items)) => {
                    let msgs: Vec<String> = items
                        .iter()
                        .filter_map(|i| match i {
                            serde_json::Value::String(s) => Some(s.clone()),
                            other => other.get("msg").and_then(|m| m.as_str()).map(String::from),
                        })
                        .collect();
                    if !msgs.is_empty() {
                        return msgs.join("; ");
                    }
                }
                _ => {}
            }
        }
    }

    let text = body.trim();
    if !text.is_empty() && !text.starts_with('<') {
        return text.chars().take(MAX_DETAIL_LEN).collect();
    }
    format!("{} ({})", GENERIC_DETAIL, status)
}

impl From<BridgeFailure> for BotError {
    fn from(failure: BridgeFailure) -> Self {
        match failure {
            BridgeFailure::Auth(e) => BotError::Auth(e),
            BridgeFailure::Timeout => BotError::Timeout,
            BridgeFailure::Transport(e) => BotError::NetworkError(e),
            BridgeFailure::Decode(e) => BotError::UnexpectedResponse(e),
            BridgeFailure::Status { status, detail } => {
                let lower = detail.to_lowercase();
                match status {
                    StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                        BotError::Auth(AuthError::Rejected(detail))
                    }
                    StatusCode::NOT_FOUND => BotError::NotFound,
                    StatusCode::CONFLICT => BotError::DuplicateName,
                    _ if lower.contains("already exists") => BotError::DuplicateName,
                    StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY
                        if lower.contains("address") || lower.contains("mint") || lower.contains("token") =>
                    {
                        BotError::InvalidAddressFormat(detail)
                    }
                    _ => BotError::RemoteRejected(detail),
                }
            }
        }
    }
}

impl From<BridgeFailure> for CredentialError {
    fn from(failure: BridgeFailure) -> Self {
        match failure {
            BridgeFailure::Auth(e) => CredentialError::Auth(e),
            BridgeFailure::Timeout => CredentialError::Timeout,
            BridgeFailure::Transport(e) => CredentialError::NetworkError(e),
            BridgeFailure::Decode(e) => {
                CredentialError::RemoteRejected(format!("Unexpected response: {}", e))
            }
            BridgeFailure::Status { status, detail } => match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    CredentialError::Auth(AuthError::Rejected(detail))
                }
                _ => CredentialError::RemoteRejected(detail),
            },
        }
    }
}
