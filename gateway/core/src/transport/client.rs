//! HTTP Transport
//!
//! The reqwest-backed [`Transport`] implementation. Responsibilities:
//!
//! - build the request with default JSON headers, merged with any
//!   caller-supplied headers (caller headers win)
//! - parse the body only when the response advertises JSON and is
//!   non-empty; empty/204 responses yield no payload, not an error
//! - on a failed status, extract the message through the ordered chain
//!   in [`super::extract`] and return a protocol error
//!
//! Every failure is logged with the originating path. Logging is a
//! diagnostic side effect, not part of the contract.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use serde_json::Value;

use super::extract::error_message;
use super::request::{ApiRequest, HttpMethod};
use crate::config::ClientConfig;
use crate::error::ApiError;

/// Transport seam between domain gateways and the wire.
///
/// `Ok(None)` models an empty (zero-length or 204) success response.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue a request and return its normalized payload
    async fn send(&self, request: &ApiRequest) -> Result<Option<Value>, ApiError>;
}

/// Transport backed by a reqwest client
#[derive(Clone)]
pub struct HttpTransport {
    base_url: String,
    http_client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport for the configured backend origin.
    ///
    /// # Panics
    ///
    /// Panics if the underlying HTTP client cannot be constructed, which
    /// only happens when the system TLS configuration is broken.
    #[must_use]
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http_client: reqwest::Client::builder()
                .timeout(config.timeout)
                .build()
                .expect("Failed to create HTTP client"),
        }
    }

    /// The configured backend origin
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn build_headers(request: &ApiRequest) -> Result<HeaderMap, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        for (name, value) in request.headers() {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| ApiError::transport(format!("Invalid header name: {name}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| ApiError::transport(format!("Invalid value for header {name}")))?;
            // insert, not append: a caller header replaces the default
            headers.insert(name, value);
        }

        Ok(headers)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &ApiRequest) -> Result<Option<Value>, ApiError> {
        let url = self.url_for(request.path());
        let method = match request.method() {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
        };

        let mut builder = self
            .http_client
            .request(method, &url)
            .headers(Self::build_headers(request)?);
        if let Some(body) = request.body() {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            tracing::error!(path = request.path(), error = %e, "request failed to complete");
            ApiError::transport(format!("Request to {} failed: {e}", request.path()))
        })?;

        let status = response.status();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("application/json"));

        let text = response.text().await.unwrap_or_default();

        // Empty bodies yield no payload; a JSON parse failure degrades to
        // no payload rather than aborting the caller. Non-JSON bodies
        // surface verbatim as a string.
        let payload: Option<Value> = if status == reqwest::StatusCode::NO_CONTENT || text.is_empty()
        {
            None
        } else if is_json {
            serde_json::from_str(&text).ok()
        } else {
            Some(Value::String(text))
        };

        if !status.is_success() {
            let message = error_message(payload.as_ref(), status.as_u16());
            tracing::warn!(
                path = request.path(),
                status = status.as_u16(),
                message = %message,
                "backend returned an error status"
            );
            return Err(ApiError::protocol(message, status.as_u16(), payload));
        }

        Ok(payload)
    }
}
