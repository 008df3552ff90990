//! Domain Gateways
//!
//! Thin, typed façades over the transport for the three backend domains:
//! auth, chat, and analytics. A gateway is a pure mapping from a typed
//! operation to a `(path, method, body)` triple and from the transport's
//! payload back to a typed response. No gateway caches, retries, or
//! performs side effects; those are layered strictly on top.

mod analytics;
mod auth;
mod chat;

pub use analytics::{
    ActiveStudentsResponse, AnalyticsGateway, DepartmentCount, RecentStudentsResponse, Student,
    StudentsByDepartmentResponse, TotalStudentsResponse,
};
pub use auth::{
    AuthGateway, LoginCredentials, RegisterCredentials, ResetPasswordRequest, UserProfile,
    MIN_PASSWORD_LEN,
};
pub use chat::{ChatGateway, ChatResponse, HistoryMessage};

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::error::ApiError;

/// Generic response envelope for auth operations.
///
/// The backend signals application-level outcomes through the `status`
/// sentinel even when the HTTP status is 2xx.
#[derive(Clone, Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    /// Domain sentinel: `"success"` or `"error"`
    pub status: Option<String>,
    /// Human-readable outcome message
    pub message: Option<String>,
    /// Operation payload, when present
    pub data: Option<T>,
}

impl<T> ApiEnvelope<T> {
    /// Whether the domain sentinel signals success
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.as_deref() == Some("success")
    }

    /// The envelope's message, or the fallback when absent or blank
    #[must_use]
    pub fn message_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.message
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(fallback)
    }
}

/// Decode a transport payload into a typed response.
///
/// A shape mismatch is a parse failure and follows the transport error
/// path, like any other undecodable body.
fn decode<T: DeserializeOwned>(path: &str, payload: Option<Value>) -> Result<T, ApiError> {
    let value = payload.ok_or_else(|| ApiError::transport(format!("Empty response from {path}")))?;
    serde_json::from_value(value).map_err(|e| {
        tracing::error!(path, error = %e, "failed to decode response");
        ApiError::transport(format!("Failed to decode response from {path}: {e}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_success_sentinel() {
        let envelope: ApiEnvelope<Value> =
            serde_json::from_value(json!({"status": "success", "message": "ok"})).unwrap();
        assert!(envelope.is_success());

        let envelope: ApiEnvelope<Value> =
            serde_json::from_value(json!({"status": "error"})).unwrap();
        assert!(!envelope.is_success());

        let envelope: ApiEnvelope<Value> = serde_json::from_value(json!({})).unwrap();
        assert!(!envelope.is_success());
    }

    #[test]
    fn test_envelope_message_fallback() {
        let envelope: ApiEnvelope<Value> =
            serde_json::from_value(json!({"message": "  "})).unwrap();
        assert_eq!(envelope.message_or("fallback"), "fallback");
    }

    #[test]
    fn test_decode_empty_payload_is_error() {
        let result: Result<Value, ApiError> = decode("/users/login", None);
        assert!(result.is_err());
    }
}
