//! Error Taxonomy
//!
//! Every failure source in the client is normalized into a single
//! [`ApiError`] before it reaches UI-facing code:
//!
//! - `Transport`: network/connectivity failure, or a response body that
//!   could not be decoded into the expected shape
//! - `Protocol`: a non-2xx HTTP status, message extracted from the payload
//! - `Domain`: an HTTP-2xx response carrying an application-level failure
//!   sentinel (`status != "success"`)
//! - `Validation`: client-side input rejected before any request is issued
//!
//! Invariant: the message is never empty. Constructors substitute a
//! fallback string when extraction yields nothing usable.

use serde_json::Value;
use thiserror::Error;

/// Normalized error for all client failures
#[derive(Clone, Debug, Error)]
pub enum ApiError {
    /// Network or connectivity failure (includes decode failures)
    #[error("{message}")]
    Transport {
        /// Human-readable description
        message: String,
    },

    /// Non-success HTTP status from the backend
    #[error("{message}")]
    Protocol {
        /// Message extracted from the error payload
        message: String,
        /// HTTP status code
        status: u16,
        /// Raw payload, kept for diagnostics
        payload: Option<Value>,
    },

    /// Application-level failure inside an otherwise-successful response
    #[error("{message}")]
    Domain {
        /// The payload's message, or a caller-supplied fallback
        message: String,
    },

    /// Input rejected client-side, no request was issued
    #[error("{message}")]
    Validation {
        /// What was wrong with the input
        message: String,
    },
}

impl ApiError {
    /// Create a transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: non_empty(message.into(), "Request failed"),
        }
    }

    /// Create a protocol error for a failed HTTP status
    pub fn protocol(message: impl Into<String>, status: u16, payload: Option<Value>) -> Self {
        let fallback = format!("HTTP error! status: {status}");
        Self::Protocol {
            message: non_empty(message.into(), &fallback),
            status,
            payload,
        }
    }

    /// Create a domain error from a failure sentinel
    pub fn domain(message: impl Into<String>) -> Self {
        Self::Domain {
            message: non_empty(message.into(), "Request was rejected"),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: non_empty(message.into(), "Invalid input"),
        }
    }

    /// The normalized message (never empty)
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Transport { message }
            | Self::Protocol { message, .. }
            | Self::Domain { message }
            | Self::Validation { message } => message,
        }
    }

    /// HTTP status code, if the backend responded at all
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Protocol { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Raw error payload, if one was captured
    #[must_use]
    pub fn payload(&self) -> Option<&Value> {
        match self {
            Self::Protocol { payload, .. } => payload.as_ref(),
            _ => None,
        }
    }

    /// Text to surface to the user: the error's own message, or the
    /// caller's fallback when the message carries no information.
    #[must_use]
    pub fn user_message(&self, fallback: &str) -> String {
        let message = self.message();
        if message.trim().is_empty() {
            fallback.to_string()
        } else {
            message.to_string()
        }
    }

    /// Whether this error was produced before any request was issued
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

fn non_empty(message: String, fallback: &str) -> String {
    if message.trim().is_empty() {
        fallback.to_string()
    } else {
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_never_empty() {
        let err = ApiError::transport("");
        assert!(!err.message().is_empty());

        let err = ApiError::protocol("", 503, None);
        assert_eq!(err.message(), "HTTP error! status: 503");

        let err = ApiError::domain("   ");
        assert!(!err.message().trim().is_empty());
    }

    #[test]
    fn test_status_only_on_protocol() {
        let err = ApiError::protocol("boom", 404, None);
        assert_eq!(err.status(), Some(404));

        let err = ApiError::transport("connection refused");
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_user_message_prefers_own_message() {
        let err = ApiError::domain("Invalid credentials");
        assert_eq!(err.user_message("Login failed"), "Invalid credentials");
    }

    #[test]
    fn test_validation_detected() {
        assert!(ApiError::validation("too short").is_validation());
        assert!(!ApiError::transport("down").is_validation());
    }
}
