//! Auth Gateway
//!
//! Registration, login, and password reset against `/users/*`. The
//! credential types carry their own client-side validation so rejected
//! input never reaches the transport.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::{decode, ApiEnvelope};
use crate::error::ApiError;
use crate::transport::{ApiRequest, Transport};

const REGISTER_PATH: &str = "/users/register";
const LOGIN_PATH: &str = "/users/login";
const RESET_PASSWORD_PATH: &str = "/users/reset-password";

/// Minimum accepted password length
pub const MIN_PASSWORD_LEN: usize = 6;

/// Input for `register`
#[derive(Clone, Debug, Serialize)]
pub struct RegisterCredentials {
    /// Display name
    pub name: String,
    /// Account email
    pub email: String,
    /// Plaintext password, transported once over the wire
    pub password: String,
}

impl RegisterCredentials {
    /// Validate before any request is issued
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.name.trim().is_empty() || self.email.trim().is_empty() || self.password.is_empty()
        {
            return Err(ApiError::validation("Please fill in all fields"));
        }
        if self.password.len() < MIN_PASSWORD_LEN {
            return Err(ApiError::validation(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        Ok(())
    }
}

/// Input for `login`
#[derive(Clone, Debug, Serialize)]
pub struct LoginCredentials {
    /// Account email
    pub email: String,
    /// Plaintext password
    pub password: String,
}

impl LoginCredentials {
    /// Validate before any request is issued
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.email.trim().is_empty() || self.password.is_empty() {
            return Err(ApiError::validation("Please fill in all fields"));
        }
        Ok(())
    }
}

/// Input for `reset_password`
#[derive(Clone, Debug, Serialize)]
pub struct ResetPasswordRequest {
    /// Account email
    pub email: String,
    /// Replacement password
    pub new_password: String,
}

impl ResetPasswordRequest {
    /// Validate before any request is issued
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.email.trim().is_empty() || self.new_password.is_empty() {
            return Err(ApiError::validation("Please fill in all fields"));
        }
        if self.new_password.len() < MIN_PASSWORD_LEN {
            return Err(ApiError::validation(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        Ok(())
    }
}

/// The user profile returned on successful login/register and persisted
/// alongside the credential token as `{token, ...profileFields}`.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct UserProfile {
    /// Display name
    pub name: Option<String>,
    /// Account email
    pub email: Option<String>,
    /// Credential token, when the backend issued one
    pub token: Option<String>,
    /// Any additional profile fields, preserved verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Gateway for the auth domain
#[derive(Clone)]
pub struct AuthGateway {
    transport: Arc<dyn Transport>,
}

impl AuthGateway {
    /// Create a gateway over the given transport
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Register a new account
    pub async fn register(
        &self,
        credentials: &RegisterCredentials,
    ) -> Result<ApiEnvelope<UserProfile>, ApiError> {
        let request = ApiRequest::post(REGISTER_PATH).with_body(json!({
            "name": credentials.name,
            "email": credentials.email,
            "password": credentials.password,
        }));
        let payload = self.transport.send(&request).await?;
        decode(REGISTER_PATH, payload)
    }

    /// Log into an existing account
    pub async fn login(
        &self,
        credentials: &LoginCredentials,
    ) -> Result<ApiEnvelope<UserProfile>, ApiError> {
        let request = ApiRequest::post(LOGIN_PATH).with_body(json!({
            "email": credentials.email,
            "password": credentials.password,
        }));
        let payload = self.transport.send(&request).await?;
        decode(LOGIN_PATH, payload)
    }

    /// Replace an account's password
    pub async fn reset_password(
        &self,
        request: &ResetPasswordRequest,
    ) -> Result<ApiEnvelope<Value>, ApiError> {
        let api_request = ApiRequest::post(RESET_PASSWORD_PATH).with_body(json!({
            "email": request.email,
            "new_password": request.new_password,
        }));
        let payload = self.transport.send(&api_request).await?;
        decode(RESET_PASSWORD_PATH, payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_requires_both_fields() {
        let creds = LoginCredentials {
            email: "a@b.com".to_string(),
            password: String::new(),
        };
        assert!(creds.validate().is_err());

        let creds = LoginCredentials {
            email: "a@b.com".to_string(),
            password: "secret".to_string(),
        };
        assert!(creds.validate().is_ok());
    }

    #[test]
    fn test_register_enforces_password_floor() {
        let creds = RegisterCredentials {
            name: "Ada".to_string(),
            email: "ada@campus.edu".to_string(),
            password: "short".to_string(),
        };
        let err = creds.validate().unwrap_err();
        assert!(err.is_validation());
        assert!(err.message().contains("at least 6"));
    }

    #[test]
    fn test_reset_enforces_password_floor() {
        let request = ResetPasswordRequest {
            email: "ada@campus.edu".to_string(),
            new_password: "12345".to_string(),
        };
        assert!(request.validate().is_err());

        let request = ResetPasswordRequest {
            email: "ada@campus.edu".to_string(),
            new_password: "123456".to_string(),
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_profile_preserves_extra_fields() {
        let profile: UserProfile = serde_json::from_value(serde_json::json!({
            "name": "Ada",
            "email": "ada@campus.edu",
            "token": "T",
            "role": "admin",
        }))
        .unwrap();
        assert_eq!(profile.token.as_deref(), Some("T"));
        assert_eq!(profile.extra["role"], "admin");

        let round_trip = serde_json::to_value(&profile).unwrap();
        assert_eq!(round_trip["role"], "admin");
    }
}
