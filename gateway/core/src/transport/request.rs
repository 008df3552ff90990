//! Request Description
//!
//! An [`ApiRequest`] is immutable once issued: gateways build one through
//! the constructors below and hand it to the transport, which never
//! modifies it.

use serde_json::Value;

/// HTTP method for a gateway operation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HttpMethod {
    /// Read operation
    Get,
    /// Write operation
    Post,
}

impl HttpMethod {
    /// Wire name of the method
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

/// A request to the backend
#[derive(Clone, Debug)]
pub struct ApiRequest {
    method: HttpMethod,
    path: String,
    body: Option<Value>,
    headers: Vec<(String, String)>,
}

impl ApiRequest {
    /// Create a GET request for the given path
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            path: path.into(),
            body: None,
            headers: Vec::new(),
        }
    }

    /// Create a POST request for the given path
    pub fn post(path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Post,
            path: path.into(),
            body: None,
            headers: Vec::new(),
        }
    }

    /// Attach a JSON body
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Attach a header. Caller headers are merged over the transport's
    /// defaults and are never silently dropped.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// The HTTP method
    #[must_use]
    pub fn method(&self) -> HttpMethod {
        self.method
    }

    /// The request path (relative to the backend origin)
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The JSON body, if any
    #[must_use]
    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// Caller-supplied headers
    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_construction() {
        let request = ApiRequest::post("/users/login")
            .with_body(json!({"email": "a@b.com"}))
            .with_header("X-Trace", "abc");

        assert_eq!(request.method(), HttpMethod::Post);
        assert_eq!(request.path(), "/users/login");
        assert_eq!(request.body().unwrap()["email"], "a@b.com");
        assert_eq!(request.headers().len(), 1);
    }

    #[test]
    fn test_get_has_no_body() {
        let request = ApiRequest::get("/analytics/analytics/total-students");
        assert_eq!(request.method(), HttpMethod::Get);
        assert!(request.body().is_none());
    }
}
