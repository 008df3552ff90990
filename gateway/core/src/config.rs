//! Client Configuration
//!
//! Connection settings for the campus backend. Defaults match the local
//! development deployment; `from_env` allows overrides without code changes.

use std::time::Duration;

/// Default backend origin
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5050";

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default retry attempts for cached reads
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;

/// Default delay between retry attempts
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(200);

/// Configuration for the gateway client
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Backend origin, e.g. `http://127.0.0.1:5050`
    pub base_url: String,
    /// Bound on every outbound request. A hung request must not pin a
    /// cache entry in `Fetching` forever.
    pub timeout: Duration,
    /// Retry attempts for cached reads
    pub retry_attempts: u32,
    /// Delay between retry attempts
    pub retry_delay: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl ClientConfig {
    /// Create a configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the backend origin
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the request timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the retry attempt bound
    #[must_use]
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts;
        self
    }

    /// Set the delay between retry attempts
    #[must_use]
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Create from environment variables
    ///
    /// Reads `CAMPUS_API_URL` and `CAMPUS_API_TIMEOUT_SECS`, falling back
    /// to defaults for anything unset or unparseable.
    #[must_use]
    pub fn from_env() -> Self {
        let base_url =
            std::env::var("CAMPUS_API_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let timeout = std::env::var("CAMPUS_API_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map_or(DEFAULT_TIMEOUT, Duration::from_secs);

        Self::new().with_base_url(base_url).with_timeout(timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::new();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert_eq!(config.retry_attempts, 3);
    }

    #[test]
    fn test_builder_overrides() {
        let config = ClientConfig::new()
            .with_base_url("http://backend:9000")
            .with_timeout(Duration::from_secs(5))
            .with_retry_attempts(1)
            .with_retry_delay(Duration::ZERO);
        assert_eq!(config.base_url, "http://backend:9000");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.retry_attempts, 1);
        assert_eq!(config.retry_delay, Duration::ZERO);
    }
}
