//! Configuration module for the SendGrid provider.
//!
//! Holds the API key, base URL, HTTP timeout and the rate-limit retry
//! settings applied to every resource operation.

use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use url::Url;

use crate::auth::is_sendgrid_key;
use crate::errors::{SendGridError, SendGridResult};
use crate::resilience::RetryConfig;

/// Default base URL for the SendGrid v3 API.
pub const DEFAULT_BASE_URL: &str = "https://api.sendgrid.com/v3";

/// Default request timeout (60 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default time a resource operation may spend waiting out rate limits (20 minutes).
pub const DEFAULT_RATE_LIMIT_TIMEOUT: Duration = Duration::from_secs(20 * 60);

/// Configuration for the SendGrid provider.
#[derive(Clone)]
pub struct SendGridConfig {
    pub(crate) api_key: SecretString,
    /// Base URL for API requests.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Rate-limit retry policy.
    pub retry: RetryConfig,
    /// Deadline for a whole resource operation, retries included.
    pub rate_limit_timeout: Duration,
}

impl SendGridConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> SendGridConfigBuilder {
        SendGridConfigBuilder::new()
    }

    /// Creates a configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `SENDGRID_API_KEY` (required): API key for authentication
    /// - `SENDGRID_BASE_URL` (optional): Custom base URL
    /// - `SENDGRID_TIMEOUT` (optional): Request timeout in seconds
    /// - `SENDGRID_MAX_RETRIES` (optional): Maximum attempts while rate limited
    /// - `SENDGRID_RATE_LIMIT_TIMEOUT` (optional): Rate-limit deadline in seconds
    pub fn from_env() -> SendGridResult<Self> {
        let api_key = std::env::var("SENDGRID_API_KEY")
            .map_err(|_| SendGridError::configuration("SENDGRID_API_KEY environment variable not set"))?;

        let mut builder = SendGridConfigBuilder::new().api_key(api_key);

        if let Ok(base_url) = std::env::var("SENDGRID_BASE_URL") {
            builder = builder.base_url(base_url);
        }

        if let Some(secs) = env_number::<u64>("SENDGRID_TIMEOUT") {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        if let Some(attempts) = env_number::<u32>("SENDGRID_MAX_RETRIES") {
            builder = builder.max_attempts(attempts);
        }

        if let Some(secs) = env_number::<u64>("SENDGRID_RATE_LIMIT_TIMEOUT") {
            builder = builder.rate_limit_timeout(Duration::from_secs(secs));
        }

        builder.build()
    }

    pub(crate) fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }

    /// Returns the API key hint (last 4 characters) for debugging.
    pub fn api_key_hint(&self) -> String {
        let key = self.api_key.expose_secret();
        match key.char_indices().rev().nth(3) {
            Some((idx, _)) if key.len() > 4 => format!("...{}", &key[idx..]),
            _ => "****".to_string(),
        }
    }
}

fn env_number<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

impl std::fmt::Debug for SendGridConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SendGridConfig")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .field("rate_limit_timeout", &self.rate_limit_timeout)
            .finish()
    }
}

/// Builder for `SendGridConfig`.
#[derive(Default)]
pub struct SendGridConfigBuilder {
    api_key: Option<String>,
    base_url: Option<String>,
    timeout: Option<Duration>,
    retry: Option<RetryConfig>,
    max_attempts: Option<u32>,
    rate_limit_timeout: Option<Duration>,
}

impl SendGridConfigBuilder {
    /// Creates a new configuration builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key.
    #[must_use]
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Sets the base URL.
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Overrides the maximum number of attempts of the retry policy.
    #[must_use]
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    /// Sets how long a resource operation may wait out rate limits.
    #[must_use]
    pub fn rate_limit_timeout(mut self, timeout: Duration) -> Self {
        self.rate_limit_timeout = Some(timeout);
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> SendGridResult<SendGridConfig> {
        let api_key = self
            .api_key
            .ok_or_else(|| SendGridError::configuration("API key is required"))?;

        if api_key.is_empty() {
            return Err(SendGridError::configuration("API key cannot be empty"));
        }

        if !is_sendgrid_key(&api_key) {
            tracing::warn!("API key does not match expected SendGrid format (SG.<id>.<secret>)");
        }

        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        validate_base_url(&base_url)?;

        let mut retry = self.retry.unwrap_or_default();
        if let Some(attempts) = self.max_attempts {
            retry.max_attempts = attempts;
        }

        Ok(SendGridConfig {
            api_key: SecretString::new(api_key),
            base_url,
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
            retry,
            rate_limit_timeout: self
                .rate_limit_timeout
                .unwrap_or(DEFAULT_RATE_LIMIT_TIMEOUT),
        })
    }
}

/// Plain HTTP is only accepted for loopback hosts (local test servers).
fn validate_base_url(base_url: &str) -> SendGridResult<()> {
    let url = Url::parse(base_url)?;
    let loopback = matches!(url.host_str(), Some("localhost" | "127.0.0.1" | "[::1]"));

    match url.scheme() {
        "https" => Ok(()),
        "http" if loopback => Ok(()),
        _ => Err(SendGridError::configuration("Base URL must use HTTPS")),
    }
}
