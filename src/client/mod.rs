//! SendGrid API client.
//!
//! Wires configuration, transport and authentication into the teammates
//! service and the host-facing teammate resource.

mod session;

pub use session::{Session, ON_BEHALF_OF};

use std::sync::Arc;
use std::time::Duration;

use crate::auth::{ApiKeyAuth, AuthProvider};
use crate::config::{SendGridConfig, SendGridConfigBuilder};
use crate::errors::{SendGridError, SendGridResult};
use crate::resilience::{OperationContext, RateLimitRetry, RetryConfig};
use crate::resources::TeammateResource;
use crate::services::TeammatesService;
use crate::transport::{HttpTransport, HttpTransportImpl};

/// The main SendGrid client.
///
/// # Example
///
/// ```rust,no_run
/// use sendgrid_provider::{Resource, ResourceData, SendGridClient};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = SendGridClient::builder()
///         .api_key("SG.your_api_key")
///         .build()?;
///
///     let mut teammate = ResourceData::new()
///         .attribute("email", "teammate@example.com")
///         .attribute("is_admin", false);
///
///     let ctx = client.operation_context();
///     client.teammate_resource().create(&ctx, &mut teammate).await?;
///     println!("created {}", teammate.id());
///     Ok(())
/// }
/// ```
pub struct SendGridClient {
    config: SendGridConfig,
    session: Arc<Session>,
    teammates: TeammatesService,
}

impl SendGridClient {
    /// Creates a new client builder.
    pub fn builder() -> SendGridClientBuilder {
        SendGridClientBuilder::new()
    }

    /// Creates a client from environment variables.
    ///
    /// Reads `SENDGRID_API_KEY` and optionally `SENDGRID_BASE_URL`,
    /// `SENDGRID_TIMEOUT`, `SENDGRID_MAX_RETRIES` and
    /// `SENDGRID_RATE_LIMIT_TIMEOUT`.
    pub fn from_env() -> SendGridResult<Self> {
        let config = SendGridConfig::from_env()?;
        SendGridClientBuilder::from_config(config).build()
    }

    /// Creates a client from an API key.
    pub fn from_api_key(api_key: impl Into<String>) -> SendGridResult<Self> {
        SendGridClientBuilder::new().api_key(api_key).build()
    }

    /// Returns the teammates service.
    pub fn teammates(&self) -> &TeammatesService {
        &self.teammates
    }

    /// Returns a reconciler for teammate resources.
    pub fn teammate_resource(&self) -> TeammateResource {
        TeammateResource::new(self.teammates.clone(), self.config.retry.clone())
    }

    /// Returns the authenticated session.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Returns the rate-limit retry policy.
    pub fn retry_policy(&self) -> RateLimitRetry {
        RateLimitRetry::new(self.config.retry.clone())
    }

    /// Returns a context expiring after the configured rate-limit timeout.
    pub fn operation_context(&self) -> OperationContext {
        OperationContext::with_timeout(self.config.rate_limit_timeout)
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SendGridConfig {
        &self.config
    }
}

impl std::fmt::Debug for SendGridClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SendGridClient")
            .field("config", &self.config)
            .finish()
    }
}

/// Builder for the SendGrid client.
pub struct SendGridClientBuilder {
    config_builder: SendGridConfigBuilder,
    transport: Option<Arc<dyn HttpTransport>>,
    auth: Option<Arc<dyn AuthProvider>>,
}

impl SendGridClientBuilder {
    /// Creates a new client builder.
    pub fn new() -> Self {
        Self {
            config_builder: SendGridConfigBuilder::new(),
            transport: None,
            auth: None,
        }
    }

    /// Creates a builder from an existing configuration.
    pub fn from_config(config: SendGridConfig) -> Self {
        Self {
            config_builder: SendGridConfigBuilder::new()
                .api_key(config.api_key())
                .base_url(config.base_url)
                .timeout(config.timeout)
                .retry(config.retry)
                .rate_limit_timeout(config.rate_limit_timeout),
            transport: None,
            auth: None,
        }
    }

    /// Sets the API key.
    #[must_use]
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.api_key(api_key);
        self
    }

    /// Sets the base URL.
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.base_url(base_url);
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config_builder = self.config_builder.timeout(timeout);
        self
    }

    /// Sets the rate-limit retry policy.
    #[must_use]
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.config_builder = self.config_builder.retry(retry);
        self
    }

    /// Sets the maximum attempts while rate limited.
    #[must_use]
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config_builder = self.config_builder.max_attempts(attempts);
        self
    }

    /// Sets how long resource operations may wait out rate limits.
    #[must_use]
    pub fn rate_limit_timeout(mut self, timeout: Duration) -> Self {
        self.config_builder = self.config_builder.rate_limit_timeout(timeout);
        self
    }

    /// Sets a custom transport.
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Sets a custom auth provider.
    #[must_use]
    pub fn auth(mut self, auth: Arc<dyn AuthProvider>) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Builds the client.
    pub fn build(self) -> SendGridResult<SendGridClient> {
        let config = self.config_builder.build()?;

        let transport: Arc<dyn HttpTransport> = match self.transport {
            Some(t) => t,
            None => Arc::new(
                HttpTransportImpl::new(&config.base_url, config.timeout)
                    .map_err(|e| SendGridError::configuration(e.to_string()))?,
            ),
        };

        let auth: Arc<dyn AuthProvider> = match self.auth {
            Some(a) => a,
            None => Arc::new(ApiKeyAuth::new(config.api_key.clone())),
        };

        let session = Arc::new(Session::new(transport, auth).with_timeout(config.timeout));
        let teammates = TeammatesService::new(Arc::clone(&session));

        tracing::debug!(
            base_url = %config.base_url,
            api_key = %config.api_key_hint(),
            "SendGrid client initialized"
        );

        Ok(SendGridClient {
            config,
            session,
            teammates,
        })
    }
}

impl Default for SendGridClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
