//! Teammate resource reconciler.

use async_trait::async_trait;
use tracing::instrument;

use super::{Resource, ResourceData};
use crate::errors::{SendGridError, SendGridResult};
use crate::resilience::{OperationContext, RateLimitRetry, RetryConfig};
use crate::services::TeammatesService;

const EMAIL: &str = "email";
const IS_ADMIN: &str = "is_admin";
const SCOPES: &str = "scopes";
const ON_BEHALF_OF: &str = "on_behalf_of";
const DISABLED: &str = "disabled";

/// Desired state of a teammate, read from host attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeammateConfig {
    /// Email address; becomes the resource id.
    pub email: String,
    /// Whether the teammate is an admin.
    pub is_admin: bool,
    /// Permission scopes.
    pub scopes: Vec<String>,
    /// Subuser to create the teammate for.
    pub on_behalf_of: Option<String>,
}

impl TeammateConfig {
    /// Reads the teammate attributes. A missing email reads as empty and is
    /// rejected when the teammate is created.
    pub fn from_resource_data(data: &ResourceData) -> SendGridResult<Self> {
        Ok(Self {
            email: data.get(EMAIL)?.unwrap_or_default(),
            is_admin: data.get(IS_ADMIN)?.unwrap_or_default(),
            scopes: data.get(SCOPES)?.unwrap_or_default(),
            on_behalf_of: data
                .get::<String>(ON_BEHALF_OF)?
                .filter(|s| !s.is_empty()),
        })
    }

    /// Writes the attributes the remote reports back onto the state.
    pub fn apply_to(&self, data: &mut ResourceData) -> SendGridResult<()> {
        data.set(EMAIL, &self.email)?;
        data.set(IS_ADMIN, self.is_admin)
    }
}

/// Reconciles host teammate state against the SendGrid API.
///
/// Create and delete wait out rate limiting within the caller's
/// [`OperationContext`].
#[derive(Debug, Clone)]
pub struct TeammateResource {
    service: TeammatesService,
    retry: RateLimitRetry,
}

impl TeammateResource {
    /// Creates a reconciler.
    pub fn new(service: TeammatesService, retry: RetryConfig) -> Self {
        Self {
            service,
            retry: RateLimitRetry::new(retry),
        }
    }
}

#[async_trait]
impl Resource for TeammateResource {
    #[instrument(skip_all)]
    async fn create(&self, ctx: &OperationContext, data: &mut ResourceData) -> SendGridResult<()> {
        let config = TeammateConfig::from_resource_data(data)?;
        let (service, desired) = (&self.service, &config);

        self.retry
            .execute(ctx, move || {
                service.create(
                    &desired.email,
                    desired.is_admin,
                    &desired.scopes,
                    desired.on_behalf_of.as_deref(),
                )
            })
            .await?;

        tracing::info!(email = %config.email, "Teammate created");
        data.set_id(config.email);
        Ok(())
    }

    #[instrument(skip_all, fields(id = %data.id()))]
    async fn read(&self, ctx: &OperationContext, data: &mut ResourceData) -> SendGridResult<()> {
        let service = &self.service;
        let id = data.id().to_string();
        let identifier = id.as_str();

        let teammates = self
            .retry
            .execute(ctx, move || service.read(identifier, None))
            .await?;

        let Some(teammate) = teammates.into_iter().next() else {
            return Err(SendGridError::TeammateNotFound { email: id });
        };

        TeammateConfig {
            email: teammate.email,
            is_admin: teammate.is_admin,
            ..TeammateConfig::default()
        }
        .apply_to(data)
    }

    #[instrument(skip_all, fields(id = %data.id()))]
    async fn update(&self, _ctx: &OperationContext, data: &mut ResourceData) -> SendGridResult<()> {
        if let Some(disabled) = data.get::<bool>(DISABLED)? {
            self.service.update(data.id(), disabled).await?;
        }
        Ok(())
    }

    #[instrument(skip_all, fields(id = %data.id()))]
    async fn delete(&self, ctx: &OperationContext, data: &mut ResourceData) -> SendGridResult<()> {
        let service = &self.service;
        let identifier = data.id();

        self.retry
            .execute(ctx, move || service.delete(identifier, None))
            .await?;

        tracing::info!(id = %identifier, "Teammate deleted");
        data.clear_id();
        Ok(())
    }
}
