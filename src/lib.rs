//! SendGrid Teammates Provider
//!
//! Manages SendGrid teammates (account collaborators) as declarative
//! resources. A host hands each resource's state to a reconciler, which
//! invites, refreshes or removes the teammate through the SendGrid v3 API.
//!
//! # Features
//!
//! - **Classified failures**: every API failure carries an HTTP-like status
//!   code (406 for missing input, 500 for transport and decode failures, the
//!   remote status otherwise)
//! - **Rate-limit retries**: only HTTP 429 is retried, honouring
//!   `Retry-After`, with exponential backoff bounded by a deadline and
//!   cancellation
//! - **Idempotent delete**: removing a teammate that is already gone succeeds
//! - **Per-call subuser**: `on-behalf-of` is passed with each operation, never
//!   stored on the client
//! - **Observability**: `tracing` spans and credential redaction in logged bodies
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use sendgrid_provider::{Resource, ResourceData, SendGridClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = SendGridClient::from_env()?;
//!     let teammates = client.teammate_resource();
//!     let ctx = client.operation_context();
//!
//!     let mut state = ResourceData::new()
//!         .attribute("email", "teammate@example.com")
//!         .attribute("is_admin", true);
//!
//!     teammates.create(&ctx, &mut state).await?;
//!     teammates.read(&ctx, &mut state).await?;
//!     teammates.delete(&ctx, &mut state).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Direct API access
//!
//! ```rust,no_run
//! use sendgrid_provider::SendGridClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = SendGridClient::from_api_key("SG.your_api_key")?;
//!
//!     match client.teammates().read("teammate@example.com", None).await {
//!         Ok(found) if found.is_empty() => println!("no such teammate"),
//!         Ok(found) => println!("admin: {}", found[0].is_admin),
//!         Err(err) => eprintln!("status {}: {err}", err.status_code()),
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod auth;
pub mod client;
pub mod config;
pub mod errors;
pub mod observability;
pub mod resilience;
pub mod resources;
pub mod services;
pub mod transport;
pub mod types;

// Re-exports for convenience
pub use client::{SendGridClient, SendGridClientBuilder, Session};
pub use config::SendGridConfig;
pub use errors::{Operation, RequestError, RequestResult, SendGridError, SendGridResult};
pub use resilience::{
    retry_on_rate_limit, OperationContext, RateLimitRetry, RetryClassify, RetryConfig, RetryError,
};
pub use resources::{Resource, ResourceData, TeammateConfig, TeammateResource};
pub use services::TeammatesService;
pub use types::teammates::Teammate;

/// Mock implementations for testing.
pub mod mocks;
