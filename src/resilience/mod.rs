//! Resilience layer for the SendGrid provider.
//!
//! Wraps domain operations in a retry policy that waits out rate limiting
//! (HTTP 429) and passes every other outcome straight through. Waits honour
//! the server's hint when present and are cut short by the operation
//! context's deadline or cancellation.

mod context;
mod rate_limit;
mod retry;

pub use context::{Interrupted, OperationContext};
pub use rate_limit::{retry_after, RateLimitInfo, RATE_LIMIT_RESET, RETRY_AFTER};
pub use retry::{
    retry_on_rate_limit, RateLimitRetry, RetryClassify, RetryConfig, RetryError,
    TOO_MANY_REQUESTS,
};
