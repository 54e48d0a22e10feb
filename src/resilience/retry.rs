//! Retry-on-rate-limit policy.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::instrument;

use super::context::{Interrupted, OperationContext};
use crate::errors::{RequestError, SendGridError};

/// Status code the remote uses to signal rate limiting.
pub const TOO_MANY_REQUESTS: u16 = 429;

/// Capability of a failure to describe itself to the retry policy.
pub trait RetryClassify {
    /// Status code classifying the failure.
    fn status_code(&self) -> u16;

    /// Server-provided wait hint.
    fn retry_after(&self) -> Option<Duration> {
        None
    }

    /// Whether the failure is a rate-limit signal worth waiting out.
    fn is_rate_limited(&self) -> bool {
        self.status_code() == TOO_MANY_REQUESTS
    }
}

impl RetryClassify for RequestError {
    fn status_code(&self) -> u16 {
        RequestError::status_code(self)
    }

    fn retry_after(&self) -> Option<Duration> {
        RequestError::retry_after(self)
    }
}

/// Retry configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of invocations, the first one included.
    pub max_attempts: u32,
    /// Initial delay between retries.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Delay multiplier for exponential backoff.
    pub multiplier: f64,
    /// Whether to add jitter.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Creates a new retry configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of invocations.
    #[must_use]
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Sets the initial delay.
    #[must_use]
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum delay.
    #[must_use]
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the multiplier.
    #[must_use]
    pub fn multiplier(mut self, mult: f64) -> Self {
        self.multiplier = mult;
        self
    }

    /// Sets whether to use jitter.
    #[must_use]
    pub fn jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Calculates the wait before the retry following failed attempt `attempt` (0-based).
    ///
    /// A server hint replaces the exponential backoff. Either way the result
    /// never exceeds `max_delay`.
    pub fn delay_for(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        if let Some(hint) = retry_after {
            return hint.min(self.max_delay);
        }

        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let base = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);

        // 0-25% upward variation
        let secs = if self.jitter {
            base * (1.0 + rand::random::<f64>() * 0.25)
        } else {
            base
        };

        if !secs.is_finite() {
            return self.max_delay;
        }
        Duration::try_from_secs_f64(secs.max(0.0))
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}

/// Terminal outcome of a retried operation that did not succeed.
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// The operation failed with a classification that is not retried.
    #[error("{0}")]
    Failed(E),

    /// The context had already finished, so the operation was never invoked.
    #[error("operation {reason} before the first attempt")]
    Interrupted {
        /// Whether the deadline or a cancellation ended the context.
        reason: Interrupted,
    },

    /// The deadline passed or the context was cancelled while rate limited.
    #[error("timed out waiting for rate limit to clear after {attempts} attempts ({elapsed:?}): {last}")]
    DeadlineExceeded {
        /// Number of invocations made.
        attempts: u32,
        /// Time spent in the wrapper.
        elapsed: Duration,
        /// Whether cancellation, rather than the deadline, ended the wait.
        cancelled: bool,
        /// The last rate-limit rejection.
        last: E,
    },

    /// The attempt cap was reached while still rate limited.
    #[error("rate limit still in effect after {attempts} attempts: {last}")]
    AttemptsExhausted {
        /// Number of invocations made.
        attempts: u32,
        /// The last rate-limit rejection.
        last: E,
    },
}

impl<E> RetryError<E> {
    /// Returns the last failure observed, or `None` if nothing was invoked.
    pub fn last(&self) -> Option<&E> {
        match self {
            RetryError::Failed(last)
            | RetryError::DeadlineExceeded { last, .. }
            | RetryError::AttemptsExhausted { last, .. } => Some(last),
            RetryError::Interrupted { .. } => None,
        }
    }

    /// Consumes the error and returns the last failure observed.
    pub fn into_last(self) -> Option<E> {
        match self {
            RetryError::Failed(last)
            | RetryError::DeadlineExceeded { last, .. }
            | RetryError::AttemptsExhausted { last, .. } => Some(last),
            RetryError::Interrupted { .. } => None,
        }
    }

    /// Returns true if the wrapper gave up because the context finished.
    pub fn is_deadline_exceeded(&self) -> bool {
        matches!(
            self,
            RetryError::DeadlineExceeded { .. } | RetryError::Interrupted { .. }
        )
    }
}

impl From<RetryError<RequestError>> for SendGridError {
    fn from(err: RetryError<RequestError>) -> Self {
        match err {
            RetryError::Failed(last) => last.into_kind(),
            RetryError::Interrupted { reason } => SendGridError::Interrupted { reason },
            RetryError::DeadlineExceeded { attempts, last, .. } => SendGridError::RateLimitTimeout {
                attempts,
                last: Box::new(last),
            },
            RetryError::AttemptsExhausted { attempts, last } => SendGridError::RateLimitExhausted {
                attempts,
                last: Box::new(last),
            },
        }
    }
}

/// Retries an operation while the remote answers with rate-limit rejections.
///
/// Any other outcome, including transport failures, is returned after the
/// first invocation.
#[derive(Debug, Clone, Default)]
pub struct RateLimitRetry {
    config: RetryConfig,
}

impl RateLimitRetry {
    /// Creates a retry policy.
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Executes an operation, waiting out rate limits.
    #[instrument(skip(self, ctx, operation), fields(max_attempts = self.config.max_attempts))]
    pub async fn execute<F, Fut, T, E>(
        &self,
        ctx: &OperationContext,
        mut operation: F,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: RetryClassify + std::fmt::Display,
    {
        let started = Instant::now();
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt: u32 = 0;

        if let Some(reason) = ctx.interrupted() {
            tracing::debug!(%reason, "Context finished before the first attempt");
            return Err(RetryError::Interrupted { reason });
        }

        loop {
            attempt += 1;

            let err = match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_rate_limited() => return Err(RetryError::Failed(err)),
                Err(err) => err,
            };

            if attempt >= max_attempts {
                tracing::warn!(attempts = attempt, error = %err, "Rate limit retries exhausted");
                return Err(RetryError::AttemptsExhausted {
                    attempts: attempt,
                    last: err,
                });
            }

            let delay = self.config.delay_for(attempt - 1, err.retry_after());

            tracing::info!(
                attempt,
                max_attempts,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                status = err.status_code(),
                "Rate limited, retrying"
            );

            // the context may also finish right as the wait completes
            let waited = ctx.sleep(delay).await;
            if let Some(reason) = waited.err().or_else(|| ctx.interrupted()) {
                tracing::warn!(attempts = attempt, ?reason, "Gave up waiting for rate limit");
                return Err(RetryError::DeadlineExceeded {
                    attempts: attempt,
                    elapsed: started.elapsed(),
                    cancelled: reason == Interrupted::Cancelled,
                    last: err,
                });
            }
        }
    }
}

/// Runs `operation` under a [`RateLimitRetry`] built from `config`.
pub async fn retry_on_rate_limit<F, Fut, T, E>(
    ctx: &OperationContext,
    config: &RetryConfig,
    operation: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: RetryClassify + std::fmt::Display,
{
    RateLimitRetry::new(config.clone())
        .execute(ctx, operation)
        .await
}
