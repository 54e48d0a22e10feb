//! Rate limit hints carried by API responses.

use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::transport::HttpResponse;

/// Standard wait hint header, in seconds or as an HTTP date.
pub const RETRY_AFTER: &str = "retry-after";

/// SendGrid's reset header, a unix timestamp in seconds.
pub const RATE_LIMIT_RESET: &str = "x-ratelimit-reset";

/// Rate limit headers reported by SendGrid on every response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateLimitInfo {
    /// Request limit for the endpoint.
    pub limit: Option<u32>,
    /// Remaining requests in the current window.
    pub remaining: Option<u32>,
    /// When the window resets.
    pub reset: Option<DateTime<Utc>>,
}

impl RateLimitInfo {
    /// Reads the rate limit headers of a response.
    pub fn from_response(response: &HttpResponse) -> Self {
        Self {
            limit: response
                .header("x-ratelimit-limit")
                .and_then(|v| v.trim().parse().ok()),
            remaining: response
                .header("x-ratelimit-remaining")
                .and_then(|v| v.trim().parse().ok()),
            reset: response
                .header(RATE_LIMIT_RESET)
                .and_then(|v| v.trim().parse::<i64>().ok())
                .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0)),
        }
    }
}

/// Derives how long to wait before retrying a rate-limited response.
///
/// `Retry-After` wins over `X-RateLimit-Reset`. Hints in the past yield zero.
pub fn retry_after(response: &HttpResponse, now: DateTime<Utc>) -> Option<Duration> {
    if let Some(value) = response.header(RETRY_AFTER) {
        let value = value.trim();
        if let Ok(secs) = value.parse::<u64>() {
            return Some(Duration::from_secs(secs));
        }
        if let Ok(at) = DateTime::parse_from_rfc2822(value) {
            return Some(until(at.with_timezone(&Utc), now));
        }
    }

    RateLimitInfo::from_response(response)
        .reset
        .map(|reset| until(reset, now))
}

fn until(at: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (at - now).to_std().unwrap_or(Duration::ZERO)
}
