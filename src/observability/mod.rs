//! Observability for the SendGrid provider.
//!
//! Structured logging through `tracing`, with helpers that keep credentials
//! out of logged request and response bodies.

mod logging;

pub use logging::{loggable_body, redact, LogFormat, LogLevel, LoggingConfig};

/// Default number of body characters written to the logs.
pub const DEFAULT_MAX_LOGGED_BODY: usize = 1024;

/// Logs an outgoing request.
pub fn log_request(method: &str, path: &str, body: Option<&str>) {
    tracing::debug!(
        method,
        path,
        body = %body
            .map(|b| loggable_body(b, DEFAULT_MAX_LOGGED_BODY))
            .unwrap_or_else(|| "<empty>".to_string()),
        "Outgoing request"
    );
}

/// Logs an incoming response.
pub fn log_response(status: u16, duration_ms: u64, body: &str) {
    tracing::debug!(
        status,
        duration_ms,
        body = %loggable_body(body, DEFAULT_MAX_LOGGED_BODY),
        "Incoming response"
    );
}
