//! Error types for the SendGrid provider.
//!
//! Every domain operation reports failures as a [`RequestError`]: the
//! underlying [`SendGridError`] together with the HTTP-like status code that
//! classifies it. The retry layer and the resource reconciler make their
//! policy decisions from that status code.

use http::StatusCode;
use std::time::Duration;
use thiserror::Error;

use crate::resilience::Interrupted;
use crate::transport::TransportError;

/// Result type alias for provider-level operations.
pub type SendGridResult<T> = Result<T, SendGridError>;

/// Result type alias for domain operations that carry a status classification.
pub type RequestResult<T> = Result<T, RequestError>;

/// Remote operation names used in error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Creating a teammate.
    CreateTeammate,
    /// Reading a teammate.
    ReadTeammate,
    /// Deleting a teammate.
    DeleteTeammate,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::CreateTeammate => write!(f, "failed creating teammate"),
            Operation::ReadTeammate => write!(f, "failed reading teammate"),
            Operation::DeleteTeammate => write!(f, "failed deleting teammate"),
        }
    }
}

/// Error taxonomy for the SendGrid provider.
#[derive(Debug, Clone, Error)]
pub enum SendGridError {
    /// Configuration error (invalid API key, base URL, etc.)
    #[error("Configuration error: {message}")]
    Configuration {
        /// Error message describing the configuration issue.
        message: String,
    },

    /// A required identity field was empty.
    #[error("{field} is required")]
    MissingField {
        /// Name of the missing field.
        field: &'static str,
    },

    /// The remote API could not be reached.
    #[error("{operation}: {source}")]
    Transport {
        /// The operation that was attempted.
        operation: Operation,
        /// The transport failure.
        #[source]
        source: TransportError,
    },

    /// The remote API rejected the operation.
    #[error("{operation}, status: {status}, response: {body}")]
    OperationFailed {
        /// The operation that was attempted.
        operation: Operation,
        /// HTTP status returned by the remote.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// A successful response body could not be decoded.
    #[error("failed decoding response: {message}, response: {body}")]
    Decode {
        /// Decoder error message.
        message: String,
        /// Raw response body.
        body: String,
    },

    /// A request body could not be encoded.
    #[error("failed encoding request: {message}")]
    Encode {
        /// Encoder error message.
        message: String,
    },

    /// The remote reports no teammate for the identifier.
    #[error("teammate {email} not found")]
    TeammateNotFound {
        /// Identifier that was looked up.
        email: String,
    },

    /// Rate limiting did not clear before the deadline or cancellation.
    #[error("timed out waiting for rate limit to clear after {attempts} attempts: {last}")]
    RateLimitTimeout {
        /// Number of invocations made.
        attempts: u32,
        /// The last rate-limit rejection observed.
        last: Box<RequestError>,
    },

    /// The operation context finished before the remote was contacted.
    #[error("operation {reason} before the first attempt")]
    Interrupted {
        /// Whether the deadline or a cancellation ended the context.
        reason: Interrupted,
    },

    /// Rate limiting persisted for the maximum number of attempts.
    #[error("rate limit still in effect after {attempts} attempts: {last}")]
    RateLimitExhausted {
        /// Number of invocations made.
        attempts: u32,
        /// The last rate-limit rejection observed.
        last: Box<RequestError>,
    },
}

impl SendGridError {
    /// Returns true for the not-found condition the host uses to schedule re-creation.
    pub fn is_not_found(&self) -> bool {
        matches!(self, SendGridError::TeammateNotFound { .. })
    }

    /// Returns true if the error came from giving up on a rate limit.
    pub fn is_rate_limit_timeout(&self) -> bool {
        matches!(
            self,
            SendGridError::RateLimitTimeout { .. } | SendGridError::RateLimitExhausted { .. }
        )
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        SendGridError::Configuration {
            message: message.into(),
        }
    }
}

/// A classified failure of a domain operation.
///
/// `status_code` is never zero and is always `>= 300`: successes are reported
/// as `Ok` and never produce a `RequestError`.
#[derive(Debug, Clone, Error)]
#[error("{kind}")]
pub struct RequestError {
    status_code: u16,
    #[source]
    kind: SendGridError,
    retry_after: Option<Duration>,
}

impl RequestError {
    /// Local precondition failure. No remote call was made.
    pub fn missing_field(field: &'static str) -> Self {
        Self {
            status_code: StatusCode::NOT_ACCEPTABLE.as_u16(),
            kind: SendGridError::MissingField { field },
            retry_after: None,
        }
    }

    /// The remote could not be reached.
    pub fn transport(operation: Operation, source: TransportError) -> Self {
        Self {
            status_code: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
            kind: SendGridError::Transport { operation, source },
            retry_after: None,
        }
    }

    /// The remote answered with a status of 300 or above.
    pub fn rejected(operation: Operation, status: u16, body: impl Into<String>) -> Self {
        debug_assert!(status >= 300, "rejection with a success status");
        Self {
            status_code: status,
            kind: SendGridError::OperationFailed {
                operation,
                status,
                body: body.into(),
            },
            retry_after: None,
        }
    }

    /// A successful response could not be decoded.
    pub fn decode(err: &serde_json::Error, body: impl Into<String>) -> Self {
        Self {
            status_code: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
            kind: SendGridError::Decode {
                message: err.to_string(),
                body: body.into(),
            },
            retry_after: None,
        }
    }

    /// The request body could not be encoded.
    pub fn encode(err: &serde_json::Error) -> Self {
        Self {
            status_code: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
            kind: SendGridError::Encode {
                message: err.to_string(),
            },
            retry_after: None,
        }
    }

    /// Attaches a server-provided wait hint.
    #[must_use]
    pub fn with_retry_after(mut self, retry_after: Option<Duration>) -> Self {
        self.retry_after = retry_after;
        self
    }

    /// Returns the status code classifying this failure.
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    /// Returns the underlying failure.
    pub fn kind(&self) -> &SendGridError {
        &self.kind
    }

    /// Consumes the error and returns the underlying failure.
    pub fn into_kind(self) -> SendGridError {
        self.kind
    }

    /// Returns the server-provided wait hint, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        self.retry_after
    }

    /// Returns true if the remote signalled rate limiting.
    pub fn is_rate_limited(&self) -> bool {
        self.status_code == StatusCode::TOO_MANY_REQUESTS.as_u16()
    }
}

impl From<RequestError> for SendGridError {
    fn from(err: RequestError) -> Self {
        err.kind
    }
}

impl From<url::ParseError> for SendGridError {
    fn from(err: url::ParseError) -> Self {
        SendGridError::Configuration {
            message: format!("Invalid URL: {err}"),
        }
    }
}
