//! Request authentication.
//!
//! SendGrid authenticates every v3 call with an API key sent as a bearer
//! token. Obtaining and rotating keys is left to the host.

use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;

/// Header carrying the credential.
pub const AUTHORIZATION: &str = "Authorization";

/// Attaches credentials to outgoing requests.
pub trait AuthProvider: Send + Sync {
    /// Adds the credential headers.
    fn apply_auth(&self, headers: &mut HashMap<String, String>);
}

/// Returns true if `key` has the `SG.<id>.<secret>` shape SendGrid issues.
pub fn is_sendgrid_key(key: &str) -> bool {
    key.strip_prefix("SG.")
        .and_then(|rest| rest.split_once('.'))
        .is_some_and(|(id, secret)| !id.is_empty() && !secret.is_empty() && !secret.contains('.'))
}

/// SendGrid API key authentication.
#[derive(Clone)]
pub struct ApiKeyAuth {
    api_key: SecretString,
}

impl ApiKeyAuth {
    /// Wraps an API key.
    pub fn new(api_key: SecretString) -> Self {
        Self { api_key }
    }
}

impl From<String> for ApiKeyAuth {
    fn from(api_key: String) -> Self {
        Self::new(SecretString::new(api_key))
    }
}

impl AuthProvider for ApiKeyAuth {
    fn apply_auth(&self, headers: &mut HashMap<String, String>) {
        let value = format!("Bearer {}", self.api_key.expose_secret());
        headers.insert(AUTHORIZATION.to_string(), value);
    }
}

impl std::fmt::Debug for ApiKeyAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKeyAuth([REDACTED])")
    }
}
