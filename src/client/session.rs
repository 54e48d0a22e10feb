//! Authenticated request session shared by the services.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::auth::AuthProvider;
use crate::observability::{log_request, log_response};
use crate::transport::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, TransportError};

/// Header selecting the subuser an operation acts for.
pub const ON_BEHALF_OF: &str = "on-behalf-of";

/// Sends authenticated JSON requests to the SendGrid API.
///
/// The session holds no per-operation state: the subuser an operation acts
/// for is passed on every call.
pub struct Session {
    transport: Arc<dyn HttpTransport>,
    auth: Arc<dyn AuthProvider>,
    timeout: Option<Duration>,
}

impl Session {
    /// Creates a session over a transport.
    pub fn new(transport: Arc<dyn HttpTransport>, auth: Arc<dyn AuthProvider>) -> Self {
        Self {
            transport,
            auth,
            timeout: None,
        }
    }

    /// Sets a per-request timeout override.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sends one request and returns the raw response, whatever its status.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] when no response was received.
    pub async fn send(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Vec<u8>>,
        on_behalf_of: Option<&str>,
    ) -> Result<HttpResponse, TransportError> {
        let request = self.build_request(method, path, body, on_behalf_of);

        log_request(
            &method.to_string(),
            path,
            request
                .body
                .as_deref()
                .map(String::from_utf8_lossy)
                .as_deref(),
        );

        let started = Instant::now();
        let response = self.transport.send(request).await?;

        log_response(
            response.status,
            u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            &response.text(),
        );

        Ok(response)
    }

    fn build_request(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Vec<u8>>,
        on_behalf_of: Option<&str>,
    ) -> HttpRequest {
        let mut request = HttpRequest::new(method, path)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json");
        self.auth.apply_auth(&mut request.headers);

        if let Some(subuser) = on_behalf_of.filter(|s| !s.is_empty()) {
            request = request.header(ON_BEHALF_OF, subuser);
        }

        request.body = body;
        request.timeout = self.timeout;
        request
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
