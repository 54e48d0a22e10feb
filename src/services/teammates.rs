//! Teammates service.

use chrono::Utc;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;

use crate::client::Session;
use crate::errors::{Operation, RequestError, RequestResult};
use crate::observability::{loggable_body, DEFAULT_MAX_LOGGED_BODY};
use crate::resilience::retry_after;
use crate::transport::{HttpMethod, HttpResponse};
use crate::types::teammates::{Teammate, TeammateLookup};

/// Teammates service: invite, look up and remove collaborators.
///
/// Every operation reports failures as a [`RequestError`] whose status code
/// classifies the failure for the retry wrapper.
#[derive(Debug, Clone)]
pub struct TeammatesService {
    session: Arc<Session>,
}

#[derive(Serialize)]
struct CreateTeammateBody<'a> {
    email: &'a str,
    is_admin: bool,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    scopes: &'a [String],
}

impl TeammatesService {
    /// Creates a new teammates service.
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    /// Invites a teammate.
    #[instrument(skip(self, scopes))]
    pub async fn create(
        &self,
        email: &str,
        is_admin: bool,
        scopes: &[String],
        on_behalf_of: Option<&str>,
    ) -> RequestResult<Teammate> {
        if email.is_empty() {
            return Err(RequestError::missing_field("email"));
        }

        let body = serde_json::to_vec(&CreateTeammateBody {
            email,
            is_admin,
            scopes,
        })
        .map_err(|e| RequestError::encode(&e))?;

        let response = self
            .session
            .send(HttpMethod::Post, "teammates", Some(body), on_behalf_of)
            .await
            .map_err(|e| RequestError::transport(Operation::CreateTeammate, e))?;

        if !response.is_success() {
            return Err(rejection(Operation::CreateTeammate, &response));
        }

        decode(&response)
    }

    /// Looks up a teammate by username or email.
    ///
    /// A teammate the remote does not know yields an empty list.
    #[instrument(skip(self))]
    pub async fn read(
        &self,
        identifier: &str,
        on_behalf_of: Option<&str>,
    ) -> RequestResult<Vec<Teammate>> {
        if identifier.is_empty() {
            return Err(RequestError::missing_field("username"));
        }

        let response = self
            .session
            .send(HttpMethod::Get, &teammate_path(identifier), None, on_behalf_of)
            .await
            .map_err(|e| RequestError::transport(Operation::ReadTeammate, e))?;

        if response.status == 404 {
            tracing::debug!("Teammate not found");
            return Ok(Vec::new());
        }

        if !response.is_success() {
            return Err(rejection(Operation::ReadTeammate, &response));
        }

        decode::<TeammateLookup>(&response).map(Vec::from)
    }

    /// Enables or disables a teammate.
    ///
    /// The API has no such switch for teammates, so this never calls the
    /// remote and always reports that nothing changed.
    pub async fn update(&self, identifier: &str, disabled: bool) -> RequestResult<bool> {
        tracing::debug!(identifier, disabled, "Teammate update is a no-op");
        Ok(false)
    }

    /// Removes a teammate. A teammate that is already gone counts as removed.
    #[instrument(skip(self))]
    pub async fn delete(&self, identifier: &str, on_behalf_of: Option<&str>) -> RequestResult<bool> {
        if identifier.is_empty() {
            return Err(RequestError::missing_field("username"));
        }

        let response = self
            .session
            .send(HttpMethod::Delete, &teammate_path(identifier), None, on_behalf_of)
            .await
            .map_err(|e| RequestError::transport(Operation::DeleteTeammate, e))?;

        if response.status == 404 {
            tracing::debug!("Teammate already absent");
            return Ok(true);
        }

        if !response.is_success() {
            return Err(rejection(Operation::DeleteTeammate, &response));
        }

        Ok(true)
    }
}

/// Characters left as-is in an identifier path segment: RFC 3986 unreserved plus `@`.
const IDENTIFIER_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'@');

/// Path of a single teammate; the identifier always stays one segment.
fn teammate_path(identifier: &str) -> String {
    format!(
        "teammates/{}",
        utf8_percent_encode(identifier, IDENTIFIER_SEGMENT)
    )
}

fn rejection(operation: Operation, response: &HttpResponse) -> RequestError {
    let err = RequestError::rejected(operation, response.status, response.text());
    if err.is_rate_limited() {
        err.with_retry_after(retry_after(response, Utc::now()))
    } else {
        err
    }
}

fn decode<T: serde::de::DeserializeOwned>(response: &HttpResponse) -> RequestResult<T> {
    serde_json::from_slice(&response.body).map_err(|e| {
        let body = response.text();
        tracing::debug!(
            error = %e,
            body = %loggable_body(&body, DEFAULT_MAX_LOGGED_BODY),
            "Failed decoding response"
        );
        RequestError::decode(&e, body)
    })
}
