//! Lifecycle tests of the teammate resource against a scripted transport.

#![allow(clippy::unwrap_used)]

use sendgrid_provider::mocks::{fixtures, MockResponse, MockTransport};
use sendgrid_provider::transport::HttpMethod;
use sendgrid_provider::{
    OperationContext, Resource, ResourceData, RetryConfig, SendGridClient, SendGridError,
    TeammateResource,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};
use tokio_util::sync::CancellationToken;

fn setup() -> (Arc<MockTransport>, SendGridClient) {
    let transport = Arc::new(MockTransport::new());
    let client = SendGridClient::builder()
        .api_key("SG.test.key")
        .retry(RetryConfig::new().max_attempts(5).jitter(false))
        .transport(transport.clone())
        .build()
        .unwrap();
    (transport, client)
}

fn resource(client: &SendGridClient) -> TeammateResource {
    client.teammate_resource()
}

#[tokio::test]
async fn test_full_lifecycle() {
    let (transport, client) = setup();
    let teammates = resource(&client);
    let ctx = OperationContext::new();

    transport.queue(MockResponse::json(&fixtures::teammate_json("a@x.com", true)));
    transport.queue(MockResponse::json(&fixtures::teammate_json("a@x.com", true)));
    transport.queue(MockResponse::raw(204, ""));

    let mut state = ResourceData::new()
        .attribute("email", "a@x.com")
        .attribute("is_admin", true);

    assert_ok!(teammates.create(&ctx, &mut state).await);
    assert_eq!(state.id(), "a@x.com");

    assert_ok!(teammates.read(&ctx, &mut state).await);
    assert_eq!(state.get::<String>("email").unwrap().as_deref(), Some("a@x.com"));
    assert_eq!(state.get::<bool>("is_admin").unwrap(), Some(true));

    assert_ok!(teammates.update(&ctx, &mut state).await);

    assert_ok!(teammates.delete(&ctx, &mut state).await);
    assert!(state.id.is_none());

    let methods: Vec<HttpMethod> = transport.requests().iter().map(|r| r.method).collect();
    assert_eq!(methods, vec![HttpMethod::Post, HttpMethod::Get, HttpMethod::Delete]);
}

#[tokio::test]
async fn test_on_behalf_of_only_on_create() {
    let (transport, client) = setup();
    let teammates = resource(&client);
    let ctx = OperationContext::new();

    transport.queue(MockResponse::json(&fixtures::teammate_json("a@x.com", false)));
    transport.queue(MockResponse::json(&fixtures::teammate_json("a@x.com", false)));
    transport.queue(MockResponse::raw(204, ""));

    let mut state = ResourceData::new()
        .attribute("email", "a@x.com")
        .attribute("is_admin", false)
        .attribute("on_behalf_of", "subuser-1");

    teammates.create(&ctx, &mut state).await.unwrap();
    teammates.read(&ctx, &mut state).await.unwrap();
    teammates.delete(&ctx, &mut state).await.unwrap();

    let requests = transport.requests();
    assert_eq!(requests[0].headers.get("on-behalf-of").map(String::as_str), Some("subuser-1"));
    assert!(requests[1..]
        .iter()
        .all(|r| !r.headers.contains_key("on-behalf-of")));
}

#[tokio::test]
async fn test_read_after_remote_removal_schedules_recreation() {
    let (transport, client) = setup();
    transport.queue_error(404, "resource not found");

    let mut state = ResourceData::with_id("a@x.com").attribute("is_admin", true);
    let err = assert_err!(
        resource(&client)
            .read(&OperationContext::new(), &mut state)
            .await
    );

    assert!(err.is_not_found());
    assert_eq!(state.id(), "a@x.com");
}

#[tokio::test]
async fn test_read_with_empty_list() {
    let (transport, client) = setup();
    transport.queue_json(&serde_json::json!([]));

    let mut state = ResourceData::with_id("a@x.com");
    let err = assert_err!(
        resource(&client)
            .read(&OperationContext::new(), &mut state)
            .await
    );

    assert!(matches!(err, SendGridError::TeammateNotFound { ref email } if email == "a@x.com"));
}

#[tokio::test]
async fn test_delete_twice_succeeds() {
    let (transport, client) = setup();
    let teammates = resource(&client);
    transport.queue(MockResponse::raw(204, ""));
    transport.queue_error(404, "resource not found");

    for _ in 0..2 {
        let mut state = ResourceData::with_id("a@x.com");
        assert_ok!(teammates.delete(&OperationContext::new(), &mut state).await);
        assert!(state.id.is_none());
    }
}

#[tokio::test]
async fn test_missing_email_is_not_acceptable() {
    let (transport, client) = setup();

    let err = client
        .teammates()
        .create("", true, &[], None)
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), 406);
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn test_undecodable_create_response() {
    let (transport, client) = setup();
    transport.queue(MockResponse::raw(201, "not json"));

    let mut state = ResourceData::new().attribute("email", "a@x.com");
    let err = assert_err!(
        resource(&client)
            .create(&OperationContext::new(), &mut state)
            .await
    );

    assert!(matches!(err, SendGridError::Decode { ref body, .. } if body == "not json"));
    assert!(state.id.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_stops_waiting() {
    let (transport, client) = setup();
    transport.set_default(MockResponse::error(429, "too many requests").with_header("Retry-After", "60"));

    let ctx = OperationContext::new();
    let canceller = ctx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        canceller.cancel();
    });

    let mut state = ResourceData::new().attribute("email", "a@x.com");
    let err = assert_err!(resource(&client).create(&ctx, &mut state).await);

    assert!(err.is_rate_limit_timeout());
    assert_eq!(transport.request_count(), 1);
    assert!(state.id.is_none());
}

#[tokio::test]
async fn test_cancelled_host_sends_nothing() {
    let (transport, client) = setup();
    let host = CancellationToken::new();
    let ctx = client
        .operation_context()
        .with_cancellation(host.child_token());
    host.cancel();

    let mut state = ResourceData::new().attribute("email", "a@x.com");
    let err = assert_err!(resource(&client).create(&ctx, &mut state).await);

    assert!(matches!(err, SendGridError::Interrupted { .. }));
    assert_eq!(err.to_string(), "operation cancelled before the first attempt");
    assert_eq!(transport.request_count(), 0);
    assert!(state.id.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_attempt_cap_while_rate_limited() {
    let (transport, client) = setup();
    transport.set_default(MockResponse::error(429, "too many requests"));

    let mut state = ResourceData::with_id("a@x.com");
    let err = assert_err!(
        resource(&client)
            .delete(&client.operation_context(), &mut state)
            .await
    );

    assert!(matches!(err, SendGridError::RateLimitExhausted { attempts: 5, .. }));
    assert_eq!(transport.request_count(), 5);
    assert_eq!(state.id(), "a@x.com");
}

#[test]
fn test_import_passthrough() {
    let (transport, client) = setup();

    let state = resource(&client).import("a@x.com");

    assert_eq!(state.id(), "a@x.com");
    assert!(state.attributes.is_empty());
    assert_eq!(transport.request_count(), 0);
}
