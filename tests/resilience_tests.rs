//! Properties of the rate-limit retry wrapper.

#![allow(clippy::unwrap_used)]

use sendgrid_provider::{
    retry_on_rate_limit, Operation, OperationContext, RateLimitRetry, RequestError, RetryConfig,
    RetryError,
};
use sendgrid_provider::resilience::Interrupted;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use test_case::test_case;
use tokio::time::Instant;

fn rejected(status: u16) -> RequestError {
    RequestError::rejected(Operation::ReadTeammate, status, "{}")
}

#[test_case(400 ; "bad request")]
#[test_case(401 ; "unauthorized")]
#[test_case(403 ; "forbidden")]
#[test_case(500 ; "server error")]
#[test_case(503 ; "unavailable")]
#[tokio::test]
async fn test_only_rate_limits_are_retried(status: u16) {
    let calls = Arc::new(AtomicU32::new(0));

    let result = retry_on_rate_limit(&OperationContext::new(), &RetryConfig::default(), || {
        let calls = Arc::clone(&calls);
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(rejected(status))
        }
    })
    .await;

    let err = result.unwrap_err();
    assert!(matches!(err, RetryError::Failed(_)));
    assert_eq!(err.last().unwrap().status_code(), status);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_missing_field_is_not_retried() {
    let calls = Arc::new(AtomicU32::new(0));

    let result = retry_on_rate_limit(&OperationContext::new(), &RetryConfig::default(), || {
        let calls = Arc::clone(&calls);
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(RequestError::missing_field("email"))
        }
    })
    .await;

    assert_eq!(result.unwrap_err().into_last().unwrap().status_code(), 406);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_backoff_grows_between_attempts() {
    let policy = RateLimitRetry::new(
        RetryConfig::new()
            .initial_delay(Duration::from_secs(1))
            .multiplier(2.0)
            .max_delay(Duration::from_secs(30))
            .jitter(false),
    );
    let started = Instant::now();
    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));

    let result = policy
        .execute(&OperationContext::new(), || {
            let seen = Arc::clone(&seen);
            async move {
                let mut seen = seen.lock().unwrap();
                seen.push(started.elapsed().as_secs());
                if seen.len() < 4 {
                    Err(rejected(429))
                } else {
                    Ok(seen.len())
                }
            }
        })
        .await;

    assert_eq!(result.unwrap(), 4);
    assert_eq!(*seen.lock().unwrap(), vec![0, 1, 3, 7]);
}

#[tokio::test(start_paused = true)]
async fn test_deadline_bounds_total_wait() {
    let ctx = OperationContext::with_timeout(Duration::from_secs(20));
    let started = Instant::now();
    let calls = Arc::new(AtomicU32::new(0));

    let result = retry_on_rate_limit(&ctx, &RetryConfig::new().max_attempts(1000), || {
        let calls = Arc::clone(&calls);
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(rejected(429))
        }
    })
    .await;

    let err = result.unwrap_err();
    assert!(err.is_deadline_exceeded());
    assert_eq!(err.last().unwrap().status_code(), 429);
    assert!(started.elapsed() >= Duration::from_secs(20));
    assert!(started.elapsed() < Duration::from_secs(21));
    assert!(calls.load(Ordering::SeqCst) > 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_context_makes_no_attempt() {
    let ctx = OperationContext::new();
    ctx.cancel();
    let calls = Arc::new(AtomicU32::new(0));

    let result = retry_on_rate_limit(&ctx, &RetryConfig::default(), || {
        let calls = Arc::clone(&calls);
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(rejected(429))
        }
    })
    .await;

    let err = result.unwrap_err();
    assert!(matches!(
        err,
        RetryError::Interrupted {
            reason: Interrupted::Cancelled
        }
    ));
    assert!(err.is_deadline_exceeded());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_during_wait_reports_cancellation() {
    let ctx = OperationContext::new();
    let canceller = ctx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        canceller.cancel();
    });

    let result = retry_on_rate_limit(&ctx, &RetryConfig::default(), || async {
        Err::<(), _>(rejected(429))
    })
    .await;

    assert!(matches!(
        result.unwrap_err(),
        RetryError::DeadlineExceeded {
            attempts: 1,
            cancelled: true,
            ..
        }
    ));
}

#[tokio::test]
async fn test_success_returns_value_without_waiting() {
    let started = std::time::Instant::now();

    let value = retry_on_rate_limit(&OperationContext::new(), &RetryConfig::default(), || async {
        Ok::<_, RequestError>(42)
    })
    .await
    .unwrap();

    assert_eq!(value, 42);
    assert!(started.elapsed() < Duration::from_secs(1));
}
