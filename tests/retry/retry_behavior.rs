//! Attempt cap, predicates and the Tower service.

use super::UpstreamError;
use roster_retry::{Retry, RetryConfig};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tower::{Layer, Service, ServiceExt};

fn transient_only(max_attempts: usize) -> RetryConfig<UpstreamError> {
    RetryConfig::builder()
        .name("upstream")
        .max_attempts(max_attempts)
        .fixed_backoff(Duration::from_millis(1))
        .retry_on(UpstreamError::is_transient)
        .build()
}

/// Fails with `error` for the first `failures` calls, then answers `"ok"`.
fn flaky(
    failures: usize,
    error: UpstreamError,
    calls: Arc<AtomicUsize>,
) -> impl Service<u32, Response = &'static str, Error = UpstreamError, Future: Send + 'static>
       + Clone
       + Send
       + 'static {
    tower::service_fn(move |_id: u32| {
        let n = calls.fetch_add(1, Ordering::SeqCst);
        let error = error.clone();
        async move {
            if n < failures {
                Err(error)
            } else {
                Ok("ok")
            }
        }
    })
}

#[tokio::test]
async fn transient_failures_below_the_cap_recover() {
    let calls = Arc::new(AtomicUsize::new(0));
    let service = transient_only(3)
        .layer()
        .layer(flaky(2, UpstreamError::RateLimited, Arc::clone(&calls)));

    assert_eq!(service.oneshot(1).await, Ok("ok"));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn exhausting_the_cap_surfaces_the_last_error() {
    let calls = Arc::new(AtomicUsize::new(0));
    let service = transient_only(3)
        .layer()
        .layer(flaky(10, UpstreamError::Unavailable, Arc::clone(&calls)));

    assert_eq!(service.oneshot(1).await, Err(UpstreamError::Unavailable));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn permanent_errors_are_returned_immediately() {
    let calls = Arc::new(AtomicUsize::new(0));
    let service = transient_only(5)
        .layer()
        .layer(flaky(10, UpstreamError::NotFound, Arc::clone(&calls)));

    assert_eq!(service.oneshot(1).await, Err(UpstreamError::NotFound));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn zero_attempts_still_calls_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let service = transient_only(0)
        .layer()
        .layer(flaky(10, UpstreamError::RateLimited, Arc::clone(&calls)));

    assert_eq!(service.oneshot(1).await, Err(UpstreamError::RateLimited));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn without_a_predicate_every_error_is_retried() {
    let config: RetryConfig<UpstreamError> = RetryConfig::builder()
        .max_attempts(4)
        .fixed_backoff(Duration::from_millis(1))
        .build();
    let calls = Arc::new(AtomicUsize::new(0));
    let service = config
        .layer()
        .layer(flaky(3, UpstreamError::NotFound, Arc::clone(&calls)));

    assert_eq!(service.oneshot(1).await, Ok("ok"));
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn clones_share_the_policy() {
    let calls = Arc::new(AtomicUsize::new(0));
    let service: Retry<_, UpstreamError> = transient_only(2)
        .layer()
        .layer(flaky(1, UpstreamError::RateLimited, Arc::clone(&calls)));

    let mut first = service.clone();
    let mut second = service;
    assert_eq!(first.ready().await.unwrap().call(1).await, Ok("ok"));
    assert_eq!(second.ready().await.unwrap().call(2).await, Ok("ok"));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn run_drives_a_plain_closure() {
    let attempts = AtomicUsize::new(0);
    let result = transient_only(3)
        .run(|| {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(UpstreamError::RateLimited)
                } else {
                    Ok(n)
                }
            }
        })
        .await;

    assert_eq!(result, Ok(1));
}
