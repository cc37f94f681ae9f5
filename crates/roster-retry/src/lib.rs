//! Bounded retry for calls that can fail transiently.
//!
//! A [`RetryConfig`] combines an attempt cap, a backoff strategy and a
//! predicate that picks out the retryable errors. It can drive any
//! async closure directly through [`RetryConfig::run`], or wrap a Tower
//! service through [`RetryLayer`].
//!
//! # Features
//!
//! - **IntervalFunction**: fixed, exponential, exponential with jitter, or
//!   closure-based backoff
//! - **Retry predicates**: only the errors you name are retried
//! - **Events**: every retry, success, exhaustion and ignored error is
//!   reported to registered listeners
//!
//! # Examples
//!
//! ```
//! use roster_retry::{ExponentialRandomBackoff, RetryConfig};
//! use std::time::Duration;
//!
//! #[derive(Debug, Clone, PartialEq)]
//! enum FetchError {
//!     RateLimited,
//!     NotFound,
//! }
//!
//! # async fn example() {
//! let retry = RetryConfig::builder()
//!     .name("upstream")
//!     .max_attempts(3)
//!     .backoff(
//!         ExponentialRandomBackoff::new(Duration::from_millis(100), 0.2)
//!             .multiplier(2.0)
//!             .max_interval(Duration::from_secs(2)),
//!     )
//!     .retry_on(|e: &FetchError| *e == FetchError::RateLimited)
//!     .build();
//!
//! let result: Result<u32, FetchError> = retry.run(|| async { Ok(7) }).await;
//! assert_eq!(result, Ok(7));
//! # }
//! ```

mod backoff;
mod config;
mod events;
mod layer;
mod policy;

pub use backoff::{
    ExponentialBackoff, ExponentialRandomBackoff, FixedInterval, FnInterval, IntervalFunction,
};
pub use config::{RetryConfig, RetryConfigBuilder};
pub use events::RetryEvent;
pub use layer::RetryLayer;
pub use policy::{RetryPolicy, RetryPredicate};

use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;
use tower::{Service, ServiceExt};

#[cfg(feature = "metrics")]
use metrics::counter;

#[cfg(feature = "tracing")]
use tracing::{error, info, warn};

impl<E> RetryConfig<E> {
    /// Runs `operation` until it succeeds, fails with a non-retryable error,
    /// or the attempt cap is reached.
    ///
    /// `operation` is called once per attempt. The error from the last
    /// attempt is returned unchanged.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        #[cfg(feature = "tracing")]
        info!(retry = %self.name, "Starting retryable operation");

        let max_attempts = self.policy.max_attempts;
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(value) => {
                    #[cfg(feature = "metrics")]
                    {
                        counter!("retry_calls_total", "retry" => self.name.clone(), "result" => "success")
                            .increment(1);
                    }

                    self.event_listeners.emit_with(|| RetryEvent::Success {
                        name: self.name.clone(),
                        timestamp: Instant::now(),
                        attempts: attempt,
                    });
                    return Ok(value);
                }
                Err(err) => {
                    if !self.policy.should_retry(&err) {
                        #[cfg(feature = "metrics")]
                        {
                            counter!("retry_calls_total", "retry" => self.name.clone(), "result" => "ignored")
                                .increment(1);
                        }

                        self.event_listeners.emit_with(|| RetryEvent::IgnoredError {
                            name: self.name.clone(),
                            timestamp: Instant::now(),
                            attempts: attempt,
                        });
                        return Err(err);
                    }

                    if attempt >= max_attempts {
                        #[cfg(feature = "metrics")]
                        {
                            counter!("retry_calls_total", "retry" => self.name.clone(), "result" => "exhausted")
                                .increment(1);
                        }

                        #[cfg(feature = "tracing")]
                        error!(
                            retry = %self.name,
                            attempts = attempt,
                            "All retry attempts exhausted"
                        );

                        self.event_listeners.emit_with(|| RetryEvent::Error {
                            name: self.name.clone(),
                            timestamp: Instant::now(),
                            attempts: attempt,
                        });
                        return Err(err);
                    }

                    let delay = self.policy.next_backoff(attempt - 1);

                    #[cfg(feature = "metrics")]
                    {
                        counter!("retry_attempts_total", "retry" => self.name.clone()).increment(1);
                    }

                    #[cfg(feature = "tracing")]
                    warn!(
                        retry = %self.name,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Retry attempt failed, backing off"
                    );

                    self.event_listeners.emit_with(|| RetryEvent::Retry {
                        name: self.name.clone(),
                        timestamp: Instant::now(),
                        attempt,
                        delay,
                    });

                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

/// A Tower [`Service`] that re-issues failed requests under a [`RetryConfig`].
///
/// Each attempt calls a fresh clone of the inner service, so the inner
/// service must be `Clone` and requests must be `Clone`.
pub struct Retry<S, E> {
    inner: S,
    config: Arc<RetryConfig<E>>,
}

impl<S, E> Retry<S, E> {
    pub fn new(inner: S, config: Arc<RetryConfig<E>>) -> Self {
        Self { inner, config }
    }
}

impl<S, E> Clone for Retry<S, E>
where
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            config: Arc::clone(&self.config),
        }
    }
}

impl<S, Req, E> Service<Req> for Retry<S, E>
where
    S: Service<Req, Error = E> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Response: Send + 'static,
    Req: Clone + Send + 'static,
    E: Send + 'static,
{
    type Response = S::Response;
    type Error = E;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let service = self.inner.clone();
        let config = Arc::clone(&self.config);

        Box::pin(async move {
            config
                .run(move || service.clone().oneshot(req.clone()))
                .await
        })
    }
}
