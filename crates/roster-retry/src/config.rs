use crate::backoff::{ExponentialBackoff, FixedInterval, IntervalFunction};
use crate::events::RetryEvent;
use crate::policy::RetryPolicy;
use roster_core::events::EventListeners;
use std::sync::Arc;
use std::time::Duration;

/// A retry policy plus its name and event listeners.
///
/// Run an operation under it with [`RetryConfig::run`], or wrap a Tower
/// service with [`RetryConfig::layer`].
pub struct RetryConfig<E> {
    pub(crate) policy: RetryPolicy<E>,
    pub(crate) event_listeners: EventListeners<RetryEvent>,
    pub(crate) name: String,
}

impl<E> RetryConfig<E> {
    pub fn builder() -> RetryConfigBuilder<E> {
        RetryConfigBuilder::new()
    }

    pub fn policy(&self) -> &RetryPolicy<E> {
        &self.policy
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Turns this configuration into a Tower layer.
    pub fn layer(self) -> crate::RetryLayer<E> {
        crate::RetryLayer::new(self)
    }
}

impl<E> Clone for RetryConfig<E> {
    fn clone(&self) -> Self {
        Self {
            policy: self.policy.clone(),
            event_listeners: self.event_listeners.clone(),
            name: self.name.clone(),
        }
    }
}

/// Builder for [`RetryConfig`].
pub struct RetryConfigBuilder<E> {
    max_attempts: usize,
    interval_fn: Option<Arc<dyn IntervalFunction>>,
    policy_predicate: Option<Arc<dyn Fn(&E) -> bool + Send + Sync>>,
    event_listeners: EventListeners<RetryEvent>,
    name: String,
}

impl<E> Default for RetryConfigBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> RetryConfigBuilder<E> {
    /// Defaults: 3 attempts, exponential backoff from 100ms, every error
    /// retried, name `"<unnamed>"`.
    pub fn new() -> Self {
        Self {
            max_attempts: 3,
            interval_fn: None,
            policy_predicate: None,
            event_listeners: EventListeners::new(),
            name: "<unnamed>".to_string(),
        }
    }

    /// Total attempts including the first one.
    pub fn max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn fixed_backoff(mut self, duration: Duration) -> Self {
        self.interval_fn = Some(Arc::new(FixedInterval::new(duration)));
        self
    }

    pub fn exponential_backoff(mut self, initial_interval: Duration) -> Self {
        self.interval_fn = Some(Arc::new(ExponentialBackoff::new(initial_interval)));
        self
    }

    pub fn backoff<I>(mut self, interval_fn: I) -> Self
    where
        I: IntervalFunction + 'static,
    {
        self.interval_fn = Some(Arc::new(interval_fn));
        self
    }

    /// Only errors for which `predicate` returns `true` are retried.
    pub fn retry_on<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.policy_predicate = Some(Arc::new(predicate));
        self
    }

    /// Name reported in events, logs and metric labels.
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Called before sleeping ahead of a retry, with the 1-based number of the
    /// failed attempt and the delay about to be slept.
    pub fn on_retry<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, Duration) + Send + Sync + 'static,
    {
        self.event_listeners.on(
            |event| match event {
                RetryEvent::Retry { attempt, delay, .. } => Some((*attempt, *delay)),
                _ => None,
            },
            move |(attempt, delay)| f(attempt, delay),
        );
        self
    }

    /// Called on success with the total number of attempts made.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.on(
            |event| match event {
                RetryEvent::Success { attempts, .. } => Some(*attempts),
                _ => None,
            },
            f,
        );
        self
    }

    /// Called when the attempt cap is reached with a retryable error.
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.on(
            |event| match event {
                RetryEvent::Error { attempts, .. } => Some(*attempts),
                _ => None,
            },
            f,
        );
        self
    }

    /// Called when an error is returned without retrying because the
    /// predicate rejected it.
    pub fn on_ignored_error<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners.on(
            |event| matches!(event, RetryEvent::IgnoredError { .. }).then_some(()),
            move |()| f(),
        );
        self
    }

    pub fn build(self) -> RetryConfig<E> {
        let interval_fn = self
            .interval_fn
            .unwrap_or_else(|| Arc::new(ExponentialBackoff::new(Duration::from_millis(100))));

        let mut policy = RetryPolicy::new(self.max_attempts, interval_fn);
        policy.retry_predicate = self.policy_predicate;

        RetryConfig {
            policy,
            event_listeners: self.event_listeners,
            name: self.name,
        }
    }
}
