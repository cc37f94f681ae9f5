use roster_core::events::RosterEvent;
use std::time::{Duration, Instant};

/// Events emitted while running an operation under a retry policy.
#[derive(Debug, Clone)]
pub enum RetryEvent {
    /// An attempt failed with a retryable error; another follows after `delay`.
    Retry {
        name: String,
        timestamp: Instant,
        /// 1-based number of the attempt that just failed.
        attempt: usize,
        delay: Duration,
    },
    /// The operation succeeded, possibly after retries.
    Success {
        name: String,
        timestamp: Instant,
        attempts: usize,
    },
    /// Every allowed attempt failed with a retryable error.
    Error {
        name: String,
        timestamp: Instant,
        attempts: usize,
    },
    /// The error was not retryable and was returned as-is.
    IgnoredError {
        name: String,
        timestamp: Instant,
        attempts: usize,
    },
}

impl RosterEvent for RetryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RetryEvent::Retry { .. } => "retry",
            RetryEvent::Success { .. } => "success",
            RetryEvent::Error { .. } => "exhausted",
            RetryEvent::IgnoredError { .. } => "ignored_error",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            RetryEvent::Retry { timestamp, .. }
            | RetryEvent::Success { timestamp, .. }
            | RetryEvent::Error { timestamp, .. }
            | RetryEvent::IgnoredError { timestamp, .. } => *timestamp,
        }
    }

    fn source(&self) -> &str {
        match self {
            RetryEvent::Retry { name, .. }
            | RetryEvent::Success { name, .. }
            | RetryEvent::Error { name, .. }
            | RetryEvent::IgnoredError { name, .. } => name,
        }
    }
}
