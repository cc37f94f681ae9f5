//! Command-line and environment configuration.

use crate::error::ApiError;
use crate::upstream::UpstreamTimeouts;
use clap::Parser;
use roster_retry::{ExponentialRandomBackoff, RetryConfig};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

/// Settings for one running proxy. Every flag can also be given through its
/// environment variable.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "roster",
    version,
    about = "Caching, retrying REST proxy for an upstream employee API"
)]
pub struct Config {
    /// Address to serve the API on
    #[arg(long, env = "ROSTER_LISTEN", default_value = "0.0.0.0:8111")]
    pub listen: SocketAddr,

    /// Base URL of the upstream employee API
    #[arg(
        long,
        env = "ROSTER_UPSTREAM_URL",
        default_value = "http://localhost:8112/api/v1"
    )]
    pub upstream_url: String,

    #[arg(long, env = "ROSTER_CONNECT_TIMEOUT_MS", default_value_t = 5_000)]
    pub connect_timeout_ms: u64,

    #[arg(long, env = "ROSTER_READ_TIMEOUT_MS", default_value_t = 10_000)]
    pub read_timeout_ms: u64,

    #[arg(long, env = "ROSTER_WRITE_TIMEOUT_MS", default_value_t = 10_000)]
    pub write_timeout_ms: u64,

    #[arg(long, env = "ROSTER_RESPONSE_TIMEOUT_MS", default_value_t = 10_000)]
    pub response_timeout_ms: u64,

    /// Attempts per upstream call, including the first
    #[arg(long, env = "ROSTER_RETRY_MAX_ATTEMPTS", default_value_t = 3)]
    pub retry_max_attempts: usize,

    /// Delay before the first retry
    #[arg(long, env = "ROSTER_RETRY_DELAY_MS", default_value_t = 500)]
    pub retry_delay_ms: u64,

    /// Growth factor of the delay between retries
    #[arg(long, env = "ROSTER_RETRY_MULTIPLIER", default_value_t = 2.0)]
    pub retry_multiplier: f64,

    /// Upper bound of the computed delay
    #[arg(long, env = "ROSTER_RETRY_MAX_DELAY_MS", default_value_t = 5_000)]
    pub retry_max_delay_ms: u64,

    /// Random spread applied to each delay, as a fraction in [0, 1]
    #[arg(long, env = "ROSTER_RETRY_JITTER", default_value_t = 0.2)]
    pub retry_jitter: f64,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("retry jitter must be between 0 and 1, got {0}")]
    InvalidJitter(f64),

    #[error("retry multiplier must be at least 1, got {0}")]
    InvalidMultiplier(f64),

    #[error("retry max attempts must be at least 1")]
    ZeroAttempts,

    #[error("upstream url must not be empty")]
    EmptyUpstreamUrl,
}

impl Config {
    /// Rejects settings that cannot produce a working proxy.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.retry_jitter) {
            return Err(ConfigError::InvalidJitter(self.retry_jitter));
        }
        if self.retry_multiplier.is_nan() || self.retry_multiplier < 1.0 {
            return Err(ConfigError::InvalidMultiplier(self.retry_multiplier));
        }
        if self.retry_max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }
        if self.upstream_url.trim().is_empty() {
            return Err(ConfigError::EmptyUpstreamUrl);
        }
        Ok(())
    }

    pub fn timeouts(&self) -> UpstreamTimeouts {
        UpstreamTimeouts {
            connect: Duration::from_millis(self.connect_timeout_ms),
            read: Duration::from_millis(self.read_timeout_ms),
            write: Duration::from_millis(self.write_timeout_ms),
            response: Duration::from_millis(self.response_timeout_ms),
        }
    }

    /// Retry policy for upstream calls: only rate limiting and unavailability
    /// are retried, with jittered exponential backoff.
    pub fn retry_config(&self) -> RetryConfig<ApiError> {
        let backoff = ExponentialRandomBackoff::new(
            Duration::from_millis(self.retry_delay_ms),
            self.retry_jitter,
        )
        .multiplier(self.retry_multiplier)
        .max_interval(Duration::from_millis(self.retry_max_delay_ms));

        RetryConfig::builder()
            .name("upstream")
            .max_attempts(self.retry_max_attempts)
            .backoff(backoff)
            .retry_on(ApiError::is_transient)
            .build()
    }
}
