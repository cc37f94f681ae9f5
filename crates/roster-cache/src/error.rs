//! Error types for cache regions.

use thiserror::Error;

/// Errors raised while building a [`CacheRegion`](crate::CacheRegion).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// `max_entries` was set to zero.
    #[error("cache region '{region}' must hold at least one entry")]
    ZeroCapacity { region: String },

    /// `ttl` was set to zero, so nothing could ever be served from the region.
    #[error("cache region '{region}' has a zero time-to-live")]
    ZeroTtl { region: String },
}
