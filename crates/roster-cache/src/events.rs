use roster_core::RosterEvent;
use std::time::Instant;

/// Events emitted by a cache region.
#[derive(Debug, Clone)]
pub enum CacheEvent {
    /// A lookup was served from the region.
    Hit { name: String, timestamp: Instant },
    /// A lookup found nothing fresh and started a compute.
    Miss { name: String, timestamp: Instant },
    /// A lookup found nothing fresh and joined a compute already in flight.
    Coalesced { name: String, timestamp: Instant },
    /// Storing a value pushed the least recently used entry out.
    Eviction { name: String, timestamp: Instant },
    /// The region was cleared.
    Invalidated {
        name: String,
        timestamp: Instant,
        /// Entries dropped by the invalidation.
        entries: usize,
    },
}

impl RosterEvent for CacheEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CacheEvent::Hit { .. } => "hit",
            CacheEvent::Miss { .. } => "miss",
            CacheEvent::Coalesced { .. } => "coalesced",
            CacheEvent::Eviction { .. } => "eviction",
            CacheEvent::Invalidated { .. } => "invalidated",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            CacheEvent::Hit { timestamp, .. }
            | CacheEvent::Miss { timestamp, .. }
            | CacheEvent::Coalesced { timestamp, .. }
            | CacheEvent::Eviction { timestamp, .. }
            | CacheEvent::Invalidated { timestamp, .. } => *timestamp,
        }
    }

    fn source(&self) -> &str {
        match self {
            CacheEvent::Hit { name, .. }
            | CacheEvent::Miss { name, .. }
            | CacheEvent::Coalesced { name, .. }
            | CacheEvent::Eviction { name, .. }
            | CacheEvent::Invalidated { name, .. } => name,
        }
    }
}
