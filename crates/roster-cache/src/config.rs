//! Configuration for cache regions.

use crate::error::CacheError;
use crate::events::CacheEvent;
use crate::CacheRegion;
use roster_core::EventListeners;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::time::Duration;

/// Settings shared by every lookup against one region.
pub struct RegionConfig {
    pub(crate) name: String,
    pub(crate) max_entries: NonZeroUsize,
    pub(crate) ttl: Option<Duration>,
    pub(crate) event_listeners: EventListeners<CacheEvent>,
}

impl RegionConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> RegionConfigBuilder {
        RegionConfigBuilder::new()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries.get()
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }
}

/// Builder for a [`CacheRegion`].
pub struct RegionConfigBuilder {
    name: String,
    max_entries: usize,
    ttl: Option<Duration>,
    event_listeners: EventListeners<CacheEvent>,
}

impl RegionConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self {
            name: String::from("<unnamed>"),
            max_entries: 100,
            ttl: None,
            event_listeners: EventListeners::new(),
        }
    }

    /// Sets the name used in events, logs and metric labels.
    ///
    /// Default: `"<unnamed>"`
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the maximum number of entries. The least recently used entry is
    /// evicted once the region is full.
    ///
    /// Default: 100
    pub fn max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    /// Sets how long an entry stays fresh after it is written.
    ///
    /// Default: None (entries never expire)
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Registers a callback invoked when a lookup is served from the region.
    pub fn on_hit<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners.on(
            |event| matches!(event, CacheEvent::Hit { .. }).then_some(()),
            move |()| f(),
        );
        self
    }

    /// Registers a callback invoked when a lookup starts a compute.
    pub fn on_miss<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners.on(
            |event| matches!(event, CacheEvent::Miss { .. }).then_some(()),
            move |()| f(),
        );
        self
    }

    /// Registers a callback invoked when an entry is evicted for capacity.
    pub fn on_eviction<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners.on(
            |event| matches!(event, CacheEvent::Eviction { .. }).then_some(()),
            move |()| f(),
        );
        self
    }

    /// Registers a callback invoked after the region is cleared, with the
    /// number of entries dropped.
    pub fn on_invalidate<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.on(
            |event| match event {
                CacheEvent::Invalidated { entries, .. } => Some(*entries),
                _ => None,
            },
            f,
        );
        self
    }

    /// Validates the settings and builds an empty region.
    pub fn build<K, V, E>(self) -> Result<CacheRegion<K, V, E>, CacheError>
    where
        K: Hash + Eq + Clone,
        V: Clone,
        E: Clone,
    {
        let max_entries = NonZeroUsize::new(self.max_entries).ok_or_else(|| {
            CacheError::ZeroCapacity {
                region: self.name.clone(),
            }
        })?;

        if self.ttl.is_some_and(|ttl| ttl.is_zero()) {
            return Err(CacheError::ZeroTtl { region: self.name });
        }

        Ok(CacheRegion::new(RegionConfig {
            name: self.name,
            max_entries,
            ttl: self.ttl,
            event_listeners: self.event_listeners,
        }))
    }
}

impl Default for RegionConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
