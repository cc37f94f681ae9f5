//! Time-expiring, single-flight cache regions.
//!
//! A [`CacheRegion`] is one independently keyed, independently expiring
//! partition of cached values. Lookups go through
//! [`CacheRegion::get_or_compute`]: a fresh entry is returned as is, and on a
//! miss the supplied compute runs once per key no matter how many callers are
//! asking for it at the same moment.
//!
//! # Features
//!
//! - **TTL from write**: entries expire a fixed time after they were stored;
//!   reads do not extend them
//! - **LRU bound**: the least recently used entry is evicted once the region
//!   is full
//! - **Single-flight**: concurrent misses for one key share one compute, and
//!   its error (never cached) reaches every waiter
//! - **Wholesale invalidation**: [`CacheRegion::invalidate_all`] clears the
//!   region and detaches computes that started before it
//! - **Event System**: hit, miss, coalesced, eviction and invalidation events
//!
//! # Examples
//!
//! ```
//! use roster_cache::{CacheRegion, RegionConfig};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let by_id: CacheRegion<String, String, String> = RegionConfig::builder()
//!     .name("employeeById")
//!     .max_entries(50_000)
//!     .ttl(Duration::from_secs(60 * 60))
//!     .build()?;
//!
//! let name = by_id
//!     .get_or_compute("42".to_string(), || async { Ok("Alice".to_string()) })
//!     .await?;
//! assert_eq!(name, "Alice");
//!
//! // Served from the region this time.
//! let again = by_id
//!     .get_or_compute("42".to_string(), || async { Err("not called".to_string()) })
//!     .await?;
//! assert_eq!(again, "Alice");
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod events;
mod in_flight;
mod stats;
mod store;

pub use config::{RegionConfig, RegionConfigBuilder};
pub use error::CacheError;
pub use events::CacheEvent;
pub use stats::RegionStats;

use in_flight::{InFlight, Joined, ResultReceiver, ResultSender};
use parking_lot::Mutex;
use stats::StatsCounters;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};
use store::RegionStore;

#[cfg(feature = "metrics")]
use metrics::{counter, describe_counter, describe_gauge, gauge};

#[cfg(feature = "tracing")]
use tracing::{debug, info};

/// Mutable state of a region. Guarded by one lock that is never held across
/// an `.await`.
struct State<K, V, E> {
    store: RegionStore<K, V>,
    in_flight: InFlight<K, V, E>,
    /// Bumped by every invalidation. A compute only stores its value if the
    /// generation it started under is still current.
    generation: u64,
}

struct Shared<K, V, E> {
    config: RegionConfig,
    state: Mutex<State<K, V, E>>,
    stats: StatsCounters,
}

/// One cache partition with a TTL, an LRU bound and per-key single-flight
/// computes.
///
/// Cloning is cheap and every clone shares the same entries.
pub struct CacheRegion<K, V, E> {
    shared: Arc<Shared<K, V, E>>,
}

impl<K, V, E> Clone for CacheRegion<K, V, E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

enum Lookup<V, E> {
    Hit(V),
    Wait(ResultReceiver<V, E>),
    Lead { id: u64, generation: u64, sender: ResultSender<V, E> },
}

impl<V, E> CacheRegion<(), V, E>
where
    V: Clone,
    E: Clone,
{
    /// A region holding a single, unkeyed value.
    pub fn singleton(name: impl Into<String>, ttl: Duration) -> Result<Self, CacheError> {
        RegionConfig::builder()
            .name(name)
            .max_entries(1)
            .ttl(ttl)
            .build()
    }
}

impl<K, V, E> CacheRegion<K, V, E>
where
    K: Hash + Eq + Clone,
    V: Clone,
    E: Clone,
{
    pub(crate) fn new(config: RegionConfig) -> Self {
        #[cfg(feature = "metrics")]
        {
            describe_counter!(
                "cache_requests_total",
                "Total number of cache lookups (hits, misses and coalesced)"
            );
            describe_counter!("cache_evictions_total", "Total number of cache evictions");
            describe_gauge!("cache_size", "Current number of entries in the cache");
        }

        let state = State {
            store: RegionStore::new(config.max_entries, config.ttl),
            in_flight: InFlight::new(),
            generation: 0,
        };

        Self {
            shared: Arc::new(Shared {
                config,
                state: Mutex::new(state),
                stats: StatsCounters::default(),
            }),
        }
    }

    pub fn config(&self) -> &RegionConfig {
        &self.shared.config
    }

    pub fn name(&self) -> &str {
        &self.shared.config.name
    }

    /// Returns the fresh value for `key` without computing anything.
    pub fn get(&self, key: &K) -> Option<V> {
        self.shared
            .state
            .lock()
            .store
            .get(key, tokio::time::Instant::now())
    }

    /// Returns the fresh value for `key`, computing and storing it on a miss.
    ///
    /// While one caller computes a key, other callers for the same key wait
    /// for its result instead of computing again. Errors are handed to every
    /// waiter but never stored. If the computing caller is dropped before it
    /// finishes, the waiters retry the lookup and one of them computes.
    ///
    /// A compute that started before [`invalidate_all`](Self::invalidate_all)
    /// still returns its value to the callers that joined it, but the value is
    /// not stored.
    pub async fn get_or_compute<F, Fut>(&self, key: K, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        loop {
            match self.lookup(&key) {
                Lookup::Hit(value) => return Ok(value),
                Lookup::Wait(mut receiver) => {
                    if let Ok(result) = receiver.recv().await {
                        return result;
                    }
                    // The leader went away without publishing. Look again.
                }
                Lookup::Lead {
                    id,
                    generation,
                    sender,
                } => {
                    let mut leader = Leader {
                        shared: &self.shared,
                        key: key.clone(),
                        id,
                        generation,
                        finished: false,
                    };
                    let result = compute().await;
                    leader.publish(&result);
                    let _ = sender.send(result.clone());
                    return result;
                }
            }
        }
    }

    fn lookup(&self, key: &K) -> Lookup<V, E> {
        let lookup = {
            let mut state = self.shared.state.lock();
            match state.store.get(key, tokio::time::Instant::now()) {
                Some(value) => Lookup::Hit(value),
                None => {
                    let generation = state.generation;
                    match state.in_flight.join_or_lead(key.clone()) {
                        Joined::Waiter(receiver) => Lookup::Wait(receiver),
                        Joined::Leader { id, sender } => Lookup::Lead {
                            id,
                            generation,
                            sender,
                        },
                    }
                }
            }
        };

        let name = &self.shared.config.name;
        let result = match &lookup {
            Lookup::Hit(_) => {
                self.shared.stats.record_hit();
                "hit"
            }
            Lookup::Wait(_) => {
                self.shared.stats.record_coalesced();
                "coalesced"
            }
            Lookup::Lead { .. } => {
                self.shared.stats.record_miss();
                "miss"
            }
        };

        #[cfg(feature = "metrics")]
        {
            counter!("cache_requests_total", "cache" => name.clone(), "result" => result)
                .increment(1);
        }

        #[cfg(feature = "tracing")]
        debug!(cache = %name, result, "Cache lookup");

        #[cfg(not(any(feature = "metrics", feature = "tracing")))]
        let _ = result;

        self.shared.config.event_listeners.emit_with(|| {
            let name = name.clone();
            let timestamp = Instant::now();
            match &lookup {
                Lookup::Hit(_) => CacheEvent::Hit { name, timestamp },
                Lookup::Wait(_) => CacheEvent::Coalesced { name, timestamp },
                Lookup::Lead { .. } => CacheEvent::Miss { name, timestamp },
            }
        });
        lookup
    }

    /// Drops every entry and detaches every running compute.
    pub fn invalidate_all(&self) {
        let entries = {
            let mut state = self.shared.state.lock();
            let entries = state.store.len();
            state.store.clear();
            state.in_flight.clear();
            state.generation = state.generation.wrapping_add(1);
            entries
        };

        self.shared.stats.record_invalidation();
        let name = &self.shared.config.name;

        #[cfg(feature = "metrics")]
        {
            gauge!("cache_size", "cache" => name.clone()).set(0.0);
        }

        #[cfg(feature = "tracing")]
        info!(cache = %name, entries, "Cache region invalidated");

        self.shared
            .config
            .event_listeners
            .emit_with(|| CacheEvent::Invalidated {
                name: name.clone(),
                timestamp: Instant::now(),
                entries,
            });
    }

    /// Number of stored entries, including expired ones not yet dropped.
    pub fn len(&self) -> usize {
        self.shared.state.lock().store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A snapshot of this region's counters.
    pub fn stats(&self) -> RegionStats {
        let size = self.len();
        self.shared.stats.snapshot(size)
    }
}

/// Held by the caller running a compute. Dropping it unpublished (the caller
/// was cancelled) removes the flight so that its waiters look again.
struct Leader<'a, K, V, E>
where
    K: Hash + Eq,
{
    shared: &'a Shared<K, V, E>,
    key: K,
    id: u64,
    generation: u64,
    finished: bool,
}

impl<K, V, E> Leader<'_, K, V, E>
where
    K: Hash + Eq + Clone,
    V: Clone,
    E: Clone,
{
    /// Ends the flight and stores a successful value if the region was not
    /// invalidated in the meantime.
    fn publish(&mut self, result: &Result<V, E>) {
        self.finished = true;

        let (evicted, _size) = {
            let mut state = self.shared.state.lock();
            state.in_flight.finish(&self.key, self.id);

            let evicted = match result {
                Ok(value) if state.generation == self.generation => state.store.insert(
                    self.key.clone(),
                    value.clone(),
                    tokio::time::Instant::now(),
                ),
                _ => false,
            };
            (evicted, state.store.len())
        };

        #[cfg(feature = "metrics")]
        {
            gauge!("cache_size", "cache" => self.shared.config.name.clone()).set(_size as f64);
        }

        if evicted {
            self.shared.stats.record_eviction();

            #[cfg(feature = "metrics")]
            {
                counter!("cache_evictions_total", "cache" => self.shared.config.name.clone())
                    .increment(1);
            }

            #[cfg(feature = "tracing")]
            debug!(cache = %self.shared.config.name, "Cache eviction occurred");

            self.shared
                .config
                .event_listeners
                .emit_with(|| CacheEvent::Eviction {
                    name: self.shared.config.name.clone(),
                    timestamp: Instant::now(),
                });
        }
    }
}

impl<K, V, E> Drop for Leader<'_, K, V, E>
where
    K: Hash + Eq,
{
    fn drop(&mut self) {
        if !self.finished {
            self.shared.state.lock().in_flight.finish(&self.key, self.id);
        }
    }
}
