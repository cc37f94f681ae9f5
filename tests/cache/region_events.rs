//! Listener callbacks and statistics.

use roster_cache::{CacheRegion, RegionConfig};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Default)]
struct Counts {
    hits: AtomicUsize,
    misses: AtomicUsize,
    evictions: AtomicUsize,
    invalidated_entries: AtomicUsize,
}

fn observed_region(counts: &Arc<Counts>, max_entries: usize) -> CacheRegion<u32, u32, String> {
    let (h, m, e, i) = (
        Arc::clone(counts),
        Arc::clone(counts),
        Arc::clone(counts),
        Arc::clone(counts),
    );
    RegionConfig::builder()
        .name("observed")
        .max_entries(max_entries)
        .ttl(Duration::from_secs(60))
        .on_hit(move || {
            h.hits.fetch_add(1, Ordering::SeqCst);
        })
        .on_miss(move || {
            m.misses.fetch_add(1, Ordering::SeqCst);
        })
        .on_eviction(move || {
            e.evictions.fetch_add(1, Ordering::SeqCst);
        })
        .on_invalidate(move |entries| {
            i.invalidated_entries.fetch_add(entries, Ordering::SeqCst);
        })
        .build()
        .unwrap()
}

#[tokio::test]
async fn hit_and_miss_callbacks_fire() {
    let counts = Arc::new(Counts::default());
    let region = observed_region(&counts, 10);

    for _ in 0..3 {
        region.get_or_compute(1, || async { Ok(10) }).await.unwrap();
    }
    region.get_or_compute(2, || async { Ok(20) }).await.unwrap();

    assert_eq!(counts.misses.load(Ordering::SeqCst), 2);
    assert_eq!(counts.hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn eviction_callback_fires_once_per_evicted_entry() {
    let counts = Arc::new(Counts::default());
    let region = observed_region(&counts, 2);

    for key in 0..5 {
        region
            .get_or_compute(key, || async move { Ok(key * 10) })
            .await
            .unwrap();
    }

    assert_eq!(counts.evictions.load(Ordering::SeqCst), 3);
    assert_eq!(region.stats().evictions, 3);
    assert_eq!(region.len(), 2);
}

#[tokio::test]
async fn invalidate_callback_reports_dropped_entries() {
    let counts = Arc::new(Counts::default());
    let region = observed_region(&counts, 10);

    for key in 0..4 {
        region
            .get_or_compute(key, || async move { Ok(key) })
            .await
            .unwrap();
    }
    region.invalidate_all();
    region.invalidate_all();

    assert_eq!(counts.invalidated_entries.load(Ordering::SeqCst), 4);
    assert_eq!(region.stats().invalidations, 2);
    assert!(region.is_empty());
}

#[tokio::test]
async fn stats_track_the_hit_ratio() {
    let counts = Arc::new(Counts::default());
    let region = observed_region(&counts, 10);
    assert_eq!(region.stats().hit_ratio(), 0.0);

    region.get_or_compute(1, || async { Ok(1) }).await.unwrap();
    for _ in 0..3 {
        region.get_or_compute(1, || async { Ok(1) }).await.unwrap();
    }

    let stats = region.stats();
    assert_eq!(stats.hits, 3);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.size, 1);
    assert_eq!(stats.hit_ratio(), 0.75);
}
