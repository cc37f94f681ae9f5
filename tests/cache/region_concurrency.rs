//! Single-flight behavior under concurrent lookups.

use roster_cache::{CacheRegion, RegionConfig};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinSet;

fn region() -> CacheRegion<u32, String, String> {
    RegionConfig::builder()
        .name("concurrency")
        .max_entries(100)
        .ttl(Duration::from_secs(60))
        .build()
        .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn many_callers_share_one_compute_per_key() {
    let region = region();
    let calls = Arc::new(AtomicUsize::new(0));
    let release = Arc::new(Notify::new());

    let mut tasks = JoinSet::new();
    for i in 0..40u32 {
        let region = region.clone();
        let calls = Arc::clone(&calls);
        let release = Arc::clone(&release);
        let key = i % 4;
        tasks.spawn(async move {
            region
                .get_or_compute(key, || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    release.notified().await;
                    Ok(format!("value-{key}"))
                })
                .await
        });
    }

    // Let every task reach the region before the computes finish.
    tokio::time::sleep(Duration::from_millis(50)).await;
    release.notify_waiters();

    let mut results = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        results.push(joined.unwrap().unwrap());
    }

    assert_eq!(results.len(), 40);
    assert_eq!(calls.load(Ordering::SeqCst), 4);
    for key in 0..4u32 {
        let expected = format!("value-{key}");
        assert_eq!(results.iter().filter(|r| **r == expected).count(), 10);
    }

    let stats = region.stats();
    assert_eq!(stats.misses, 4);
    assert_eq!(stats.coalesced, 36);
    assert_eq!(stats.size, 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn one_failed_compute_fails_every_waiter_once() {
    let region = region();
    let calls = Arc::new(AtomicUsize::new(0));
    let release = Arc::new(Notify::new());

    let mut tasks = JoinSet::new();
    for _ in 0..8 {
        let region = region.clone();
        let calls = Arc::clone(&calls);
        let release = Arc::clone(&release);
        tasks.spawn(async move {
            region
                .get_or_compute(7, || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    release.notified().await;
                    Err("Rate Limit Reached, try after some time".to_string())
                })
                .await
        });
    }

    tokio::time::sleep(Duration::from_millis(50)).await;
    release.notify_waiters();

    while let Some(joined) = tasks.join_next().await {
        assert_eq!(
            joined.unwrap(),
            Err("Rate Limit Reached, try after some time".to_string())
        );
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(region.is_empty());

    // Nothing was stored, so the next lookup computes again.
    let value = region
        .get_or_compute(7, || async { Ok("recovered".to_string()) })
        .await
        .unwrap();
    assert_eq!(value, "recovered");
}

#[tokio::test]
async fn aborted_leader_does_not_strand_waiters() {
    let region = region();
    let never = Arc::new(Notify::new());

    let leader = {
        let region = region.clone();
        let never = Arc::clone(&never);
        tokio::spawn(async move {
            region
                .get_or_compute(1, || async move {
                    never.notified().await;
                    Ok("from leader".to_string())
                })
                .await
        })
    };
    tokio::task::yield_now().await;

    let waiter = {
        let region = region.clone();
        tokio::spawn(async move {
            region
                .get_or_compute(1, || async { Ok("from waiter".to_string()) })
                .await
        })
    };
    tokio::task::yield_now().await;

    leader.abort();
    assert!(leader.await.unwrap_err().is_cancelled());

    assert_eq!(waiter.await.unwrap(), Ok("from waiter".to_string()));
    assert_eq!(region.get(&1).as_deref(), Some("from waiter"));
}

#[tokio::test]
async fn invalidation_during_compute_keeps_the_region_clean() {
    let region = region();
    let release = Arc::new(Notify::new());

    let before = {
        let region = region.clone();
        let release = Arc::clone(&release);
        tokio::spawn(async move {
            region
                .get_or_compute(3, || async move {
                    release.notified().await;
                    Ok("stale".to_string())
                })
                .await
        })
    };
    tokio::task::yield_now().await;

    region.invalidate_all();

    // A lookup after the invalidation starts its own compute.
    let after = region
        .get_or_compute(3, || async { Ok("fresh".to_string()) })
        .await
        .unwrap();
    assert_eq!(after, "fresh");

    release.notify_one();
    assert_eq!(before.await.unwrap(), Ok("stale".to_string()));
    assert_eq!(region.get(&3).as_deref(), Some("fresh"));
}
