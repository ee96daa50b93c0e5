mod support;

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use panelkit_core::{
    DiskStoreBackend, MediaCache, MediaCacheConfig, MediaError, MediaStoreRoot,
};
use panelkit_model::{CACHE_SCHEMA_VERSION, CacheEntry, MediaBlob};
use support::{BrokenStore, JPEG_BYTES, StubFetcher, memory_cache};

const IMG1: &str = "https://cdn.example/img1.png";

#[tokio::test]
async fn resolve_fetches_once_until_invalidated() {
    let fetcher = StubFetcher::new();
    let cache =
        memory_cache(&MediaCacheConfig::default(), Arc::clone(&fetcher));

    let h1 = cache.resolve(IMG1).await.unwrap();
    assert_eq!(fetcher.calls(), 1);
    let first = h1.load().unwrap();
    assert_eq!(first.bytes().as_ref(), JPEG_BYTES);
    assert_eq!(first.mime(), "image/png");

    let h2 = cache.resolve(IMG1).await.unwrap();
    assert_eq!(fetcher.calls(), 1);
    assert_eq!(h2, h1);
    assert_eq!(h2.load(), Some(first));

    cache.invalidate(IMG1).await;
    assert!(!h1.is_live());
    assert!(cache.store().get(IMG1).await.unwrap().is_none());

    let h3 = cache.resolve(IMG1).await.unwrap();
    assert_eq!(fetcher.calls(), 2);
    assert!(h3.is_live());
}

#[tokio::test]
async fn concurrent_resolves_share_one_fetch() {
    let fetcher = StubFetcher::gated();
    let cache =
        memory_cache(&MediaCacheConfig::default(), Arc::clone(&fetcher));

    let callers: Vec<_> = (0..10)
        .map(|_| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.resolve(IMG1).await })
        })
        .collect();

    loop {
        let stats = cache.stats();
        if stats.dedup_leaders + stats.dedup_waiters == 10 {
            break;
        }
        tokio::task::yield_now().await;
    }
    fetcher.open();

    let mut handles = Vec::new();
    for caller in callers {
        handles.push(caller.await.unwrap().unwrap());
    }
    assert_eq!(fetcher.calls(), 1);
    assert!(handles.windows(2).all(|pair| pair[0] == pair[1]));
    assert_eq!(cache.resident_handles(), 1);
    assert_eq!(cache.store().keys().await.unwrap(), vec![IMG1.to_string()]);

    let stats = cache.stats();
    assert_eq!(stats.dedup_leaders, 1);
    assert_eq!(stats.dedup_waiters, 9);
}

#[tokio::test]
async fn abandoned_resolve_still_populates_the_cache() {
    let fetcher = StubFetcher::gated();
    let cache =
        memory_cache(&MediaCacheConfig::default(), Arc::clone(&fetcher));

    let caller = {
        let cache = cache.clone();
        tokio::spawn(async move { cache.resolve(IMG1).await })
    };
    while cache.stats().dedup_leaders == 0 {
        tokio::task::yield_now().await;
    }
    caller.abort();
    fetcher.open();

    while cache.store().keys().await.unwrap().is_empty() {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    let handle = cache.lookup(IMG1).await.expect("filled by the orphaned run");
    assert!(handle.is_live());
    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test]
async fn expired_entries_force_a_refetch() {
    let fetcher = StubFetcher::new();
    let config = MediaCacheConfig::default();
    let cache = memory_cache(&config, Arc::clone(&fetcher));

    let age = chrono::Duration::from_std(config.ttl).unwrap()
        + chrono::Duration::milliseconds(1);
    let stale =
        CacheEntry::new(IMG1, MediaBlob::new(vec![1, 2, 3], "image/png"))
            .with_created_at(Utc::now() - age);
    cache.store().put_entry(&stale).await.unwrap();
    assert!(cache.store().get(IMG1).await.unwrap().is_none());

    cache.store().put_entry(&stale).await.unwrap();
    let handle = cache.resolve(IMG1).await.unwrap();
    assert_eq!(fetcher.calls(), 1);
    assert_eq!(handle.load().unwrap().bytes().as_ref(), JPEG_BYTES);
}

#[tokio::test]
async fn entries_from_a_previous_schema_version_are_misses() {
    let fetcher = StubFetcher::new();
    let cache =
        memory_cache(&MediaCacheConfig::default(), Arc::clone(&fetcher));

    let old = CacheEntry::new(IMG1, MediaBlob::new(vec![1, 2, 3], "image/png"))
        .with_schema_version(CACHE_SCHEMA_VERSION - 1);
    cache.store().put_entry(&old).await.unwrap();

    assert!(cache.lookup(IMG1).await.is_none());
    cache.store().put_entry(&old).await.unwrap();
    cache.resolve(IMG1).await.unwrap();
    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test]
async fn resident_handles_are_bounded_by_capacity() {
    let fetcher = StubFetcher::new();
    let config = MediaCacheConfig {
        max_resident_handles: 3,
        ..MediaCacheConfig::default()
    };
    let cache = memory_cache(&config, Arc::clone(&fetcher));

    let mut handles = Vec::new();
    for i in 0..4 {
        let url = format!("https://cdn.example/panel-{i}.png");
        handles.push(cache.resolve(&url).await.unwrap());
    }

    assert_eq!(cache.resident_handles(), 3);
    assert!(!handles[0].is_live());
    assert!(handles[1..].iter().all(|h| h.is_live()));
    assert_eq!(cache.stats().evictions, 1);

    // Evicted from memory, still durable.
    let again = cache.resolve("https://cdn.example/panel-0.png").await.unwrap();
    assert!(again.is_live());
    assert_eq!(fetcher.calls(), 4);
    assert_eq!(cache.stats().store_hits, 1);
}

#[tokio::test(start_paused = true)]
async fn a_failing_reference_does_not_affect_others() {
    let fetcher = StubFetcher::new();
    let broken = "https://cdn.example/broken.png";
    fetcher.fail(broken);
    let cache =
        memory_cache(&MediaCacheConfig::default(), Arc::clone(&fetcher));

    let err = cache.resolve(broken).await.unwrap_err();
    assert_eq!(err.reference(), broken);
    let MediaError::Fetch { source, .. } = &err else {
        panic!("expected a fetch error, got {err:?}");
    };
    assert_eq!(source.attempts, 3);
    assert_eq!(fetcher.attempts_for(broken), 3);
    assert!(cache.lookup(broken).await.is_none());

    let ok = cache.resolve(IMG1).await.unwrap();
    assert!(ok.is_live());
    assert_eq!(cache.stats().fetch_failures, 1);
}

#[tokio::test]
async fn clear_all_releases_every_handle_and_empties_the_store() {
    let fetcher = StubFetcher::new();
    let cache =
        memory_cache(&MediaCacheConfig::default(), Arc::clone(&fetcher));

    let mut handles = Vec::new();
    for i in 0..3 {
        let url = format!("https://cdn.example/page-{i}.webp");
        handles.push(cache.resolve(&url).await.unwrap());
    }
    let local = cache.register_local(MediaBlob::new(vec![7], "image/gif"));

    cache.clear_all().await;

    assert_eq!(cache.resident_handles(), 0);
    assert!(handles.iter().all(|h| !h.is_live()));
    assert!(!local.is_live());
    assert!(cache.store().keys().await.unwrap().is_empty());

    cache.clear_all().await;
    assert_eq!(cache.stats().store_errors, 0);
}

#[tokio::test]
async fn disk_store_survives_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let config = MediaCacheConfig {
        cache_dir: Some(dir.path().to_path_buf()),
        ..MediaCacheConfig::default()
    };
    let open = |fetcher: Arc<StubFetcher>| {
        let backend =
            DiskStoreBackend::new(MediaStoreRoot::new(dir.path().to_path_buf()))
                .unwrap();
        MediaCache::new(&config, fetcher, Arc::new(backend))
    };

    let first_fetcher = StubFetcher::new();
    let first = open(Arc::clone(&first_fetcher));
    first.resolve(IMG1).await.unwrap();
    assert_eq!(first_fetcher.calls(), 1);
    drop(first);

    let second_fetcher = StubFetcher::new();
    let second = open(Arc::clone(&second_fetcher));
    let handle = second.resolve(IMG1).await.unwrap();
    assert_eq!(second_fetcher.calls(), 0);
    let blob = handle.load().unwrap();
    assert_eq!(blob.bytes().as_ref(), JPEG_BYTES);
    assert_eq!(blob.mime(), "image/png");
}

#[tokio::test]
async fn storage_failures_degrade_to_network_fetches() {
    let fetcher = StubFetcher::new();
    let store = Arc::new(BrokenStore::default());
    let cache = MediaCache::new(
        &MediaCacheConfig::default(),
        fetcher.clone(),
        store.clone(),
    );

    // Failed read is a miss; failed write-back still yields a handle.
    let handle = cache.resolve(IMG1).await.unwrap();
    assert!(handle.is_live());
    assert_eq!(handle.load().unwrap().bytes().as_ref(), JPEG_BYTES);
    assert_eq!(fetcher.calls(), 1);
    assert_eq!(cache.stats().store_errors, 2);

    cache.invalidate(IMG1).await;
    cache.clear_all().await;
    assert!(!handle.is_live());

    let stats = cache.stats();
    assert_eq!(stats.fetches, 1);
    assert_eq!(stats.store_errors, 4);
    assert_eq!(store.calls(), 4);

    assert!(cache.resolve(IMG1).await.unwrap().is_live());
    assert_eq!(fetcher.calls(), 2);
}

async fn wait_for_fetch_start(fetcher: &StubFetcher, calls: usize) {
    while fetcher.calls() < calls {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn invalidate_during_a_fill_discards_its_result() {
    let fetcher = StubFetcher::gated();
    let cache =
        memory_cache(&MediaCacheConfig::default(), Arc::clone(&fetcher));

    let pending = {
        let cache = cache.clone();
        tokio::spawn(async move { cache.resolve(IMG1).await })
    };
    wait_for_fetch_start(&fetcher, 1).await;

    cache.invalidate(IMG1).await;
    fetcher.open();

    let outcome = pending.await.unwrap();
    assert!(matches!(outcome, Err(MediaError::Interrupted { .. })));
    assert!(cache.store().keys().await.unwrap().is_empty());
    assert_eq!(cache.resident_handles(), 0);

    let fresh = cache.resolve(IMG1).await.unwrap();
    assert!(fresh.is_live());
    assert_eq!(fetcher.calls(), 2);
}

#[tokio::test]
async fn clear_all_during_a_fill_leaves_both_tiers_empty() {
    let fetcher = StubFetcher::gated();
    let cache =
        memory_cache(&MediaCacheConfig::default(), Arc::clone(&fetcher));
    let other = "https://cdn.example/other.png";

    let pending = {
        let cache = cache.clone();
        tokio::spawn(async move { cache.resolve(IMG1).await })
    };
    wait_for_fetch_start(&fetcher, 1).await;

    cache.clear_all().await;
    fetcher.open();

    let outcome = pending.await.unwrap();
    assert_eq!(
        outcome.unwrap_err().reference(),
        IMG1,
        "the overtaken fill names its reference"
    );
    assert!(cache.store().keys().await.unwrap().is_empty());
    assert_eq!(cache.resident_handles(), 0);

    // Fills started after the clear are unaffected.
    assert!(cache.resolve(other).await.unwrap().is_live());
    assert_eq!(cache.store().keys().await.unwrap(), vec![other.to_string()]);
}
