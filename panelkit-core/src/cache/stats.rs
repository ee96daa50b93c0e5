use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MediaCacheStatsSnapshot {
    pub registry_hits: u64,
    pub store_hits: u64,
    pub store_misses: u64,
    pub store_errors: u64,
    pub fetches: u64,
    pub fetch_failures: u64,
    pub evictions: u64,
    pub dedup_leaders: u64,
    pub dedup_waiters: u64,
    pub resident_handles: u64,
}

#[derive(Debug, Default)]
pub struct MediaCacheStats {
    registry_hits: AtomicU64,
    store_hits: AtomicU64,
    store_misses: AtomicU64,
    store_errors: AtomicU64,
    fetches: AtomicU64,
    fetch_failures: AtomicU64,
}

impl MediaCacheStats {
    pub fn on_registry_hit(&self) {
        self.registry_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn on_store_hit(&self) {
        self.store_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn on_store_miss(&self) {
        self.store_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn on_store_error(&self) {
        self.store_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn on_fetch(&self) {
        self.fetches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn on_fetch_failure(&self) {
        self.fetch_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Counters owned by other components are passed in so the snapshot is
    /// assembled in one place.
    pub fn snapshot(
        &self,
        evictions: u64,
        dedup_leaders: u64,
        dedup_waiters: u64,
        resident_handles: u64,
    ) -> MediaCacheStatsSnapshot {
        MediaCacheStatsSnapshot {
            registry_hits: self.registry_hits.load(Ordering::Relaxed),
            store_hits: self.store_hits.load(Ordering::Relaxed),
            store_misses: self.store_misses.load(Ordering::Relaxed),
            store_errors: self.store_errors.load(Ordering::Relaxed),
            fetches: self.fetches.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            evictions,
            dedup_leaders,
            dedup_waiters,
            resident_handles,
        }
    }
}
