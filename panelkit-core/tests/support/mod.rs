#![allow(dead_code)]

use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use panelkit_core::{
    FetchCause, FetchError, Fetcher, MediaBlob, MediaCache, MediaCacheConfig,
    MediaReference, MemoryStoreBackend, RetryPolicy, StoreBackend, StoreError,
    infra::fetch::{Attempt, GaveUp, with_backoff},
};
use panelkit_model::CacheEntry;
use parking_lot::Mutex;
use tokio::sync::Semaphore;

pub const JPEG_BYTES: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];

pub fn retry_policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::from_secs(1),
        max_delay: Duration::from_secs(30),
    }
}

/// Scripted fetcher: serves `JPEG_BYTES` as `image/png`, counts every
/// attempt per key, and fails every attempt for keys marked failing.
#[derive(Debug)]
pub struct StubFetcher {
    retry: RetryPolicy,
    calls: AtomicUsize,
    attempts: Mutex<HashMap<String, usize>>,
    failing: Mutex<HashSet<String>>,
    gate: Option<Semaphore>,
}

impl StubFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::build(None))
    }

    /// Every fetch blocks until [`open`](Self::open) is called.
    pub fn gated() -> Arc<Self> {
        Arc::new(Self::build(Some(Semaphore::new(0))))
    }

    fn build(gate: Option<Semaphore>) -> Self {
        Self {
            retry: retry_policy(),
            calls: AtomicUsize::new(0),
            attempts: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            gate,
        }
    }

    pub fn fail(&self, reference: &str) {
        self.failing.lock().insert(reference.to_string());
    }

    pub fn open(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(Semaphore::MAX_PERMITS / 2);
        }
    }

    /// Calls to [`Fetcher::fetch`], regardless of outcome.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Network attempts made for `reference`, retries included.
    pub fn attempts_for(&self, reference: &str) -> usize {
        self.attempts.lock().get(reference).copied().unwrap_or(0)
    }
}

#[async_trait]
impl Fetcher for StubFetcher {
    async fn fetch(
        &self,
        reference: &MediaReference,
    ) -> Result<MediaBlob, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            let _permit = gate.acquire().await.expect("gate closed");
        }

        let key = reference.cache_key().to_string();
        with_backoff(&self.retry, "stub_fetch", |_| {
            *self.attempts.lock().entry(key.clone()).or_default() += 1;
            let failing = self.failing.lock().contains(&key);
            async move {
                if failing {
                    Err(Attempt::Transient(FetchCause::Transport(
                        "connection reset".into(),
                    )))
                } else {
                    Ok(MediaBlob::new(JPEG_BYTES, "image/png"))
                }
            }
        })
        .await
        .map_err(|GaveUp { last, attempts }| {
            FetchError::new(&key, attempts, last)
        })
    }
}

pub fn memory_cache(
    config: &MediaCacheConfig,
    fetcher: Arc<StubFetcher>,
) -> MediaCache {
    MediaCache::new(config, fetcher, Arc::new(MemoryStoreBackend::new()))
}

/// Backend whose every operation fails, like a full or unmounted disk.
#[derive(Debug, Default)]
pub struct BrokenStore {
    calls: AtomicUsize,
}

impl BrokenStore {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail<T>(&self, op: &str) -> Result<T, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Backend(format!("{op}: quota exceeded")))
    }
}

#[async_trait]
impl StoreBackend for BrokenStore {
    async fn read(
        &self,
        _key: &str,
    ) -> Result<Option<CacheEntry>, StoreError> {
        self.fail("read")
    }

    async fn write(&self, _entry: &CacheEntry) -> Result<(), StoreError> {
        self.fail("write")
    }

    async fn remove(&self, _key: &str) -> Result<(), StoreError> {
        self.fail("remove")
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.fail("clear")
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        self.fail("keys")
    }
}
