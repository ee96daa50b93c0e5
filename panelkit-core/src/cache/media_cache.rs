//! The media cache façade.
//!
//! Resolution order for a remote reference is registry → persistent store →
//! network. Everything past the registry runs inside the deduplicator, so
//! concurrent callers for the same key share one store read, one fetch, one
//! write-back and one handle.

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use anyhow::Context;
use dashmap::DashMap;
use panelkit_model::{MediaBlob, MediaReference};
use tracing::{debug, info, warn};

use super::{
    config::MediaCacheConfig,
    dedup::Deduplicator,
    handle::RenderableHandle,
    registry::HandleRegistry,
    stats::{MediaCacheStats, MediaCacheStatsSnapshot},
};
use crate::{
    error::{FetchError, MediaError, Result},
    infra::{
        fetch::{Fetcher, HttpFetcher},
        store::{DiskStoreBackend, PersistentStore, StoreBackend},
    },
};

/// Process-wide media cache. Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct MediaCache {
    inner: Arc<Inner>,
}

struct Inner {
    fetcher: Arc<dyn Fetcher>,
    store: PersistentStore,
    registry: HandleRegistry,
    dedup: Deduplicator<RenderableHandle>,
    stats: MediaCacheStats,
    // Bumped by `clear_all`.
    epoch: AtomicU64,
    // Per-key counters bumped by `invalidate`.
    generations: DashMap<String, u64>,
}

/// What a fill saw when it started. A fill whose ticket no longer matches
/// was overtaken by `invalidate` or `clear_all` and must not write back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FillTicket {
    epoch: u64,
    generation: u64,
}

impl fmt::Debug for MediaCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaCache")
            .field("fetcher", &self.inner.fetcher)
            .field("store", &self.inner.store)
            .field("registry", &self.inner.registry)
            .field("dedup", &self.inner.dedup)
            .finish()
    }
}

impl MediaCache {
    pub fn new(
        config: &MediaCacheConfig,
        fetcher: Arc<dyn Fetcher>,
        backend: Arc<dyn StoreBackend>,
    ) -> Self {
        let store = PersistentStore::new(backend, config.store_policy());
        let registry = HandleRegistry::new(
            config.max_resident_handles,
            config.eviction_order,
        );
        Self {
            inner: Arc::new(Inner {
                fetcher,
                store,
                registry,
                dedup: Deduplicator::new(),
                stats: MediaCacheStats::default(),
                epoch: AtomicU64::new(0),
                generations: DashMap::new(),
            }),
        }
    }

    /// Build the production stack: HTTP fetcher plus on-disk store.
    pub fn from_config(config: &MediaCacheConfig) -> anyhow::Result<Self> {
        config.validate().context("invalid media cache config")?;

        let fetcher =
            HttpFetcher::new(config.retry_policy(), config.request_timeout)
                .context("failed to build HTTP client for media fetches")?;

        let root = config.store_root()?;
        info!(path = %root.as_path().display(), "opening media cache store");
        let backend = DiskStoreBackend::new(root)
            .context("failed to open media cache store")?;

        Ok(Self::new(config, Arc::new(fetcher), Arc::new(backend)))
    }

    /// Turn `reference` into a renderable handle.
    ///
    /// Local handle URLs come back unchanged. Remote references are served
    /// from the registry, then the persistent store, then the network. A
    /// failure is not remembered: resolving again starts a fresh attempt.
    pub async fn resolve(&self, reference: &str) -> Result<RenderableHandle> {
        let parsed = MediaReference::parse(reference).map_err(|err| {
            MediaError::fetch(FetchError::unsupported(
                reference.trim(),
                err.to_string(),
            ))
        })?;

        if parsed.is_local() {
            let key = parsed.cache_key();
            return Ok(self
                .inner
                .registry
                .peek(key)
                .unwrap_or_else(|| RenderableHandle::passthrough(key)));
        }

        let key = parsed.cache_key().to_string();
        if let Some(handle) = self.inner.registry.peek(&key) {
            self.inner.stats.on_registry_hit();
            return Ok(handle);
        }

        let inner = Arc::clone(&self.inner);
        self.inner
            .dedup
            .run(&key, move || async move { inner.fill(parsed).await })
            .await
    }

    /// Cached handle for `reference` without touching the network.
    pub async fn lookup(&self, reference: &str) -> Option<RenderableHandle> {
        let parsed = MediaReference::parse(reference).ok()?;
        let key = parsed.cache_key();
        if let Some(handle) = self.inner.registry.peek(key) {
            self.inner.stats.on_registry_hit();
            return Some(handle);
        }
        if parsed.is_local() {
            return None;
        }
        let blob = self.inner.load_persisted(key).await?;
        Some(self.inner.registry.acquire(key, blob))
    }

    /// Release the live handle for `reference`, keeping any persisted bytes.
    pub fn release(&self, reference: &str) {
        if let Some(key) = cache_key(reference)
            && self.inner.registry.release(&key)
        {
            debug!(key = %key, "released media handle");
        }
    }

    /// Forget `reference` in both tiers so the next resolve fetches afresh.
    ///
    /// A fill already in flight for the key runs to completion but its
    /// result is discarded; its waiters get [`MediaError::Interrupted`].
    pub async fn invalidate(&self, reference: &str) {
        let Some(key) = cache_key(reference) else {
            return;
        };
        *self.inner.generations.entry(key.clone()).or_insert(0) += 1;
        self.inner.registry.release(&key);
        if let Err(err) = self.inner.store.remove(&key).await {
            self.inner.stats.on_store_error();
            warn!(key = %key, %err, "failed to remove persisted media entry");
        }
        debug!(key = %key, "invalidated media reference");
    }

    /// Release every live handle and empty the persistent store.
    ///
    /// Fills in flight are discarded the same way as for
    /// [`invalidate`](Self::invalidate).
    pub async fn clear_all(&self) {
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
        self.inner.generations.clear();
        let released = self.inner.registry.release_all();
        if let Err(err) = self.inner.store.clear().await {
            self.inner.stats.on_store_error();
            warn!(%err, "failed to clear persisted media entries");
        }
        info!(released, "cleared media cache");
    }

    /// Mint a local handle for directly supplied bytes. It lives in the
    /// registry like any other handle but is never persisted.
    pub fn register_local(&self, blob: MediaBlob) -> RenderableHandle {
        let handle = self.inner.registry.acquire_unkeyed(blob);
        debug!(url = handle.url(), "registered local media");
        handle
    }

    pub fn stats(&self) -> MediaCacheStatsSnapshot {
        let inner = &self.inner;
        inner.stats.snapshot(
            inner.registry.evictions(),
            inner.dedup.leaders(),
            inner.dedup.waiters(),
            inner.registry.len() as u64,
        )
    }

    /// Native handles currently pinned by this cache.
    pub fn resident_handles(&self) -> usize {
        self.inner.registry.table().live_count()
    }

    pub fn store(&self) -> &PersistentStore {
        &self.inner.store
    }

    pub fn registry(&self) -> &HandleRegistry {
        &self.inner.registry
    }
}

impl Inner {
    async fn fill(
        &self,
        reference: MediaReference,
    ) -> Result<RenderableHandle> {
        let key = reference.cache_key();
        let ticket = self.ticket(key);

        // A previous fill may have settled between the caller's peek and
        // this run being registered.
        if let Some(handle) = self.registry.peek(key) {
            self.stats.on_registry_hit();
            return Ok(handle);
        }

        if let Some(blob) = self.load_persisted(key).await {
            return self.admit(key, blob, ticket);
        }

        self.stats.on_fetch();
        let blob = match self.fetcher.fetch(&reference).await {
            Ok(blob) => blob,
            Err(err) => {
                self.stats.on_fetch_failure();
                warn!(key, error = %err, "media fetch failed");
                return Err(MediaError::fetch(err));
            }
        };
        debug!(key, bytes = blob.len(), mime = blob.mime(), "fetched media");

        if !self.is_current(key, ticket) {
            return Err(superseded(key));
        }
        match self.store.set(key, blob.clone()).await {
            Ok(()) if !self.is_current(key, ticket) => {
                self.discard_persisted(key).await;
                return Err(superseded(key));
            }
            Ok(()) => {}
            Err(err) => {
                self.stats.on_store_error();
                warn!(key, %err, "failed to persist fetched media");
            }
        }

        self.admit(key, blob, ticket)
    }

    fn ticket(&self, key: &str) -> FillTicket {
        FillTicket {
            epoch: self.epoch.load(Ordering::SeqCst),
            generation: self.generations.get(key).map_or(0, |g| *g),
        }
    }

    fn is_current(&self, key: &str, ticket: FillTicket) -> bool {
        self.ticket(key) == ticket
    }

    /// Register `blob` unless the fill was overtaken. The second check
    /// catches an invalidate that raced the acquire itself.
    fn admit(
        &self,
        key: &str,
        blob: MediaBlob,
        ticket: FillTicket,
    ) -> Result<RenderableHandle> {
        if self.is_current(key, ticket) {
            let handle = self.registry.acquire(key, blob);
            if self.is_current(key, ticket) {
                return Ok(handle);
            }
            self.registry.release(key);
        }
        Err(superseded(key))
    }

    async fn discard_persisted(&self, key: &str) {
        if let Err(err) = self.store.remove(key).await {
            self.stats.on_store_error();
            warn!(key, %err, "failed to drop superseded media entry");
        }
    }

    /// Persisted blob for `key`; store failures are logged and read as a miss.
    async fn load_persisted(&self, key: &str) -> Option<MediaBlob> {
        match self.store.get(key).await {
            Ok(Some(entry)) => {
                self.stats.on_store_hit();
                Some(entry.blob)
            }
            Ok(None) => {
                self.stats.on_store_miss();
                None
            }
            Err(err) => {
                self.stats.on_store_error();
                warn!(key, %err, "media store read failed, treating as miss");
                None
            }
        }
    }
}

fn superseded(key: &str) -> MediaError {
    debug!(key, "fill overtaken by invalidate or clear, discarding result");
    MediaError::Interrupted {
        reference: key.to_string(),
        message: "invalidated while loading".to_string(),
    }
}

fn cache_key(reference: &str) -> Option<String> {
    match MediaReference::parse(reference) {
        Ok(parsed) => Some(parsed.cache_key().to_string()),
        Err(err) => {
            debug!(reference, %err, "ignoring unparseable media reference");
            None
        }
    }
}
