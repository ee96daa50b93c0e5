//! # Panelkit Core
//!
//! Tiered media cache used by the panelkit comic editor and reader to turn
//! media references into renderable handles.
//!
//! ## Overview
//!
//! - **Handle registry**: live, capacity-bounded handles to in-memory bytes
//! - **Persistent store**: durable entries with a TTL and schema version guard
//! - **Binary fetcher**: HTTP downloads with bounded exponential backoff
//! - **Deduplication**: one fill per key no matter how many callers wait
//!
//! ## Architecture
//!
//! - [`cache`]: the [`MediaCache`] façade, the registry and the deduplicator
//! - [`infra`]: the network fetcher and the durable store backends
//! - [`error`]: error types surfaced by each tier
//!
//! ## Examples
//!
//! ```no_run
//! use panelkit_core::{MediaCache, MediaCacheConfig};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let cache = MediaCache::from_config(&MediaCacheConfig::default())?;
//! let handle = cache.resolve("https://cdn.example/panel-1.png").await?;
//! println!("render {}", handle.url());
//! # Ok(())
//! # }
//! ```
#![allow(missing_docs)]

pub mod cache;
pub mod error;
pub mod infra;

pub use cache::{
    EvictionOrder, MediaCache, MediaCacheConfig, MediaCacheStatsSnapshot,
    RenderableHandle,
};
pub use error::{FetchCause, FetchError, MediaError, Result, StoreError};
pub use infra::{
    fetch::{Fetcher, HttpFetcher, RetryPolicy},
    store::{
        DiskStoreBackend, MediaStoreRoot, MemoryStoreBackend, PersistentStore,
        StoreBackend, StorePolicy,
    },
};
pub use panelkit_model::{MediaBlob, MediaReference};
