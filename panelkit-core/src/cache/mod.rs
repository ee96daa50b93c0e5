//! In-process tiers of the media cache and the façade that ties them to the
//! store and fetcher.

pub mod config;
pub mod dedup;
pub mod handle;
pub mod media_cache;
pub mod registry;
pub mod stats;

pub use config::{ConfigError, MediaCacheConfig, RetryConfig};
pub use dedup::Deduplicator;
pub use handle::{HandleTable, ObjectUrl, RenderableHandle};
pub use media_cache::MediaCache;
pub use registry::{EvictionOrder, HandleRegistry};
pub use stats::{MediaCacheStats, MediaCacheStatsSnapshot};
