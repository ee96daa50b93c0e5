//! Configuration loading and process bootstrap for the panelkit media cache.
#![allow(missing_docs)]

pub mod settings;
pub mod telemetry;

pub use settings::{ConfigSource, LoggingSettings, MediaCacheSettings};
pub use telemetry::init_tracing;

use anyhow::Context;
use panelkit_core::MediaCache;
use tracing::{debug, info};

/// Load `.env`, resolve settings, install tracing and open the cache.
pub fn bootstrap() -> anyhow::Result<(MediaCache, ConfigSource)> {
    let (settings, source) = MediaCacheSettings::load_from_env()?;

    if !init_tracing(&settings.logging.filter) {
        debug!("tracing subscriber already installed");
    }
    source.log();
    info!(
        ttl = ?settings.cache.ttl,
        max_resident_handles = settings.cache.max_resident_handles,
        "media cache settings resolved"
    );

    let cache = MediaCache::from_config(&settings.cache)
        .context("failed to initialise media cache")?;
    Ok((cache, source))
}
