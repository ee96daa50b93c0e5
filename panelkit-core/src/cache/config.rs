use std::{path::PathBuf, time::Duration};

use panelkit_model::CACHE_SCHEMA_VERSION;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::registry::EvictionOrder;
use crate::infra::{
    fetch::RetryPolicy,
    store::{MediaStoreRoot, StorePolicy},
};

pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);
pub const DEFAULT_MAX_RESIDENT_HANDLES: usize = 200;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaCacheConfig {
    /// Persisted entries older than this read back as misses.
    #[serde(with = "humantime_duration")]
    pub ttl: Duration,
    pub max_resident_handles: usize,
    pub eviction_order: EvictionOrder,
    pub schema_version: u32,
    /// Disk store root; `None` uses the platform cache directory.
    pub cache_dir: Option<PathBuf>,
    pub retry: RetryConfig,
    #[serde(with = "humantime_duration")]
    pub request_timeout: Duration,
}

impl Default for MediaCacheConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            max_resident_handles: DEFAULT_MAX_RESIDENT_HANDLES,
            eviction_order: EvictionOrder::default(),
            schema_version: CACHE_SCHEMA_VERSION,
            cache_dir: None,
            retry: RetryConfig::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    #[serde(with = "humantime_duration")]
    pub base_delay: Duration,
    #[serde(with = "humantime_duration")]
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::defaults();
        Self {
            max_attempts: policy.max_attempts,
            base_delay: policy.base_delay,
            max_delay: policy.max_delay,
        }
    }
}

impl From<RetryConfig> for RetryPolicy {
    fn from(config: RetryConfig) -> Self {
        RetryPolicy {
            max_attempts: config.max_attempts,
            base_delay: config.base_delay,
            max_delay: config.max_delay,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("ttl must be greater than zero")]
    ZeroTtl,
    #[error("retry.max_attempts must be at least 1")]
    ZeroAttempts,
    #[error(
        "retry.max_delay ({max_delay:?}) must not be shorter than \
         retry.base_delay ({base_delay:?})"
    )]
    DelayBounds {
        base_delay: Duration,
        max_delay: Duration,
    },
    #[error(
        "no cache directory configured and no platform cache directory \
         available"
    )]
    NoCacheDir,
}

impl MediaCacheConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ttl.is_zero() {
            return Err(ConfigError::ZeroTtl);
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }
        if self.retry.max_delay < self.retry.base_delay {
            return Err(ConfigError::DelayBounds {
                base_delay: self.retry.base_delay,
                max_delay: self.retry.max_delay,
            });
        }
        Ok(())
    }

    pub fn store_policy(&self) -> StorePolicy {
        StorePolicy {
            ttl: self.ttl,
            schema_version: self.schema_version,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry.into()
    }

    pub fn store_root(&self) -> Result<MediaStoreRoot, ConfigError> {
        match &self.cache_dir {
            Some(dir) => Ok(MediaStoreRoot::new(dir.clone())),
            None => MediaStoreRoot::default_location()
                .ok_or(ConfigError::NoCacheDir),
        }
    }
}

/// Durations as humantime strings (`"24h"`, `"250ms"`); plain integers are
/// read as seconds.
pub mod humantime_duration {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer, de};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Text(String),
        Seconds(u64),
        Struct { secs: u64, nanos: u32 },
    }

    pub fn serialize<S>(
        value: &Duration,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&humantime::format_duration(*value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Repr::deserialize(deserializer)? {
            Repr::Text(text) => humantime::parse_duration(text.trim())
                .map_err(|err| {
                    de::Error::custom(format!(
                        "invalid duration {text:?}: {err}"
                    ))
                }),
            Repr::Seconds(secs) => Ok(Duration::from_secs(secs)),
            Repr::Struct { secs, nanos } => Ok(Duration::new(secs, nanos)),
        }
    }
}
