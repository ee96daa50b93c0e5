//! Persistent tier of the media cache.
//!
//! [`StoreBackend`] is the raw durable key/entry table; [`PersistentStore`]
//! layers the freshness policy (TTL + schema version) on top so that stale
//! and foreign-version entries read back as plain misses.

pub mod disk;
pub mod memory;

pub use disk::{DiskStoreBackend, MediaStoreRoot};
pub use memory::MemoryStoreBackend;

use std::{fmt, sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::Utc;
use panelkit_model::{CacheEntry, MediaBlob};
use tracing::{debug, warn};

use crate::error::StoreError;

/// Durable key → entry table.
#[async_trait]
pub trait StoreBackend: Send + Sync + fmt::Debug {
    /// Read an entry regardless of its age or version.
    async fn read(&self, key: &str)
    -> Result<Option<CacheEntry>, StoreError>;

    /// Replace whatever is stored under `entry.key`.
    async fn write(&self, entry: &CacheEntry) -> Result<(), StoreError>;

    /// Remove an entry; missing keys are not an error.
    async fn remove(&self, key: &str) -> Result<(), StoreError>;

    async fn clear(&self) -> Result<(), StoreError>;

    async fn keys(&self) -> Result<Vec<String>, StoreError>;
}

/// Freshness rules applied on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorePolicy {
    pub ttl: Duration,
    pub schema_version: u32,
}

/// Why a stored entry was not served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    Expired,
    VersionMismatch { found: u32 },
}

#[derive(Clone)]
pub struct PersistentStore {
    backend: Arc<dyn StoreBackend>,
    policy: StorePolicy,
}

impl fmt::Debug for PersistentStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistentStore")
            .field("backend", &self.backend)
            .field("policy", &self.policy)
            .finish()
    }
}

impl PersistentStore {
    pub fn new(backend: Arc<dyn StoreBackend>, policy: StorePolicy) -> Self {
        Self { backend, policy }
    }

    pub fn policy(&self) -> StorePolicy {
        self.policy
    }

    /// Fetch a fresh, version-matching entry.
    ///
    /// Expired and foreign-version entries are reported as `Ok(None)` and
    /// removed on the way out.
    pub async fn get(
        &self,
        key: &str,
    ) -> Result<Option<CacheEntry>, StoreError> {
        let entry = match self.backend.read(key).await {
            Ok(Some(entry)) => entry,
            Ok(None) => return Ok(None),
            Err(StoreError::CorruptEntry { reason, .. }) => {
                warn!(key, %reason, "dropping corrupt media cache entry");
                self.remove_quietly(key).await;
                return Ok(None);
            }
            Err(err) => return Err(err),
        };

        match self.check(&entry) {
            None => Ok(Some(entry)),
            Some(rejection) => {
                debug!(key, ?rejection, "persisted media entry rejected");
                self.remove_quietly(key).await;
                Ok(None)
            }
        }
    }

    /// Store `blob` under `key`, stamped with now and the current version.
    pub async fn set(
        &self,
        key: &str,
        blob: MediaBlob,
    ) -> Result<(), StoreError> {
        let entry = CacheEntry::new(key, blob)
            .with_schema_version(self.policy.schema_version);
        self.backend.write(&entry).await
    }

    /// Write a fully specified entry, keeping its timestamp and version.
    pub async fn put_entry(
        &self,
        entry: &CacheEntry,
    ) -> Result<(), StoreError> {
        self.backend.write(entry).await
    }

    pub async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.backend.remove(key).await
    }

    pub async fn clear(&self) -> Result<(), StoreError> {
        self.backend.clear().await
    }

    pub async fn keys(&self) -> Result<Vec<String>, StoreError> {
        self.backend.keys().await
    }

    fn check(&self, entry: &CacheEntry) -> Option<Rejection> {
        if entry.schema_version != self.policy.schema_version {
            return Some(Rejection::VersionMismatch {
                found: entry.schema_version,
            });
        }
        if entry.is_expired_at(Utc::now(), self.policy.ttl) {
            return Some(Rejection::Expired);
        }
        None
    }

    async fn remove_quietly(&self, key: &str) {
        if let Err(err) = self.backend.remove(key).await {
            warn!(key, %err, "failed to remove stale media cache entry");
        }
    }
}
