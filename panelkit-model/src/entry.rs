use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::blob::MediaBlob;

/// Format version stamped on every persisted entry.
///
/// Bump this when the on-disk layout of an entry changes; entries written by
/// other versions are read back as misses.
pub const CACHE_SCHEMA_VERSION: u32 = 1;

/// A durable cache record for one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub key: String,
    pub blob: MediaBlob,
    pub created_at: DateTime<Utc>,
    pub schema_version: u32,
}

impl CacheEntry {
    /// Stamp a fresh entry with the current time and schema version.
    pub fn new(key: impl Into<String>, blob: MediaBlob) -> Self {
        Self {
            key: key.into(),
            blob,
            created_at: Utc::now(),
            schema_version: CACHE_SCHEMA_VERSION,
        }
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn with_schema_version(mut self, schema_version: u32) -> Self {
        self.schema_version = schema_version;
        self
    }

    /// Age at `now`; a timestamp from the future counts as age zero.
    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.created_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        self.age_at(now) > ttl
    }

    pub fn header(&self) -> EntryHeader {
        EntryHeader {
            mime: self.blob.mime().to_string(),
            created_at: self.created_at,
            schema_version: self.schema_version,
        }
    }

    pub fn from_header(
        key: impl Into<String>,
        header: EntryHeader,
        bytes: impl Into<bytes::Bytes>,
    ) -> Self {
        Self {
            key: key.into(),
            blob: MediaBlob::new(bytes, header.mime),
            created_at: header.created_at,
            schema_version: header.schema_version,
        }
    }
}

/// Everything about an entry except its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntryHeader {
    pub mime: String,
    pub created_at: DateTime<Utc>,
    pub schema_version: u32,
}
