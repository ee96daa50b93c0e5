use std::{
    fmt,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use directories::ProjectDirs;
use panelkit_model::{CacheEntry, EntryHeader};
use tokio::io::AsyncWriteExt;
use tracing::warn;

use super::StoreBackend;
use crate::error::StoreError;

/// Root directory for the media blob store.
///
/// `cacache` manages this directory internally (index + content-addressed
/// blobs); nothing else should write into it.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct MediaStoreRoot(PathBuf);

impl MediaStoreRoot {
    pub fn new(path: PathBuf) -> Self {
        Self(path)
    }

    /// Per-user cache directory, e.g. `~/.cache/panelkit/media` on Linux.
    pub fn default_location() -> Option<Self> {
        let proj_dirs = ProjectDirs::from("", "panelkit", "panelkit")?;
        Some(Self(proj_dirs.cache_dir().join("media")))
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Debug for MediaStoreRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MediaStoreRoot").field(&self.0).finish()
    }
}

/// `cacache`-backed durable store.
///
/// The payload is stored content-addressed; the entry header (type tag,
/// creation time, schema version) rides along as the index metadata of the
/// key, so a single index lookup answers freshness questions before any blob
/// is read.
#[derive(Clone, Debug)]
pub struct DiskStoreBackend {
    root: MediaStoreRoot,
}

impl DiskStoreBackend {
    pub fn new(root: MediaStoreRoot) -> Result<Self, StoreError> {
        std::fs::create_dir_all(root.as_path())?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &MediaStoreRoot {
        &self.root
    }
}

#[async_trait]
impl StoreBackend for DiskStoreBackend {
    async fn read(
        &self,
        key: &str,
    ) -> Result<Option<CacheEntry>, StoreError> {
        let Some(meta) = cacache::metadata(self.root.as_path(), key).await?
        else {
            return Ok(None);
        };

        let header: EntryHeader = serde_json::from_value(meta.metadata)
            .map_err(|err| StoreError::CorruptEntry {
                key: key.to_string(),
                reason: format!("unreadable entry header: {err}"),
            })?;

        let bytes =
            match cacache::read_hash(self.root.as_path(), &meta.integrity)
                .await
            {
                Ok(bytes) => bytes,
                // Index outlived its content; same as never cached.
                Err(cacache::Error::EntryNotFound(_, _)) => return Ok(None),
                Err(err) => {
                    return Err(match StoreError::from(err) {
                        StoreError::CorruptEntry { reason, .. } => {
                            StoreError::CorruptEntry {
                                key: key.to_string(),
                                reason,
                            }
                        }
                        other => other,
                    });
                }
            };

        Ok(Some(CacheEntry::from_header(key, header, bytes)))
    }

    async fn write(&self, entry: &CacheEntry) -> Result<(), StoreError> {
        let header = serde_json::to_value(entry.header())?;
        let bytes = entry.blob.bytes();

        let mut writer = cacache::WriteOpts::new()
            .size(bytes.len())
            .metadata(header)
            .open(self.root.as_path(), &entry.key)
            .await?;
        writer.write_all(bytes).await?;
        writer.commit().await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        cacache::index::RemoveOpts::new()
            .remove_fully(true)
            .remove(self.root.as_path(), key)
            .await
            .map_err(|e| {
                StoreError::Backend(format!("cacache remove failed: {e}"))
            })
    }

    async fn clear(&self) -> Result<(), StoreError> {
        if !tokio::fs::try_exists(self.root.as_path())
            .await
            .unwrap_or(false)
        {
            return Ok(());
        }
        cacache::clear(self.root.as_path()).await?;
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        let root = self.root.as_path().to_path_buf();
        tokio::task::spawn_blocking(move || {
            let mut out = Vec::new();
            for entry in cacache::index::ls(&root) {
                match entry {
                    Ok(m) => out.push(m.key),
                    Err(e) => {
                        warn!("media store index ls entry error: {e}");
                    }
                }
            }
            out
        })
        .await
        .map_err(|e| {
            StoreError::Backend(format!("media store index ls join error: {e}"))
        })
    }
}
