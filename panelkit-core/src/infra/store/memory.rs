use std::collections::HashMap;

use async_trait::async_trait;
use panelkit_model::CacheEntry;
use parking_lot::Mutex;

use super::StoreBackend;
use crate::error::StoreError;

/// Process-local backend. Nothing survives a restart; used for ephemeral
/// sessions and tests.
#[derive(Debug, Default)]
pub struct MemoryStoreBackend {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryStoreBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[async_trait]
impl StoreBackend for MemoryStoreBackend {
    async fn read(
        &self,
        key: &str,
    ) -> Result<Option<CacheEntry>, StoreError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    async fn write(&self, entry: &CacheEntry) -> Result<(), StoreError> {
        self.entries
            .lock()
            .insert(entry.key.clone(), entry.clone());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.lock().remove(key);
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.entries.lock().clear();
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.entries.lock().keys().cloned().collect())
    }
}
