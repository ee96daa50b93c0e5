use std::{
    collections::{HashMap, VecDeque},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use panelkit_model::MediaBlob;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::handle::{HandleTable, ObjectUrl, RenderableHandle};

/// Which resident handle goes first when the registry is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvictionOrder {
    /// Oldest acquisition first; hits do not refresh position.
    #[default]
    Insertion,
    /// Least recently acquired or peeked first.
    Access,
}

#[derive(Debug)]
struct Resident {
    object_url: ObjectUrl,
    blob: MediaBlob,
}

#[derive(Debug, Default)]
struct RegistryState {
    residents: HashMap<String, Resident>,
    // Front is next to evict.
    order: VecDeque<String>,
}

impl RegistryState {
    fn forget(&mut self, key: &str) -> Option<Resident> {
        let resident = self.residents.remove(key)?;
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
        Some(resident)
    }

    fn bump(&mut self, key: &str) {
        if let Some(pos) = self.order.iter().position(|k| k == key)
            && let Some(k) = self.order.remove(pos)
        {
            self.order.push_back(k);
        }
    }
}

/// Key → live handle map with a resident-count cap.
///
/// All operations are synchronous; the lock is never held across an await.
/// Released residents are dropped after the lock is let go, so revoking a
/// slot never runs under the registry lock.
#[derive(Debug)]
pub struct HandleRegistry {
    table: Arc<HandleTable>,
    state: Mutex<RegistryState>,
    capacity: usize,
    order: EvictionOrder,
    evictions: AtomicU64,
}

impl HandleRegistry {
    pub fn new(capacity: usize, order: EvictionOrder) -> Self {
        Self::with_table(HandleTable::new(), capacity, order)
    }

    pub fn with_table(
        table: Arc<HandleTable>,
        capacity: usize,
        order: EvictionOrder,
    ) -> Self {
        Self {
            table,
            state: Mutex::new(RegistryState::default()),
            capacity: capacity.max(1),
            order,
            evictions: AtomicU64::new(0),
        }
    }

    pub fn table(&self) -> &Arc<HandleTable> {
        &self.table
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Live handle for `key`, creating one from `blob` if needed.
    ///
    /// A live handle over identical bytes is reused; different bytes replace
    /// it (the old slot is revoked). When the registry is full the front of
    /// the eviction order is released first.
    pub fn acquire(&self, key: &str, blob: MediaBlob) -> RenderableHandle {
        let mut released = Vec::new();
        let handle = {
            let mut state = self.state.lock();

            if let Some(existing) = state.residents.get(key) {
                if existing.blob == blob {
                    let handle = existing.object_url.handle().clone();
                    if self.order == EvictionOrder::Access {
                        state.bump(key);
                    }
                    return handle;
                }
                released.extend(state.forget(key));
            }

            let object_url = self.table.create(blob.clone());
            self.admit(
                &mut state,
                key.to_string(),
                object_url,
                blob,
                &mut released,
            )
        };
        drop(released);
        handle
    }

    /// Pin `blob` under a fresh handle whose own URL is the registry key.
    pub fn acquire_unkeyed(&self, blob: MediaBlob) -> RenderableHandle {
        let mut released = Vec::new();
        let handle = {
            let mut state = self.state.lock();
            let object_url = self.table.create(blob.clone());
            let key = object_url.url().to_string();
            self.admit(&mut state, key, object_url, blob, &mut released)
        };
        drop(released);
        handle
    }

    fn admit(
        &self,
        state: &mut RegistryState,
        key: String,
        object_url: ObjectUrl,
        blob: MediaBlob,
        released: &mut Vec<Resident>,
    ) -> RenderableHandle {
        while state.residents.len() >= self.capacity {
            let Some(oldest) = state.order.pop_front() else {
                break;
            };
            if let Some(resident) = state.residents.remove(&oldest) {
                debug!(key = %oldest, "evicting resident media handle");
                self.evictions.fetch_add(1, Ordering::Relaxed);
                released.push(resident);
            }
        }

        let handle = object_url.handle().clone();
        state.order.push_back(key.clone());
        state.residents.insert(key, Resident { object_url, blob });
        handle
    }

    pub fn peek(&self, key: &str) -> Option<RenderableHandle> {
        let mut state = self.state.lock();
        let handle = state.residents.get(key)?.object_url.handle().clone();
        if self.order == EvictionOrder::Access {
            state.bump(key);
        }
        Some(handle)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.state.lock().residents.contains_key(key)
    }

    /// Release the handle for `key`. No-op when nothing is live.
    pub fn release(&self, key: &str) -> bool {
        let released = self.state.lock().forget(key);
        let was_live = released.is_some();
        drop(released);
        was_live
    }

    /// Release every live handle, returning how many were released.
    pub fn release_all(&self) -> usize {
        let drained: Vec<Resident> = {
            let mut state = self.state.lock();
            state.order.clear();
            state.residents.drain().map(|(_, r)| r).collect()
        };
        drained.len()
    }

    pub fn len(&self) -> usize {
        self.state.lock().residents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }
}
