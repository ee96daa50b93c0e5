//! Renderable handles and the native table that backs them.
//!
//! [`HandleTable`] plays the role of the platform's object-URL store: every
//! slot pins a payload in memory until it is revoked. The only way to revoke
//! a slot is to drop the [`ObjectUrl`] that created it, so a slot can never
//! be leaked by forgetting a string.

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use dashmap::DashMap;
use panelkit_model::{HandleId, MediaBlob};

#[derive(Debug, Default)]
pub struct HandleTable {
    slots: DashMap<HandleId, MediaBlob>,
    created: AtomicU64,
    revoked: AtomicU64,
}

impl HandleTable {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Pin `blob` under a fresh handle URL.
    pub fn create(self: &Arc<Self>, blob: MediaBlob) -> ObjectUrl {
        let id = HandleId::new();
        let url: Arc<str> = Arc::from(id.to_url());
        let mime: Arc<str> = Arc::from(blob.mime());
        self.slots.insert(id, blob);
        self.created.fetch_add(1, Ordering::Relaxed);
        ObjectUrl {
            handle: RenderableHandle {
                id: Some(id),
                url,
                mime,
                table: Arc::downgrade(self),
            },
            table: Arc::clone(self),
        }
    }

    pub fn get(&self, id: &HandleId) -> Option<MediaBlob> {
        self.slots.get(id).map(|slot| slot.value().clone())
    }

    pub fn is_live(&self, id: &HandleId) -> bool {
        self.slots.contains_key(id)
    }

    /// Number of slots currently pinned.
    pub fn live_count(&self) -> usize {
        self.slots.len()
    }

    pub fn created_total(&self) -> u64 {
        self.created.load(Ordering::Relaxed)
    }

    pub fn revoked_total(&self) -> u64 {
        self.revoked.load(Ordering::Relaxed)
    }

    fn revoke(&self, id: &HandleId) {
        if self.slots.remove(id).is_some() {
            self.revoked.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Owned native handle. Dropping it revokes the slot.
pub struct ObjectUrl {
    handle: RenderableHandle,
    table: Arc<HandleTable>,
}

impl ObjectUrl {
    /// A borrowable view for consumers. It stays valid only until this
    /// `ObjectUrl` is dropped.
    pub fn handle(&self) -> &RenderableHandle {
        &self.handle
    }

    pub fn url(&self) -> &str {
        &self.handle.url
    }
}

impl Drop for ObjectUrl {
    fn drop(&mut self) {
        if let Some(id) = self.handle.id {
            self.table.revoke(&id);
        }
    }
}

impl fmt::Debug for ObjectUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ObjectUrl").field(&self.handle.url).finish()
    }
}

/// What display code holds on to: a URL plus a way to read the pinned bytes.
///
/// Cloning is cheap. Once the cache releases the underlying slot,
/// [`load`](Self::load) returns `None`; consumers are expected to resolve
/// again on their next render.
#[derive(Clone)]
pub struct RenderableHandle {
    id: Option<HandleId>,
    url: Arc<str>,
    mime: Arc<str>,
    table: std::sync::Weak<HandleTable>,
}

impl RenderableHandle {
    /// Wrap a local reference the cache did not mint. It renders as-is and
    /// has no bytes the cache can serve.
    pub fn passthrough(url: &str) -> Self {
        Self {
            id: None,
            url: Arc::from(url),
            mime: Arc::from(""),
            table: std::sync::Weak::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Type tag of the pinned payload; empty for passthrough handles.
    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn id(&self) -> Option<HandleId> {
        self.id
    }

    pub fn is_passthrough(&self) -> bool {
        self.id.is_none()
    }

    pub fn is_live(&self) -> bool {
        match (self.id, self.table.upgrade()) {
            (Some(id), Some(table)) => table.is_live(&id),
            _ => false,
        }
    }

    /// The pinned payload, or `None` once revoked.
    pub fn load(&self) -> Option<MediaBlob> {
        let id = self.id?;
        self.table.upgrade()?.get(&id)
    }
}

impl PartialEq for RenderableHandle {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url
    }
}

impl Eq for RenderableHandle {}

impl fmt::Debug for RenderableHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderableHandle")
            .field("url", &self.url)
            .field("mime", &self.mime)
            .finish()
    }
}

impl fmt::Display for RenderableHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}
