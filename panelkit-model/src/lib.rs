//! Core data model definitions shared across panelkit crates.
//!
//! These types carry no I/O: a [`MediaReference`] names a resource, a
//! [`MediaBlob`] holds its bytes, and a [`CacheEntry`] is the durable record
//! the persistent tier keeps for it.
#![allow(missing_docs)]

pub mod blob;
pub mod entry;
pub mod error;
pub mod handle_id;
pub mod reference;

pub use blob::{MediaBlob, OCTET_STREAM};
pub use entry::{CACHE_SCHEMA_VERSION, CacheEntry, EntryHeader};
pub use error::{ModelError, Result};
pub use handle_id::HandleId;
pub use reference::{LOCAL_HANDLE_PREFIX, MediaReference};
