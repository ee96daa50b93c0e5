//! I/O edges of the media cache: the network fetcher and the durable store.

pub mod fetch;
pub mod store;
