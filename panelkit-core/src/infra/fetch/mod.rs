//! Binary fetcher: turns a remote reference into bytes.

pub mod http;
pub mod retry;
pub mod sniff;

pub use http::HttpFetcher;
pub use retry::{Attempt, GaveUp, RetryPolicy, with_backoff};

use std::fmt;

use async_trait::async_trait;
use panelkit_model::{MediaBlob, MediaReference};

use crate::error::FetchError;

/// Source of raw bytes for remote references.
///
/// Implementations own their retry behaviour and never write to any cache
/// tier; a returned error means the reference is unavailable right now.
#[async_trait]
pub trait Fetcher: Send + Sync + fmt::Debug {
    async fn fetch(
        &self,
        reference: &MediaReference,
    ) -> Result<MediaBlob, FetchError>;
}
