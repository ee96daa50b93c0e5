use std::time::Duration;

use async_trait::async_trait;
use panelkit_model::{MediaBlob, MediaReference};
use reqwest::header::{ACCEPT, CACHE_CONTROL, CONTENT_TYPE};
use tracing::debug;
use url::Url;

use super::{
    Fetcher,
    retry::{Attempt, GaveUp, RetryPolicy, with_backoff},
    sniff::{declared_mime, sniff_mime},
};
use crate::error::{FetchCause, FetchError};

const MEDIA_ACCEPT: &str = "image/*, video/*, application/octet-stream";
// Let an intermediate cache answer even if its copy is past freshness.
const UPSTREAM_CACHE_HINT: &str = "max-stale";

/// Network fetcher for remote media.
///
/// Requests carry no cookies or credentials: the client is built without a
/// cookie store and no auth headers are ever attached.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl HttpFetcher {
    pub fn new(
        retry: RetryPolicy,
        request_timeout: Duration,
    ) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .user_agent(concat!("panelkit/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(client, retry))
    }

    pub fn with_client(client: reqwest::Client, retry: RetryPolicy) -> Self {
        Self { client, retry }
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    async fn fetch_once(
        &self,
        url: &Url,
        reference: &MediaReference,
    ) -> Result<MediaBlob, Attempt<FetchCause>> {
        let response = self
            .client
            .get(url.clone())
            .header(ACCEPT, MEDIA_ACCEPT)
            .header(CACHE_CONTROL, UPSTREAM_CACHE_HINT)
            .send()
            .await
            .map_err(classify_send_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(Attempt::Transient(FetchCause::Status(
                status.as_u16(),
            )));
        }

        let declared = declared_mime(
            response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|value| value.to_str().ok()),
        );
        let expected_len = response.content_length();
        let bytes = response.bytes().await.map_err(|e| {
            Attempt::Transient(FetchCause::Transport(format!(
                "failed reading body: {e}"
            )))
        })?;

        if let Some(content_len) = expected_len
            && bytes.len() as u64 != content_len
        {
            return Err(Attempt::Transient(FetchCause::Transport(format!(
                "body size mismatch: got {} bytes, expected {}",
                bytes.len(),
                content_len
            ))));
        }

        let mime = declared.unwrap_or_else(|| sniff_mime(&bytes, reference));
        debug!(
            reference = %reference,
            bytes = bytes.len(),
            %mime,
            "fetched media"
        );
        Ok(MediaBlob::new(bytes, mime))
    }
}

/// Redirect loops and malformed requests fail the same way on every attempt.
fn classify_send_error(err: reqwest::Error) -> Attempt<FetchCause> {
    let cause = FetchCause::Transport(err.to_string());
    if err.is_redirect() || err.is_builder() {
        Attempt::Permanent(cause)
    } else {
        Attempt::Transient(cause)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(
        &self,
        reference: &MediaReference,
    ) -> Result<MediaBlob, FetchError> {
        let Some(url) = reference.as_url() else {
            return Err(FetchError::unsupported(
                reference.cache_key(),
                "local handles are never fetched".to_string(),
            ));
        };

        with_backoff(&self.retry, "media_fetch", |_| {
            self.fetch_once(url, reference)
        })
        .await
        .map_err(|GaveUp { last, attempts }| {
            FetchError::new(reference.cache_key(), attempts, last)
        })
    }
}
