use std::fmt;

use thiserror::Error;

/// Why a fetch gave up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchCause {
    /// The last attempt got a non-success HTTP status.
    Status(u16),
    /// Connection, timeout or body read failure on the last attempt.
    Transport(String),
    /// The reference is not something the fetcher can request.
    UnsupportedReference(String),
}

impl fmt::Display for FetchCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchCause::Status(status) => write!(f, "HTTP status {status}"),
            FetchCause::Transport(msg) => write!(f, "transport error: {msg}"),
            FetchCause::UnsupportedReference(msg) => {
                write!(f, "unsupported reference: {msg}")
            }
        }
    }
}

/// Network failure after the retry budget is spent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("fetch of {reference} failed after {attempts} attempt(s): {cause}")]
pub struct FetchError {
    pub reference: String,
    pub attempts: u32,
    pub cause: FetchCause,
}

impl FetchError {
    pub fn new(
        reference: impl Into<String>,
        attempts: u32,
        cause: FetchCause,
    ) -> Self {
        Self {
            reference: reference.into(),
            attempts,
            cause,
        }
    }

    pub fn unsupported(reference: impl Into<String>, reason: String) -> Self {
        Self::new(reference, 0, FetchCause::UnsupportedReference(reason))
    }

    pub fn last_status(&self) -> Option<u16> {
        match self.cause {
            FetchCause::Status(status) => Some(status),
            _ => None,
        }
    }
}

/// Durable storage failure. Never reaches consumers; callers log it and treat
/// the lookup as a miss.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store backend error: {0}")]
    Backend(String),

    #[error("corrupt cache entry {key}: {reason}")]
    CorruptEntry { key: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<cacache::Error> for StoreError {
    fn from(err: cacache::Error) -> Self {
        match err {
            cacache::Error::IntegrityError(err) => StoreError::CorruptEntry {
                key: String::new(),
                reason: format!("integrity check failed: {err}"),
            },
            cacache::Error::SizeMismatch(wanted, actual) => {
                StoreError::CorruptEntry {
                    key: String::new(),
                    reason: format!(
                        "size mismatch: wanted={wanted}, actual={actual}"
                    ),
                }
            }
            cacache::Error::IoError(_, msg) => {
                StoreError::Backend(format!("cacache I/O error: {msg}"))
            }
            cacache::Error::SerdeError(_, msg) => {
                StoreError::Backend(format!("cacache serde error: {msg}"))
            }
            cacache::Error::EntryNotFound(_, key) => StoreError::Backend(
                format!("cacache entry vanished mid-read: {key}"),
            ),
        }
    }
}

/// The error surfaced to consumers of the media cache.
///
/// Always recoverable: the same reference may be resolved again later.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MediaError {
    #[error("failed to load media {reference}: {source}")]
    Fetch {
        reference: String,
        #[source]
        source: FetchError,
    },

    #[error("loading media {reference} was interrupted: {message}")]
    Interrupted { reference: String, message: String },
}

impl MediaError {
    pub fn reference(&self) -> &str {
        match self {
            MediaError::Fetch { reference, .. }
            | MediaError::Interrupted { reference, .. } => reference,
        }
    }

    pub fn fetch(source: FetchError) -> Self {
        MediaError::Fetch {
            reference: source.reference.clone(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, MediaError>;
