use std::{fmt, str::FromStr};

use url::Url;

use crate::error::{ModelError, Result};

/// Prefix shared by every local, already-renderable handle URL.
pub const LOCAL_HANDLE_PREFIX: &str = "blob:";

/// A classified media reference.
///
/// Remote references are fetched and cached; local references already point at
/// an in-process handle and are handed back untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MediaReference {
    Remote(Url),
    Local(String),
}

impl MediaReference {
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ModelError::EmptyReference);
        }

        if trimmed.starts_with(LOCAL_HANDLE_PREFIX) {
            return Ok(Self::Local(trimmed.to_string()));
        }

        let url =
            Url::parse(trimmed).map_err(|err| ModelError::InvalidReference {
                reference: trimmed.to_string(),
                reason: err.to_string(),
            })?;

        match url.scheme() {
            "http" | "https" => Ok(Self::Remote(url)),
            other => Err(ModelError::UnsupportedScheme {
                reference: trimmed.to_string(),
                scheme: other.to_string(),
            }),
        }
    }

    /// Key under which both cache tiers store this reference.
    pub fn cache_key(&self) -> &str {
        match self {
            Self::Remote(url) => url.as_str(),
            Self::Local(raw) => raw,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local(_))
    }

    pub fn as_url(&self) -> Option<&Url> {
        match self {
            Self::Remote(url) => Some(url),
            Self::Local(_) => None,
        }
    }

    /// Lowercased file extension of the last path segment, if any.
    pub fn extension(&self) -> Option<String> {
        let url = self.as_url()?;
        let last = url.path_segments()?.next_back()?;
        let (stem, ext) = last.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }
}

impl FromStr for MediaReference {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for MediaReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.cache_key())
    }
}
