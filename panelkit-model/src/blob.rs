use std::fmt;

use bytes::Bytes;

/// Type tag used when nothing better is known about a payload.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Immutable bytes plus their MIME-like type tag.
///
/// Cloning is cheap; the underlying buffer is shared and never mutated, so a
/// new payload for a key always means a new `MediaBlob`.
#[derive(Clone, PartialEq, Eq)]
pub struct MediaBlob {
    bytes: Bytes,
    mime: String,
}

impl MediaBlob {
    pub fn new(bytes: impl Into<Bytes>, mime: impl Into<String>) -> Self {
        let mime = mime.into();
        let mime = if mime.trim().is_empty() {
            OCTET_STREAM.to_string()
        } else {
            mime
        };
        Self {
            bytes: bytes.into(),
            mime,
        }
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for MediaBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaBlob")
            .field("mime", &self.mime)
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_mime_falls_back_to_octet_stream() {
        let blob = MediaBlob::new(vec![1u8, 2, 3], "  ");
        assert_eq!(blob.mime(), OCTET_STREAM);
        assert_eq!(blob.len(), 3);
    }

    #[test]
    fn debug_output_omits_payload() {
        let blob = MediaBlob::new(vec![0xFFu8; 64], "image/png");
        let rendered = format!("{blob:?}");
        assert!(rendered.contains("image/png"));
        assert!(rendered.contains("64"));
        assert!(!rendered.contains("255"));
    }
}
