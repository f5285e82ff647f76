//! Document entity with content hashing

use crate::errors::{PipelineError, Result};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::borrow::Cow;

/// A captured or transformed document
///
/// Documents are immutable once saved. Transformation always produces a new
/// document with its own id and hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Document identifier
    pub id: String,

    /// Original or derived filename
    pub filename: String,

    /// MIME content type
    pub content_type: String,

    /// Content length in bytes
    pub size: u64,

    /// Lowercase hex SHA-256 of the content
    pub content_hash: String,

    /// Raw content
    pub content: Bytes,
}

impl Document {
    /// Create a document, computing size and hash from the content
    pub fn new(
        id: impl Into<String>,
        filename: impl Into<String>,
        content_type: impl Into<String>,
        content: impl Into<Bytes>,
    ) -> Self {
        let content = content.into();
        Self {
            id: id.into(),
            filename: filename.into(),
            content_type: content_type.into(),
            size: content.len() as u64,
            content_hash: Self::compute_hash(&content),
            content,
        }
    }

    /// SHA-256 of `content` as lowercase hex
    pub fn compute_hash(content: &[u8]) -> String {
        hex::encode(Sha256::digest(content))
    }

    /// Check that the recorded size and hash match the content
    pub fn verify_integrity(&self) -> Result<()> {
        if self.size != self.content.len() as u64 {
            return Err(PipelineError::IntegrityError(format!(
                "document {} records size {} but holds {} bytes",
                self.id,
                self.size,
                self.content.len()
            )));
        }

        let actual = Self::compute_hash(&self.content);
        if actual != self.content_hash {
            return Err(PipelineError::IntegrityError(format!(
                "document {} hash mismatch: recorded {}, computed {}",
                self.id, self.content_hash, actual
            )));
        }

        Ok(())
    }

    /// Content as text, replacing invalid UTF-8
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_computes_hash_and_size() {
        let doc = Document::new("doc-1", "report.txt", "text/plain", "hello");
        assert_eq!(doc.size, 5);
        assert_eq!(
            doc.content_hash,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
        assert!(doc.verify_integrity().is_ok());
    }

    #[test]
    fn test_tampered_content_fails_integrity() {
        let mut doc = Document::new("doc-1", "report.txt", "text/plain", "hello");
        doc.content = Bytes::from_static(b"jello");

        let err = doc.verify_integrity().unwrap_err();
        assert!(matches!(err, PipelineError::IntegrityError(_)));
    }

    #[test]
    fn test_size_mismatch_fails_integrity() {
        let mut doc = Document::new("doc-1", "report.txt", "text/plain", "hello");
        doc.size = 99;
        assert!(doc.verify_integrity().is_err());
    }

    #[test]
    fn test_text_is_lossy() {
        let doc = Document::new("doc-1", "blob.bin", "application/octet-stream", vec![0x68u8, 0xff]);
        assert_eq!(doc.text(), "h\u{fffd}");
    }
}
