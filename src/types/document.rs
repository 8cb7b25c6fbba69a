use serde::{Deserialize, Serialize};

use crate::hash_utils::ContentHash;

/// Deterministic baseline of an uploaded document: page content only,
/// rebuilt on the frozen template. Only the canonicalizer creates these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDocument {
    bytes: Vec<u8>,
    page_count: usize,
    content_fingerprint: ContentHash,
}

impl RawDocument {
    pub(crate) fn new(bytes: Vec<u8>, page_count: usize, content_fingerprint: ContentHash) -> Self {
        Self {
            bytes,
            page_count,
            content_fingerprint,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    pub fn content_fingerprint(&self) -> &ContentHash {
        &self.content_fingerprint
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Raw pages plus the appended presentation page and the embedded proof
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotarizedDocument {
    bytes: Vec<u8>,
    page_count: usize,
}

impl NotarizedDocument {
    pub(crate) fn new(bytes: Vec<u8>, page_count: usize) -> Self {
        Self { bytes, page_count }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// A named blob stored in a document's attachment registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddedPayload {
    pub name: String,
    pub mime_type: String,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

impl EmbeddedPayload {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
