//! Attachment registry access: reading and writing named embedded files

pub mod filters;
pub mod name_tree;
pub mod registry;
pub mod text;

use lopdf::{Document, Object};
use tracing::{debug, instrument};

use crate::config::NotaryConfig;
use crate::error::{Error, Result};
use crate::pdf_document::{load_document, lookup, lookup_dict, name_str, resolve_dict};
use crate::types::EmbeddedPayload;

pub use filters::{decode_stream, StreamFilter};
pub use name_tree::{collect_entries, embedded_files_root, find_entry, NameTreeEntry};
pub use registry::register_payload;

/// Media type reported when an embedded file declares none
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Reads named payloads out of a document's `/EmbeddedFiles` name tree
#[derive(Debug, Clone)]
pub struct ProofExtractor {
    reserved_name: String,
    max_tree_nodes: usize,
}

impl ProofExtractor {
    pub fn new(config: &NotaryConfig) -> Self {
        Self {
            reserved_name: config.attachment.reserved_name.clone(),
            max_tree_nodes: config.attachment.max_tree_nodes,
        }
    }

    pub fn reserved_name(&self) -> &str {
        &self.reserved_name
    }

    /// Extracts the payload stored under the reserved name
    pub fn extract_proof(&self, bytes: &[u8]) -> Result<EmbeddedPayload> {
        self.extract_payload(bytes, &self.reserved_name)
    }

    #[instrument(skip(self, bytes), fields(len = bytes.len()))]
    pub fn extract_payload(&self, bytes: &[u8], name: &str) -> Result<EmbeddedPayload> {
        let doc = load_document(bytes)?;
        self.extract_from(&doc, name)
    }

    pub fn extract_from(&self, doc: &Document, name: &str) -> Result<EmbeddedPayload> {
        let root = embedded_files_root(doc)
            .ok_or_else(|| Error::PayloadNotFound("document has no embedded files".into()))?;
        let filespec = find_entry(doc, root, name, self.max_tree_nodes)
            .ok_or_else(|| Error::PayloadNotFound(format!("no entry named '{}'", name)))?;
        let payload = read_filespec(doc, name, filespec)?;
        debug!("extracted '{}' ({} bytes, {})", payload.name, payload.len(), payload.mime_type);
        Ok(payload)
    }

    /// Every entry in the registry with its decoded content. Entries whose
    /// file stream is missing are skipped.
    pub fn list_payloads(&self, bytes: &[u8]) -> Result<Vec<EmbeddedPayload>> {
        let doc = load_document(bytes)?;
        let Some(root) = embedded_files_root(&doc) else {
            return Ok(Vec::new());
        };
        let mut payloads = Vec::new();
        for entry in collect_entries(&doc, root, self.max_tree_nodes) {
            match read_filespec(&doc, &entry.key, &entry.value) {
                Ok(payload) => payloads.push(payload),
                Err(Error::PayloadNotFound(reason)) => debug!("skipping '{}': {}", entry.key, reason),
                Err(e) => return Err(e),
            }
        }
        Ok(payloads)
    }
}

/// Resolves filespec -> `/EF` -> `/UF` or `/F` and decodes the stream
fn read_filespec(doc: &Document, name: &str, filespec: &Object) -> Result<EmbeddedPayload> {
    let missing = |what: &str| Error::PayloadNotFound(format!("'{}' has no {}", name, what));

    let spec = resolve_dict(doc, filespec).ok_or_else(|| missing("file specification"))?;
    let ef = lookup_dict(doc, spec, b"EF").ok_or_else(|| missing("/EF dictionary"))?;
    let stream = match lookup(doc, ef, b"UF").or_else(|| lookup(doc, ef, b"F")) {
        Some(Object::Stream(stream)) => stream,
        _ => return Err(missing("embedded file stream")),
    };

    let bytes = decode_stream(doc, stream).map_err(|e| match e {
        Error::Filter(inner) => Error::MalformedDocument(format!("'{}': {}", name, inner)),
        other => other,
    })?;
    let mime_type = stream
        .dict
        .get(b"Subtype")
        .ok()
        .and_then(name_str)
        .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string());
    Ok(EmbeddedPayload::new(name, mime_type, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::fresh_baseline;
    use crate::config::AttachmentConfig;
    use crate::pdf_document::save_document;

    fn with_payloads(payloads: &[EmbeddedPayload], compress: bool) -> Vec<u8> {
        let mut doc = fresh_baseline().unwrap();
        let config = AttachmentConfig {
            compress,
            ..AttachmentConfig::default()
        };
        for payload in payloads {
            register_payload(&mut doc, payload, &config).unwrap();
        }
        save_document(&doc).unwrap()
    }

    #[test]
    fn test_extract_reserved_payload() {
        let proof = EmbeddedPayload::new("proof.json", "application/json", br#"{"a":1}"#.to_vec());
        let other = EmbeddedPayload::new("notes.txt", "text/plain", b"hi".to_vec());
        let bytes = with_payloads(&[other, proof], true);

        let extractor = ProofExtractor::new(&NotaryConfig::default());
        let payload = extractor.extract_proof(&bytes).unwrap();
        assert_eq!(payload.bytes, br#"{"a":1}"#);
        assert_eq!(payload.mime_type, "application/json");

        let names: Vec<String> = extractor.list_payloads(&bytes).unwrap().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["notes.txt", "proof.json"]);
    }

    #[test]
    fn test_missing_registry_is_payload_not_found() {
        let bytes = with_payloads(&[], false);
        let extractor = ProofExtractor::new(&NotaryConfig::default());
        assert!(matches!(extractor.extract_proof(&bytes), Err(Error::PayloadNotFound(_))));
        assert!(extractor.list_payloads(&bytes).unwrap().is_empty());
    }

    #[test]
    fn test_other_names_do_not_match() {
        let bytes = with_payloads(&[EmbeddedPayload::new("proof.json.bak", "text/plain", vec![1])], false);
        let extractor = ProofExtractor::new(&NotaryConfig::default());
        assert!(matches!(extractor.extract_proof(&bytes), Err(Error::PayloadNotFound(_))));
    }

    #[test]
    fn test_garbage_is_malformed() {
        let extractor = ProofExtractor::new(&NotaryConfig::default());
        assert!(matches!(extractor.extract_proof(b"not a pdf"), Err(Error::MalformedDocument(_))));
    }
}
