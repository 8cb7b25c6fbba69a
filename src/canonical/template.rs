//! Frozen baseline template every canonical document is rebuilt on.
//!
//! A freshly constructed empty document may carry generated identifiers, so
//! the template is shipped as bytes and parsed once per process.

use lazy_static::lazy_static;
use lopdf::Document;

use crate::error::{Error, Result};

/// Bump together with the template file; documents built on different
/// template versions never hash alike.
pub const TEMPLATE_VERSION: &str = "baseline-v1";

static TEMPLATE_BYTES: &[u8] = include_bytes!("../../templates/baseline-v1.pdf");

lazy_static! {
    static ref BASELINE: std::result::Result<Document, String> = parse_template();
}

fn parse_template() -> std::result::Result<Document, String> {
    let doc = Document::load_mem(TEMPLATE_BYTES).map_err(|e| e.to_string())?;
    if !doc.get_pages().is_empty() {
        return Err(format!("{} template must not contain pages", TEMPLATE_VERSION));
    }
    if doc.trailer.has(b"Info") || doc.trailer.has(b"ID") {
        return Err(format!("{} template must not carry metadata", TEMPLATE_VERSION));
    }
    Ok(doc)
}

/// A private copy of the parsed template, ready to receive pages
pub fn fresh_baseline() -> Result<Document> {
    match &*BASELINE {
        Ok(doc) => Ok(doc.clone()),
        Err(e) => Err(Error::Initialization(format!("baseline template {}: {}", TEMPLATE_VERSION, e))),
    }
}

#[cfg(test)]
pub(crate) fn template_bytes() -> &'static [u8] {
    TEMPLATE_BYTES
}
