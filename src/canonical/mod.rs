//! Canonicalization: rebuilds any input PDF as page content on the frozen
//! baseline template, so identical pages serialize to identical bytes.

pub mod page_copier;
pub mod template;

use lopdf::{Document, Object, ObjectId};
use tracing::{debug, info, instrument};

use crate::config::{CanonicalConfig, NotaryConfig};
use crate::error::{Error, Result};
use crate::hash_utils::{fingerprint, HashAlgorithm};
use crate::pdf_document::{load_document, page_ids, pages_root_id, save_document};
use crate::types::RawDocument;

pub use page_copier::PageCopier;
pub use template::{fresh_baseline, TEMPLATE_VERSION};

#[derive(Debug, Clone)]
pub struct Canonicalizer {
    config: CanonicalConfig,
    algorithm: HashAlgorithm,
}

impl Canonicalizer {
    pub fn new(config: &NotaryConfig) -> Self {
        Self {
            config: config.canonical.clone(),
            algorithm: config.fingerprint.algorithm,
        }
    }

    /// Same limits, different fingerprint algorithm
    pub fn with_algorithm(&self, algorithm: HashAlgorithm) -> Self {
        Self {
            config: self.config.clone(),
            algorithm,
        }
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Reduces arbitrary PDF bytes to the deterministic baseline
    #[instrument(skip(self, input), fields(input_len = input.len()))]
    pub fn canonicalize(&self, input: &[u8]) -> Result<RawDocument> {
        let source = load_document(input)?;
        let pages = page_ids(&source);
        if pages.is_empty() {
            return Err(Error::MalformedDocument("document has no pages".into()));
        }
        let raw = self.rebuild(&source, &pages)?;
        info!(
            "canonicalized {} page(s) into {} bytes, fingerprint {}",
            raw.page_count(),
            raw.bytes().len(),
            raw.content_fingerprint()
        );
        Ok(raw)
    }

    /// Copies `pages` of `source`, in order, onto a fresh template and fingerprints the result
    pub fn rebuild(&self, source: &Document, pages: &[ObjectId]) -> Result<RawDocument> {
        if pages.is_empty() {
            return Err(Error::MalformedDocument("no pages to rebuild".into()));
        }
        if pages.len() > self.config.max_pages {
            return Err(Error::MalformedDocument(format!(
                "{} pages exceeds the limit of {}",
                pages.len(),
                self.config.max_pages
            )));
        }

        let mut target = fresh_baseline()?;
        let parent = pages_root_id(&target)?;
        let mut kids = Vec::with_capacity(pages.len());
        {
            let mut copier = PageCopier::new(source, &mut target, self.config.max_depth);
            for page_id in pages {
                kids.push(Object::Reference(copier.copy_page(*page_id, parent)?));
            }
            debug!("copied {} indirect objects", copier.copied_objects());
        }

        let count = kids.len();
        match target.objects.get_mut(&parent) {
            Some(Object::Dictionary(tree)) => {
                tree.set("Kids", Object::Array(kids));
                tree.set("Count", Object::Integer(count as i64));
            }
            _ => return Err(Error::Initialization("template page tree is not a dictionary".into())),
        }

        let bytes = save_document(&target)?;
        let hash = fingerprint(&bytes, self.algorithm);
        Ok(RawDocument::new(bytes, count, hash))
    }
}
