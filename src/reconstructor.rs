//! Rebuilds the raw document from a notarized one by dropping the appended
//! presentation page and canonicalizing what is left

use tracing::{debug, instrument};

use crate::canonical::Canonicalizer;
use crate::config::NotaryConfig;
use crate::error::{Error, Result};
use crate::hash_utils::HashAlgorithm;
use crate::pdf_document::{load_document, page_ids};
use crate::types::RawDocument;

/// Pages the embedder appends after the raw pages
pub const APPENDED_PAGES: usize = 1;

#[derive(Debug, Clone)]
pub struct Reconstructor {
    canonicalizer: Canonicalizer,
}

impl Reconstructor {
    pub fn new(config: &NotaryConfig) -> Self {
        Self {
            canonicalizer: Canonicalizer::new(config),
        }
    }

    pub fn reconstruct(&self, notarized: &[u8]) -> Result<RawDocument> {
        self.reconstruct_with(notarized, self.canonicalizer.algorithm())
    }

    /// Reconstructs and fingerprints with `algorithm`
    #[instrument(skip(self, notarized), fields(len = notarized.len()))]
    pub fn reconstruct_with(&self, notarized: &[u8], algorithm: HashAlgorithm) -> Result<RawDocument> {
        let doc = load_document(notarized)?;
        let pages = page_ids(&doc);
        if pages.len() <= APPENDED_PAGES {
            return Err(Error::MalformedDocument(format!(
                "{} page(s) cannot hold raw content plus {} appended page(s)",
                pages.len(),
                APPENDED_PAGES
            )));
        }
        let kept = &pages[..pages.len() - APPENDED_PAGES];
        debug!("reconstructing from {} of {} pages", kept.len(), pages.len());
        self.canonicalizer.with_algorithm(algorithm).rebuild(&doc, kept)
    }
}
