//! Notarization service façade
//!
//! Wires canonicalization, issuing, embedding and verification together and
//! adds the file-level workflow with a per-invocation scratch directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use lazy_static::lazy_static;
use rayon::prelude::*;
use regex::Regex;
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

use crate::canonical::Canonicalizer;
use crate::config::NotaryConfig;
use crate::embedder::ProofEmbedder;
use crate::error::{Error, Result};
use crate::issuer::Issuer;
use crate::presentation::{PaymentCodeRenderer, PresentationSpec, QrCodeRenderer};
use crate::types::{NotarizedDocument, RawDocument, VerificationResult};
use crate::utils::{move_file, read_file, write_file, ScratchSpace};
use crate::verifier::Verifier;

lazy_static! {
    static ref SLUG: Regex = Regex::new(r"^[A-Za-z0-9_-][A-Za-z0-9._-]*$").unwrap();
}

/// Output locations and documents of [`Notary::notarize_file`]
#[derive(Debug, Clone)]
pub struct NotarizedFiles {
    pub raw_path: PathBuf,
    pub notarized_path: PathBuf,
    pub raw: RawDocument,
    pub notarized: NotarizedDocument,
}

pub struct Notary {
    config: NotaryConfig,
    canonicalizer: Canonicalizer,
    embedder: ProofEmbedder,
    verifier: Verifier,
}

impl Notary {
    pub fn new(config: NotaryConfig) -> Result<Self> {
        Self::with_renderer(config, Arc::new(QrCodeRenderer::new()))
    }

    pub fn with_renderer(config: NotaryConfig, renderer: Arc<dyn PaymentCodeRenderer>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            canonicalizer: Canonicalizer::new(&config),
            embedder: ProofEmbedder::with_renderer(&config, renderer),
            verifier: Verifier::new(&config),
            config,
        })
    }

    pub fn config(&self) -> &NotaryConfig {
        &self.config
    }

    /// Canonicalizes an upload and fingerprints it
    pub fn build_raw(&self, bytes: &[u8]) -> Result<RawDocument> {
        self.canonicalizer.canonicalize(bytes)
    }

    /// Claim signed for a raw document
    pub fn claim(raw: &RawDocument, subject: &str) -> Value {
        json!({
            "id": subject,
            "contentFingerprint": raw.content_fingerprint().to_string(),
            "pageCount": raw.page_count(),
        })
    }

    /// Signs the fingerprint claim and embeds the proof. An unset `issuer`
    /// substitution is filled with the issuer's id.
    #[instrument(skip_all, fields(subject = subject))]
    pub fn notarize(
        &self,
        raw: &RawDocument,
        issuer: &dyn Issuer,
        subject: &str,
        presentation: &PresentationSpec,
    ) -> Result<NotarizedDocument> {
        let mut presentation = presentation.clone();
        presentation
            .substitutions
            .entry("issuer".to_string())
            .or_insert_with(|| issuer.id().to_string());
        presentation.validate(&self.config.presentation)?;

        let proof = issuer.sign(&Self::claim(raw, subject))?;
        self.embedder.embed(raw, &proof, &presentation)
    }

    pub fn verify(&self, bytes: &[u8]) -> VerificationResult {
        self.verifier.verify(bytes)
    }

    /// Full file workflow: `<slug>.raw.pdf` and `<slug>.pdf` are staged in a
    /// fresh scratch directory and only moved into `out_dir` once both exist.
    #[instrument(skip(self, issuer, presentation), fields(input = %input.display()))]
    pub fn notarize_file(
        &self,
        input: &Path,
        out_dir: &Path,
        slug: &str,
        issuer: &dyn Issuer,
        subject: &str,
        presentation: &PresentationSpec,
    ) -> Result<NotarizedFiles> {
        validate_slug(slug)?;
        let bytes = read_file(input)?;

        let scratch = ScratchSpace::create(&self.config.scratch)?;
        let raw_name = format!("{}.raw.pdf", slug);
        let notarized_name = format!("{}.pdf", slug);

        let raw = self.build_raw(&bytes)?;
        let staged_raw = scratch.file(&raw_name)?;
        write_file(&staged_raw, raw.bytes())?;

        let notarized = self.notarize(&raw, issuer, subject, presentation)?;
        let staged_notarized = scratch.file(&notarized_name)?;
        write_file(&staged_notarized, notarized.bytes())?;

        let raw_path = out_dir.join(&raw_name);
        let notarized_path = out_dir.join(&notarized_name);
        move_file(&staged_raw, &raw_path)?;
        if let Err(e) = move_file(&staged_notarized, &notarized_path) {
            // Never leave a raw file without its notarized sibling
            if let Err(cleanup) = std::fs::remove_file(&raw_path) {
                warn!("failed to remove {}: {}", raw_path.display(), cleanup);
            }
            return Err(e);
        }

        if let Err(e) = scratch.close() {
            warn!("scratch cleanup failed: {}", e);
        }
        info!(
            "notarized {} -> {} ({})",
            input.display(),
            notarized_path.display(),
            raw.content_fingerprint()
        );
        Ok(NotarizedFiles {
            raw_path,
            notarized_path,
            raw,
            notarized,
        })
    }

    /// Verifies every document in parallel; results keep the input order
    pub fn verify_batch(&self, documents: &[Vec<u8>]) -> Vec<VerificationResult> {
        let run = || -> Vec<VerificationResult> { documents.par_iter().map(|doc| self.verifier.verify(doc)).collect() };
        match rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.runtime.batch_workers)
            .build()
        {
            Ok(pool) => pool.install(run),
            Err(e) => {
                warn!("falling back to the global thread pool: {}", e);
                run()
            }
        }
    }
}

/// Output names: letters, digits, `.`, `_` and `-`, not starting with a dot
pub fn validate_slug(slug: &str) -> Result<()> {
    if SLUG.is_match(slug) {
        Ok(())
    } else {
        Err(Error::Config(format!("invalid output slug '{}'", slug)))
    }
}
