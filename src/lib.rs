//! Main Library File for PDF Notarization
//! Canonicalizes uploads into a deterministic baseline, fingerprints them,
//! embeds signed proofs with a presentation page, and verifies notarized
//! documents against their embedded claim.

// Configuration and Core Types
pub mod config;
pub mod error;
pub mod hash_utils;
pub mod pdf_document;
pub mod pdf_writer;
pub mod types;

// Stage 1: Canonicalization
pub mod canonical;

// Stage 2: Proof Embedding
pub mod attachment;
pub mod embedder;
pub mod issuer;
pub mod presentation;

// Stage 3: Verification
pub mod reconstructor;
pub mod verifier;

// Service Façade
pub mod notary;

// Shared Utilities
pub mod utils;

// Re-exports for crate consumers
pub use attachment::ProofExtractor;
pub use canonical::Canonicalizer;
pub use config::NotaryConfig;
pub use embedder::ProofEmbedder;
pub use error::{Error, PresentationError, Result};
pub use hash_utils::{fingerprint, ContentHash, HashAlgorithm};
pub use issuer::{HmacIssuer, Issuer};
pub use notary::{NotarizedFiles, Notary};
pub use presentation::{CodeImage, DonationShare, PaymentCodeRenderer, PresentationSpec, QrCodeRenderer};
pub use reconstructor::{Reconstructor, APPENDED_PAGES};
pub use types::{EmbeddedPayload, NotarizedDocument, ProofObject, RawDocument, VerificationResult, Verdict};
pub use utils::Logger;
pub use verifier::{VerificationStage, Verifier};
