//! Verification state machine
//!
//! `Uploaded -> Extracted -> Reconstructed -> {Match | Tampered}`, with any
//! failure along the way ending in `Malformed`. Every transition is logged.

use std::fmt;
use std::time::Instant;

use tracing::{debug, info, instrument};

use crate::attachment::ProofExtractor;
use crate::config::NotaryConfig;
use crate::hash_utils::ContentHash;
use crate::reconstructor::Reconstructor;
use crate::types::{ProofObject, VerificationResult, Verdict};

/// Where a verification currently stands
#[derive(Debug, Clone, PartialEq)]
pub enum VerificationStage {
    Uploaded,
    Extracted {
        proof: ProofObject,
        claimed: ContentHash,
    },
    Reconstructed {
        proof: ProofObject,
        claimed: ContentHash,
        recovered: ContentHash,
    },
    Finished(VerificationResult),
}

impl VerificationStage {
    pub fn name(&self) -> &'static str {
        match self {
            VerificationStage::Uploaded => "uploaded",
            VerificationStage::Extracted { .. } => "extracted",
            VerificationStage::Reconstructed { .. } => "reconstructed",
            VerificationStage::Finished(result) => match result.verdict {
                Verdict::Match => "match",
                Verdict::Tampered => "tampered",
                Verdict::Malformed => "malformed",
            },
        }
    }
}

impl fmt::Display for VerificationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone)]
pub struct Verifier {
    extractor: ProofExtractor,
    reconstructor: Reconstructor,
    claim_pointers: Vec<String>,
}

impl Verifier {
    pub fn new(config: &NotaryConfig) -> Self {
        Self {
            extractor: ProofExtractor::new(config),
            reconstructor: Reconstructor::new(config),
            claim_pointers: config.verification.claim_pointers.clone(),
        }
    }

    /// Runs the document through every stage. Never fails: problems are
    /// reported as a `MALFORMED` verdict.
    #[instrument(skip(self, bytes), fields(len = bytes.len()))]
    pub fn verify(&self, bytes: &[u8]) -> VerificationResult {
        let started = Instant::now();
        let mut stage = VerificationStage::Uploaded;
        loop {
            let from = stage.name();
            stage = match stage {
                VerificationStage::Finished(result) => {
                    info!("verdict {} in {:?}", result.verdict, started.elapsed());
                    return result;
                }
                other => self.advance(other, bytes),
            };
            debug!("verifier {} -> {}", from, stage.name());
        }
    }

    /// Performs one transition
    pub fn advance(&self, stage: VerificationStage, bytes: &[u8]) -> VerificationStage {
        match stage {
            VerificationStage::Uploaded => self.extract(bytes),
            VerificationStage::Extracted { proof, claimed } => self.reconstruct(bytes, proof, claimed),
            VerificationStage::Reconstructed {
                proof,
                claimed,
                recovered,
            } => {
                let verdict = if recovered == claimed {
                    Verdict::Match
                } else {
                    Verdict::Tampered
                };
                VerificationStage::Finished(VerificationResult {
                    verdict,
                    proof: Some(proof),
                    claimed_fingerprint: Some(claimed.to_string()),
                    recovered_fingerprint: Some(recovered),
                    reason: None,
                })
            }
            finished @ VerificationStage::Finished(_) => finished,
        }
    }

    fn extract(&self, bytes: &[u8]) -> VerificationStage {
        let payload = match self.extractor.extract_proof(bytes) {
            Ok(payload) => payload,
            Err(e) => return malformed(e.to_string(), None, None),
        };
        let proof = match ProofObject::from_slice(&payload.bytes) {
            Ok(proof) => proof,
            Err(e) => return malformed(format!("proof is not a JSON object: {}", e), None, None),
        };
        let Some(claimed) = proof.claimed_fingerprint(&self.claim_pointers).map(str::to_string) else {
            return malformed("proof carries no fingerprint claim", Some(proof), None);
        };
        match ContentHash::parse(&claimed) {
            Ok(hash) => VerificationStage::Extracted { proof, claimed: hash },
            Err(e) => malformed(e.to_string(), Some(proof), Some(claimed)),
        }
    }

    fn reconstruct(&self, bytes: &[u8], proof: ProofObject, claimed: ContentHash) -> VerificationStage {
        match self.reconstructor.reconstruct_with(bytes, claimed.algorithm()) {
            Ok(raw) => VerificationStage::Reconstructed {
                proof,
                claimed,
                recovered: raw.content_fingerprint().clone(),
            },
            Err(e) => malformed(
                format!("reconstruction failed: {}", e),
                Some(proof),
                Some(claimed.to_string()),
            ),
        }
    }
}

fn malformed(reason: impl Into<String>, proof: Option<ProofObject>, claimed: Option<String>) -> VerificationStage {
    let mut result = VerificationResult::malformed(reason, proof);
    result.claimed_fingerprint = claimed;
    VerificationStage::Finished(result)
}
