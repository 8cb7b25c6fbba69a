use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::hash_utils::ContentHash;

/// Externally signed claim. Opaque to the pipeline apart from being a JSON
/// object that carries a fingerprint claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProofObject(Value);

impl ProofObject {
    pub fn from_value(value: Value) -> Result<Self> {
        if !value.is_object() {
            return Err(Error::Serialization("proof object must be a JSON object".into()));
        }
        Ok(Self(value))
    }

    /// Parses UTF-8 JSON bytes; invalid UTF-8 sequences are rejected
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Self::from_value(serde_json::from_slice(bytes)?)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&self.0)?)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    /// First string found at any of `pointers`
    pub fn claimed_fingerprint<S: AsRef<str>>(&self, pointers: &[S]) -> Option<&str> {
        pointers
            .iter()
            .filter_map(|ptr| self.0.pointer(ptr.as_ref()))
            .find_map(Value::as_str)
    }
}

/// Outcome of a verification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Match,
    Tampered,
    Malformed,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Verdict::Match => "MATCH",
            Verdict::Tampered => "TAMPERED",
            Verdict::Malformed => "MALFORMED",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub verdict: Verdict,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proof: Option<ProofObject>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claimed_fingerprint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recovered_fingerprint: Option<ContentHash>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl VerificationResult {
    pub fn malformed(reason: impl Into<String>, proof: Option<ProofObject>) -> Self {
        Self {
            verdict: Verdict::Malformed,
            proof,
            claimed_fingerprint: None,
            recovered_fingerprint: None,
            reason: Some(reason.into()),
        }
    }

    pub fn is_match(&self) -> bool {
        self.verdict == Verdict::Match
    }
}
