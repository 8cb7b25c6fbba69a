//! Content fingerprinting over canonical document bytes
//! Provides prefixed hex digests used as the tamper-evidence anchor

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tiny_keccak::{Hasher, Keccak};

use crate::error::{Error, Result};

/// Supported hash algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Keccak256,
    Sha256,
    Blake3,
}

impl HashAlgorithm {
    /// Prefix that identifies the algorithm in a rendered fingerprint
    pub fn prefix(&self) -> &'static str {
        match self {
            HashAlgorithm::Keccak256 => "0x",
            HashAlgorithm::Sha256 => "sha256:",
            HashAlgorithm::Blake3 => "blake3:",
        }
    }

    /// Length of the hex-encoded digest
    pub fn hex_len(&self) -> usize {
        64
    }

    fn digest(&self, data: &[u8]) -> [u8; 32] {
        match self {
            HashAlgorithm::Keccak256 => {
                let mut keccak = Keccak::v256();
                keccak.update(data);
                let mut out = [0u8; 32];
                keccak.finalize(&mut out);
                out
            }
            HashAlgorithm::Sha256 => {
                let mut hasher = Sha256::new();
                hasher.update(data);
                let mut out = [0u8; 32];
                out.copy_from_slice(&hasher.finalize());
                out
            }
            HashAlgorithm::Blake3 => *blake3::hash(data).as_bytes(),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HashAlgorithm::Keccak256 => "keccak256",
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Blake3 => "blake3",
        };
        write!(f, "{}", name)
    }
}

/// Fingerprint of a byte sequence, rendered as `<prefix><lowercase hex>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentHash {
    algorithm: HashAlgorithm,
    digest: String,
}

impl ContentHash {
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Hex digest without prefix
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// Parses a prefixed fingerprint; the prefix selects the algorithm
    pub fn parse(value: &str) -> Result<Self> {
        let value = value.trim();
        // Longest prefixes first so "0x" never shadows a named prefix
        let algorithms = [HashAlgorithm::Sha256, HashAlgorithm::Blake3, HashAlgorithm::Keccak256];
        for algorithm in algorithms {
            let prefix = algorithm.prefix();
            let Some(head) = value.get(..prefix.len()) else { continue };
            if !head.eq_ignore_ascii_case(prefix) {
                continue;
            }
            let digest = &value[prefix.len()..];
            if digest.len() != algorithm.hex_len() || hex::decode(digest).is_err() {
                return Err(Error::MalformedDocument(format!(
                    "fingerprint '{}' is not a {} digest",
                    value, algorithm
                )));
            }
            return Ok(Self { algorithm, digest: digest.to_ascii_lowercase() });
        }
        Err(Error::MalformedDocument(format!("unrecognized fingerprint prefix in '{}'", value)))
    }

    /// Recomputes the digest of `data` with this hash's algorithm and compares
    pub fn matches(&self, data: &[u8]) -> bool {
        fingerprint(data, self.algorithm) == *self
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.algorithm.prefix(), self.digest)
    }
}

impl FromStr for ContentHash {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ContentHash::parse(s)
    }
}

impl TryFrom<String> for ContentHash {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        ContentHash::parse(&value)
    }
}

impl From<ContentHash> for String {
    fn from(hash: ContentHash) -> Self {
        hash.to_string()
    }
}

/// Hashes a byte slice
pub fn fingerprint(data: &[u8], algorithm: HashAlgorithm) -> ContentHash {
    ContentHash {
        algorithm,
        digest: hex::encode(algorithm.digest(data)),
    }
}

/// Hashes using the default algorithm (Keccak-256)
pub fn fingerprint_default(data: &[u8]) -> ContentHash {
    fingerprint(data, HashAlgorithm::default())
}
