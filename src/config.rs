//! Configuration types and validation for the notarization pipeline

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::hash_utils::HashAlgorithm;

/// Notice rendered on the appended page when a presentation carries no template.
pub const DEFAULT_NOTICE: &str = "This document was notarized by {{issuer}}, which cryptographically\n\
verifies the publisher profile and certifies this content as authentic.\n\
If you enjoyed it, the publisher has requested a donation to be\n\
distributed between the contributors listed below.\n\
Check out the verified profile at:\n\
\n\
{{profile_url}}\n\
\n\
To make a donation, send funds to the following address:\n\
\n\
{{address}}\n\
\n\
Or use the code below:";

/// Top-level configuration shared by every pipeline stage
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotaryConfig {
    pub canonical: CanonicalConfig,
    pub fingerprint: FingerprintConfig,
    pub attachment: AttachmentConfig,
    pub presentation: PresentationConfig,
    pub verification: VerificationConfig,
    pub scratch: ScratchConfig,
    pub runtime: RuntimeConfig,
}

/// Limits applied while rebuilding pages into the baseline template
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CanonicalConfig {
    pub max_depth: usize,
    pub max_pages: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FingerprintConfig {
    pub algorithm: HashAlgorithm,
}

/// Embedded proof registry settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AttachmentConfig {
    /// Changing this breaks compatibility with previously notarized documents
    pub reserved_name: String,
    pub mime_type: String,
    pub description: String,
    pub compress: bool,
    pub max_tree_nodes: usize,
}

/// Layout of the appended notice page
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PresentationConfig {
    pub font_size: u32,
    pub leading: u32,
    pub margin: u32,
    pub code_size: u32,
    pub address_pattern: String,
    pub profile_base_url: String,
    pub default_notice: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    /// JSON pointers tried in order for the fingerprint claim
    pub claim_pointers: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScratchConfig {
    pub root: Option<PathBuf>,
    pub prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub timeout_secs: u64,
    pub log_level: String,
    pub batch_workers: usize,
}

// Defaults
impl Default for CanonicalConfig {
    fn default() -> Self {
        Self {
            max_depth: 64,
            max_pages: 10_000,
        }
    }
}

impl Default for AttachmentConfig {
    fn default() -> Self {
        Self {
            reserved_name: "proof.json".into(),
            mime_type: "application/json".into(),
            description: "Notarization proof".into(),
            compress: true,
            max_tree_nodes: 4096,
        }
    }
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self {
            font_size: 12,
            leading: 14,
            margin: 50,
            code_size: 150,
            address_pattern: r"^[A-Za-z0-9:._/?=&%+-]+$".into(),
            profile_base_url: "https://profile.sourcecheck.org/".into(),
            default_notice: DEFAULT_NOTICE.into(),
        }
    }
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            claim_pointers: vec![
                "/contentFingerprint".into(),
                "/fingerprint".into(),
                "/credentialSubject/contentFingerprint".into(),
                "/credentialSubject/fingerprint".into(),
            ],
        }
    }
}

impl Default for ScratchConfig {
    fn default() -> Self {
        Self {
            root: None,
            prefix: "notary-".into(),
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            log_level: "info".into(),
            batch_workers: num_cpus::get(),
        }
    }
}

impl NotaryConfig {
    /// Loads a YAML or JSON configuration file, chosen by extension, and validates it
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let config: NotaryConfig = match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => serde_json::from_str(&text)
                .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?,
            _ => serde_yaml::from_str(&text)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.canonical.max_depth < 4 {
            return Err(Error::Config("canonical.max_depth must be at least 4".into()));
        }
        if self.canonical.max_pages == 0 {
            return Err(Error::Config("canonical.max_pages must be at least 1".into()));
        }
        let name = &self.attachment.reserved_name;
        if name.is_empty() || name.chars().any(|c| c.is_control()) {
            return Err(Error::Config("attachment.reserved_name must be printable and non-empty".into()));
        }
        if self.attachment.max_tree_nodes == 0 {
            return Err(Error::Config("attachment.max_tree_nodes must be at least 1".into()));
        }
        let p = &self.presentation;
        if p.font_size == 0 || p.font_size > 72 {
            return Err(Error::Config("presentation.font_size must be within 1..=72".into()));
        }
        if p.leading < p.font_size {
            return Err(Error::Config("presentation.leading must not be smaller than font_size".into()));
        }
        if p.code_size == 0 {
            return Err(Error::Config("presentation.code_size must be positive".into()));
        }
        regex::Regex::new(&p.address_pattern)
            .map_err(|e| Error::Config(format!("presentation.address_pattern: {}", e)))?;
        if self.verification.claim_pointers.is_empty() {
            return Err(Error::Config("verification.claim_pointers must not be empty".into()));
        }
        if let Some(bad) = self
            .verification
            .claim_pointers
            .iter()
            .find(|ptr| !ptr.starts_with('/'))
        {
            return Err(Error::Config(format!("claim pointer '{}' must start with '/'", bad)));
        }
        if self.scratch.prefix.contains(std::path::MAIN_SEPARATOR) {
            return Err(Error::Config("scratch.prefix must not contain path separators".into()));
        }
        if self.runtime.timeout_secs == 0 {
            return Err(Error::Config("runtime.timeout_secs must be positive".into()));
        }
        Ok(())
    }
}
