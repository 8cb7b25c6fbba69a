//! Presentation page inputs: the notice template, payment address, donation
//! breakdown and publisher notes, validated before any document is touched.

pub mod notice;
pub mod payment_code;

use std::collections::BTreeMap;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::PresentationConfig;
use crate::error::PresentationError;

pub use notice::{NoticeLayout, NoticeRenderer};
pub use payment_code::{CodeImage, PaymentCodeRenderer, QrCodeRenderer};

/// Longest payment address accepted
pub const MAX_ADDRESS_LEN: usize = 256;

/// One contributor's share of a donation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonationShare {
    pub label: String,
    pub percentage: u32,
}

impl DonationShare {
    pub fn new(label: impl Into<String>, percentage: u32) -> Self {
        Self {
            label: label.into(),
            percentage,
        }
    }
}

/// What goes on the appended page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresentationSpec {
    /// Template with `{{placeholder}}` slots; the configured default notice when absent
    pub notice_text: Option<String>,
    pub payment_address: String,
    pub donation_split: Option<Vec<DonationShare>>,
    pub notes: Option<String>,
    pub substitutions: BTreeMap<String, String>,
}

impl PresentationSpec {
    pub fn new(payment_address: impl Into<String>) -> Self {
        Self {
            payment_address: payment_address.into(),
            ..Self::default()
        }
    }

    pub fn with_notice(mut self, template: impl Into<String>) -> Self {
        self.notice_text = Some(template.into());
        self
    }

    pub fn with_split(mut self, split: Vec<DonationShare>) -> Self {
        self.donation_split = Some(split);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_substitution(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.substitutions.insert(key.into(), value.into());
        self
    }

    /// Checks the address and donation split. The template is checked when
    /// it is filled.
    pub fn validate(&self, config: &PresentationConfig) -> Result<(), PresentationError> {
        validate_address(&self.payment_address, &config.address_pattern)?;
        if let Some(split) = &self.donation_split {
            validate_split(split)?;
        }
        Ok(())
    }
}

fn validate_address(address: &str, pattern: &str) -> Result<(), PresentationError> {
    if address.is_empty() {
        return Err(PresentationError::InvalidAddress("address is empty".into()));
    }
    if address.chars().count() > MAX_ADDRESS_LEN {
        return Err(PresentationError::InvalidAddress(format!(
            "address is longer than {} characters",
            MAX_ADDRESS_LEN
        )));
    }
    let re = Regex::new(pattern).map_err(|e| PresentationError::InvalidAddress(e.to_string()))?;
    if !re.is_match(address) {
        return Err(PresentationError::InvalidAddress(format!(
            "'{}' does not match {}",
            address, pattern
        )));
    }
    Ok(())
}

fn validate_split(split: &[DonationShare]) -> Result<(), PresentationError> {
    let mut total = 0u32;
    for share in split {
        if share.label.trim().is_empty() {
            return Err(PresentationError::InvalidSplit("share label is empty".into()));
        }
        if share.percentage > 100 {
            return Err(PresentationError::InvalidSplit(format!(
                "{} has {}%",
                share.label, share.percentage
            )));
        }
        total += share.percentage;
    }
    if total > 100 {
        return Err(PresentationError::InvalidSplit(format!("shares add up to {}%", total)));
    }
    Ok(())
}
