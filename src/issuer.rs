//! Proof issuers: turn a fingerprint claim into a signed proof object

use chrono::{DateTime, SecondsFormat, Utc};
use hmac::{Hmac, Mac};
use serde_json::{json, Map, Value};
use sha2::Sha256;
use tracing::debug;

use crate::error::{Error, Result};
use crate::types::ProofObject;

type HmacSha256 = Hmac<Sha256>;

pub const HMAC_PROOF_TYPE: &str = "HmacSha256Signature";

/// Signs claims on behalf of the notarization service
pub trait Issuer: Send + Sync {
    /// Identifier written into every proof
    fn id(&self) -> &str;

    fn sign(&self, claim: &Value) -> Result<ProofObject>;
}

/// Shared-secret issuer producing a credential-shaped proof
pub struct HmacIssuer {
    issuer_id: String,
    key: Vec<u8>,
    issued_at: Option<DateTime<Utc>>,
}

impl HmacIssuer {
    pub fn new(issuer_id: impl Into<String>, key: impl Into<Vec<u8>>) -> Result<Self> {
        let key = key.into();
        if key.is_empty() {
            return Err(Error::Issuer("signing key is empty".into()));
        }
        Ok(Self {
            issuer_id: issuer_id.into(),
            key,
            issued_at: None,
        })
    }

    /// Stamps every proof with `issued_at` instead of the current time
    pub fn with_fixed_time(mut self, issued_at: DateTime<Utc>) -> Self {
        self.issued_at = Some(issued_at);
        self
    }

    fn mac(&self, credential: &Map<String, Value>) -> Result<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.key).map_err(|e| Error::Issuer(e.to_string()))?;
        mac.update(&serde_json::to_vec(credential)?);
        Ok(mac)
    }

    /// Checks a proof produced by this issuer
    pub fn check(&self, proof: &ProofObject) -> Result<bool> {
        let Some(object) = proof.as_value().as_object() else {
            return Ok(false);
        };
        let mut credential = object.clone();
        let Some(signature) = credential
            .remove("proof")
            .and_then(|p| p.get("signatureValue").and_then(Value::as_str).map(str::to_string))
        else {
            return Ok(false);
        };
        let Ok(signature) = hex::decode(signature) else {
            return Ok(false);
        };
        Ok(self.mac(&credential)?.verify_slice(&signature).is_ok())
    }
}

impl Issuer for HmacIssuer {
    fn id(&self) -> &str {
        &self.issuer_id
    }

    fn sign(&self, claim: &Value) -> Result<ProofObject> {
        if !claim.is_object() {
            return Err(Error::Issuer("claim must be a JSON object".into()));
        }
        let issued_at = self.issued_at.unwrap_or_else(Utc::now);
        let mut credential = Map::new();
        credential.insert("issuer".into(), Value::String(self.issuer_id.clone()));
        credential.insert(
            "issuanceDate".into(),
            Value::String(issued_at.to_rfc3339_opts(SecondsFormat::Secs, true)),
        );
        credential.insert("credentialSubject".into(), claim.clone());

        let signature = hex::encode(self.mac(&credential)?.finalize().into_bytes());
        credential.insert(
            "proof".into(),
            json!({ "type": HMAC_PROOF_TYPE, "signatureValue": signature }),
        );
        debug!("issued proof for {}", self.issuer_id);
        ProofObject::from_value(Value::Object(credential))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn issuer() -> HmacIssuer {
        HmacIssuer::new("did:example:notary", b"secret".to_vec())
            .unwrap()
            .with_fixed_time(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap())
    }

    #[test]
    fn test_sign_shape_and_check() {
        let claim = json!({"id": "urn:pub:1", "contentFingerprint": "0xabc"});
        let proof = issuer().sign(&claim).unwrap();
        let value = proof.as_value();
        assert_eq!(value["issuer"], "did:example:notary");
        assert_eq!(value["issuanceDate"], "2024-01-02T03:04:05Z");
        assert_eq!(value["credentialSubject"], claim);
        assert_eq!(value["proof"]["type"], HMAC_PROOF_TYPE);
        assert!(issuer().check(&proof).unwrap());
        assert_eq!(proof.claimed_fingerprint(&["/credentialSubject/contentFingerprint"]), Some("0xabc"));
    }

    #[test]
    fn test_check_rejects_edits_and_other_keys() {
        let proof = issuer().sign(&json!({"contentFingerprint": "0xabc"})).unwrap();
        let mut edited = proof.clone().into_value();
        edited["credentialSubject"]["contentFingerprint"] = json!("0xdef");
        assert!(!issuer().check(&ProofObject::from_value(edited).unwrap()).unwrap());

        let other = HmacIssuer::new("did:example:notary", b"other".to_vec()).unwrap();
        assert!(!other.check(&proof).unwrap());
    }

    #[test]
    fn test_rejects_empty_key_and_non_object_claim() {
        assert!(HmacIssuer::new("x", Vec::<u8>::new()).is_err());
        assert!(issuer().sign(&json!("just a string")).is_err());
    }
}
