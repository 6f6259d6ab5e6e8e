//! The receipt data model (spec §3) and its Ed25519 signer (spec §4.1,
//! "Signature"). Grounded on the teacher's `crypto::receipts::ReceiptData`
//! (canonicalize-then-hash-then-sign shape) and `crypto::ed25519::Ed25519Keypair`
//! (generate/sign/verify/public_key_bytes), generalized from the teacher's
//! fixed three-operation enum to the spec's richer receipt fields.

use data_encoding::BASE64;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

use crate::canonical::canonicalize;
use crate::error::{Error, Result};
use crate::hashing::sha256;

pub const RECEIPT_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Canary {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub passed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct RateInfo {
    #[serde(default)]
    pub throttle: bool,
    #[serde(default)]
    pub truncated: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Receipt {
    pub version: String,
    pub provider_pk: String,
    pub model: String,
    pub prompt_hash: String,
    pub output_hash: String,
    pub tokens_in: u64,
    pub tokens_out: u64,
    pub start_iso: String,
    pub end_iso: String,
    pub duration_ms: i64,
    pub epoch: i64,
    pub seq: u64,
    pub prev_hash: String,
    pub canary: Canary,
    pub rate: RateInfo,
    pub receipt_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SignedReceipt {
    pub receipt: Receipt,
    pub signature: String,
}

/// Fields needed to construct a receipt, before `receipt_id` is derived.
pub struct ReceiptFields {
    pub provider_pk: String,
    pub model: String,
    pub prompt_hash: String,
    pub output_hash: String,
    pub tokens_in: u64,
    pub tokens_out: u64,
    pub start: chrono::DateTime<chrono::Utc>,
    pub end: chrono::DateTime<chrono::Utc>,
    pub seq: u64,
    pub prev_hash: String,
    pub canary: Canary,
    pub rate: RateInfo,
}

impl Receipt {
    /// Build a receipt and derive its `receipt_id` (spec §4.1):
    /// `base58(sha256(canonicalize(r with receipt_id=""))[0..16])`.
    pub fn new(fields: ReceiptFields) -> Result<Self> {
        let epoch = fields.start.timestamp().div_euclid(86_400);
        let duration_ms = (fields.end - fields.start).num_milliseconds();

        let mut receipt = Receipt {
            version: RECEIPT_VERSION.to_string(),
            provider_pk: fields.provider_pk,
            model: fields.model,
            prompt_hash: fields.prompt_hash,
            output_hash: fields.output_hash,
            tokens_in: fields.tokens_in,
            tokens_out: fields.tokens_out,
            start_iso: fields.start.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            end_iso: fields.end.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            duration_ms,
            epoch,
            seq: fields.seq,
            prev_hash: fields.prev_hash,
            canary: fields.canary,
            rate: fields.rate,
            receipt_id: String::new(),
        };

        receipt.receipt_id = receipt.derive_id()?;
        Ok(receipt)
    }

    /// Recompute the id a receipt *should* have, ignoring whatever is
    /// currently in `receipt_id`. Used both to populate a fresh receipt and
    /// to verify an existing one.
    pub fn derive_id(&self) -> Result<String> {
        let mut for_hashing = self.clone();
        for_hashing.receipt_id = String::new();
        let canonical = canonicalize(&for_hashing)?;
        let digest = sha256(&canonical);
        Ok(bs58::encode(&digest[..16]).into_string())
    }

    /// Canonical encoding of the receipt as currently populated (including
    /// `receipt_id`), used both as the signing payload and the Merkle leaf.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>> {
        canonicalize(self)
    }

    pub fn chained_hash(&self) -> Result<String> {
        let canonical = self.canonical_bytes()?;
        Ok(crate::hashing::sha256_hex(&canonical))
    }
}

pub struct Ed25519Keypair {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
}

impl Ed25519Keypair {
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        let verifying_key = signing_key.verifying_key();
        Ed25519Keypair {
            signing_key,
            verifying_key,
        }
    }

    pub fn from_seed_bytes(seed: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(seed);
        let verifying_key = signing_key.verifying_key();
        Ed25519Keypair {
            signing_key,
            verifying_key,
        }
    }

    pub fn sign(&self, message: &[u8]) -> Signature {
        self.signing_key.sign(message)
    }

    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        self.verifying_key.verify(message, signature).is_ok()
    }

    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.verifying_key.to_bytes()
    }

    pub fn public_key_base64(&self) -> String {
        BASE64.encode(&self.public_key_bytes())
    }

    /// Sign a receipt's canonical encoding (with `receipt_id` populated),
    /// per spec §3 "Signature".
    pub fn sign_receipt(&self, receipt: &Receipt) -> Result<SignedReceipt> {
        let canonical = receipt.canonical_bytes()?;
        let signature = self.sign(&canonical);
        Ok(SignedReceipt {
            receipt: receipt.clone(),
            signature: BASE64.encode(&signature.to_bytes()),
        })
    }
}

/// Verify a signed receipt's signature against a base64-encoded Ed25519
/// public key. Recomputes the canonical encoding from the parsed fields,
/// per spec §3.
pub fn verify_signed_receipt(signed: &SignedReceipt, provider_pk_base64: &str) -> Result<bool> {
    let pk_bytes = BASE64
        .decode(provider_pk_base64.as_bytes())
        .map_err(|e| Error::InvalidInput(format!("invalid provider_pk base64: {e}")))?;
    let pk_array: [u8; 32] = pk_bytes
        .try_into()
        .map_err(|_| Error::InvalidInput("provider_pk must be 32 bytes".to_string()))?;
    let verifying_key = VerifyingKey::from_bytes(&pk_array)
        .map_err(|e| Error::InvalidInput(format!("invalid ed25519 public key: {e}")))?;

    let sig_bytes = BASE64
        .decode(signed.signature.as_bytes())
        .map_err(|e| Error::InvalidInput(format!("invalid signature base64: {e}")))?;
    let sig_array: [u8; 64] = sig_bytes
        .try_into()
        .map_err(|_| Error::InvalidInput("signature must be 64 bytes".to_string()))?;
    let signature = Signature::from_bytes(&sig_array);

    let canonical = signed.receipt.canonical_bytes()?;
    Ok(verifying_key.verify(&canonical, &signature).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_fields(seq: u64, prev_hash: &str) -> ReceiptFields {
        ReceiptFields {
            provider_pk: "pk123".to_string(),
            model: "llama3".to_string(),
            prompt_hash: "a".repeat(64),
            output_hash: "b".repeat(64),
            tokens_in: 10,
            tokens_out: 5,
            start: chrono::Utc.with_ymd_and_hms(2026, 7, 26, 0, 0, 0).unwrap(),
            end: chrono::Utc.with_ymd_and_hms(2026, 7, 26, 0, 0, 1).unwrap(),
            seq,
            prev_hash: prev_hash.to_string(),
            canary: Canary::default(),
            rate: RateInfo::default(),
        }
    }

    #[test]
    fn receipt_id_is_deterministic() {
        let r1 = Receipt::new(sample_fields(1, "")).unwrap();
        let r2 = Receipt::new(sample_fields(1, "")).unwrap();
        assert_eq!(r1.receipt_id, r2.receipt_id);
    }

    #[test]
    fn receipt_id_changes_with_any_field() {
        let r1 = Receipt::new(sample_fields(1, "")).unwrap();
        let r2 = Receipt::new(sample_fields(2, "")).unwrap();
        assert_ne!(r1.receipt_id, r2.receipt_id);
    }

    #[test]
    fn signing_is_deterministic() {
        let keypair = Ed25519Keypair::generate();
        let receipt = Receipt::new(sample_fields(1, "")).unwrap();
        let signed1 = keypair.sign_receipt(&receipt).unwrap();
        let signed2 = keypair.sign_receipt(&receipt).unwrap();
        assert_eq!(signed1.signature, signed2.signature);
    }

    #[test]
    fn signature_round_trips() {
        let keypair = Ed25519Keypair::generate();
        let receipt = Receipt::new(sample_fields(1, "")).unwrap();
        let signed = keypair.sign_receipt(&receipt).unwrap();
        assert!(verify_signed_receipt(&signed, &keypair.public_key_base64()).unwrap());
    }

    #[test]
    fn chain_links_match() {
        let r1 = Receipt::new(sample_fields(1, "")).unwrap();
        let expected_prev = r1.chained_hash().unwrap();
        let r2 = Receipt::new(sample_fields(2, &expected_prev)).unwrap();
        assert_eq!(r2.prev_hash, expected_prev);
        assert!(r2.seq > r1.seq);
    }
}
