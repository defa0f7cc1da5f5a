//! Payload authentication and forensic hashing.
//!
//! Signatures are HMAC-SHA256 over the unsigned payload, keyed by the
//! per-document key. Signing is deterministic (no nonce), which is what
//! lets a verifier recompute and compare. The forensic hash is a plain
//! SHA-256 over the whole signed record and is never used to authenticate.

use hmac::Mac;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::{Result, TracemarkError};
use crate::keys::WatermarkKey;
use crate::payload::{parse_signed, FIELD_DELIMITER, SIGNATURE_HEX_LEN, SIGNED_FIELD_COUNT};
use crate::payload::WatermarkPayload;

/// Sign an unsigned payload, returning the lowercase hex signature.
pub fn sign(unsigned_payload: &str, key_hex: &str) -> Result<String> {
    let key = WatermarkKey::from_hex(key_hex)?;
    let mut mac = key.mac()?;
    mac.update(unsigned_payload.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Sign an unsigned payload and append the signature as the fifth field.
pub fn sign_payload(unsigned_payload: &str, key_hex: &str) -> Result<String> {
    let signature = sign(unsigned_payload, key_hex)?;
    Ok(format!("{}{}{}", unsigned_payload, FIELD_DELIMITER, signature))
}

/// SHA-256 of the full signed payload text, hex-encoded.
pub fn hash(signed_payload: &str) -> String {
    hex::encode(Sha256::digest(signed_payload.as_bytes()))
}

/// Outcome of a local signature check.
#[derive(Debug, Clone, Serialize)]
pub struct PayloadVerification {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<WatermarkPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PayloadVerification {
    fn invalid(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            payload: None,
            error: Some(error.into()),
        }
    }

    /// Convert into a `Result`, mapping failure to `SignatureMismatch`.
    pub fn into_result(self) -> Result<WatermarkPayload> {
        match (self.valid, self.payload) {
            (true, Some(payload)) => Ok(payload),
            _ => Err(TracemarkError::SignatureMismatch(
                self.error.unwrap_or_else(|| "Verification failed".into()),
            )),
        }
    }
}

/// Verify a signed payload against `key_hex`.
///
/// Never fails: every problem is reported through `valid = false` and a
/// descriptive `error`.
pub fn verify(signed_payload: Option<&str>, key_hex: &str) -> PayloadVerification {
    let text = match signed_payload {
        Some(text) if !text.is_empty() => text,
        _ => return PayloadVerification::invalid("Empty payload"),
    };

    let field_count = text.split(FIELD_DELIMITER).count();
    if field_count < SIGNED_FIELD_COUNT {
        return PayloadVerification::invalid(format!(
            "Invalid payload format: expected {} fields, found {}",
            SIGNED_FIELD_COUNT, field_count
        ));
    }

    let Some((unsigned, signature_hex)) = text.rsplit_once(FIELD_DELIMITER) else {
        return PayloadVerification::invalid("Invalid payload format: no signature field");
    };

    if signature_hex.len() != SIGNATURE_HEX_LEN {
        return PayloadVerification::invalid(format!(
            "Signature length mismatch: expected {} hex characters, found {}",
            SIGNATURE_HEX_LEN,
            signature_hex.len()
        ));
    }

    let signature = match hex::decode(signature_hex) {
        Ok(bytes) => bytes,
        Err(e) => return PayloadVerification::invalid(format!("Signature is not hex: {}", e)),
    };

    let mut mac = match WatermarkKey::from_hex(key_hex).and_then(|key| key.mac()) {
        Ok(mac) => mac,
        Err(e) => return PayloadVerification::invalid(e.to_string()),
    };
    mac.update(unsigned.as_bytes());

    if mac.verify_slice(&signature).is_err() {
        tracing::debug!("Payload signature does not match recomputed HMAC");
        return PayloadVerification::invalid("Signature mismatch");
    }

    match parse_signed(text) {
        Ok(payload) => PayloadVerification {
            valid: true,
            payload: Some(payload),
            error: None,
        },
        Err(e) => PayloadVerification::invalid(e.to_string()),
    }
}
