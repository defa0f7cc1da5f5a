//! Watermark payload record.
//!
//! A payload is a fixed-order, `|`-delimited text record:
//!
//! ```text
//! documentId|recipientEmail|issuedAtMs|deviceHash              (unsigned)
//! documentId|recipientEmail|issuedAtMs|deviceHash|signatureHex (signed)
//! ```
//!
//! The signature is always 64 lowercase hex characters (HMAC-SHA256).

use serde::{Deserialize, Serialize};

use crate::error::{Result, TracemarkError};

/// Field delimiter of the payload record.
pub const FIELD_DELIMITER: char = '|';

/// Number of fields in an unsigned payload.
pub const UNSIGNED_FIELD_COUNT: usize = 4;

/// Number of fields in a signed payload.
pub const SIGNED_FIELD_COUNT: usize = 5;

/// Length of the hex-encoded HMAC-SHA256 signature.
pub const SIGNATURE_HEX_LEN: usize = 64;

/// Placeholder written when no device binding exists.
pub const NO_DEVICE: &str = "none";

/// Structured view of a watermark payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatermarkPayload {
    pub document_id: String,
    pub recipient_email: String,
    pub issued_at_ms: u64,
    pub device_hash: String,
    /// Present only for the signed form
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl WatermarkPayload {
    /// Render the four unsigned fields.
    pub fn to_unsigned_string(&self) -> String {
        format!(
            "{}|{}|{}|{}",
            self.document_id, self.recipient_email, self.issued_at_ms, self.device_hash
        )
    }

    /// Render the full signed record, if a signature is attached.
    pub fn to_signed_string(&self) -> Option<String> {
        self.signature
            .as_ref()
            .map(|sig| format!("{}|{}", self.to_unsigned_string(), sig))
    }

    /// Whether a device binding was recorded at issuance.
    pub fn has_device_binding(&self) -> bool {
        !self.device_hash.is_empty() && self.device_hash != NO_DEVICE
    }
}

/// Build the unsigned payload string.
///
/// `recipient_email` is taken as given; callers lower-case it. An empty
/// device hash is written as [`NO_DEVICE`].
pub fn build_unsigned(
    document_id: &str,
    recipient_email: &str,
    device_hash: &str,
    now_ms: u64,
) -> Result<String> {
    if document_id.is_empty() {
        return Err(TracemarkError::Format("documentId must not be empty".into()));
    }
    if recipient_email.is_empty() {
        return Err(TracemarkError::Format(
            "recipientEmail must not be empty".into(),
        ));
    }

    let device_hash = if device_hash.is_empty() {
        NO_DEVICE
    } else {
        device_hash
    };

    for (name, value) in [
        ("documentId", document_id),
        ("recipientEmail", recipient_email),
        ("deviceHash", device_hash),
    ] {
        check_field(name, value)?;
    }

    Ok(format!(
        "{}|{}|{}|{}",
        document_id, recipient_email, now_ms, device_hash
    ))
}

/// Parse a signed payload.
///
/// Fails unless the text splits into exactly five fields and the last one is
/// a 64-digit lowercase hex signature.
pub fn parse_signed(text: &str) -> Result<WatermarkPayload> {
    let parts: Vec<&str> = text.split(FIELD_DELIMITER).collect();
    if parts.len() != SIGNED_FIELD_COUNT {
        return Err(TracemarkError::Format(format!(
            "Expected {} fields, found {}",
            SIGNED_FIELD_COUNT,
            parts.len()
        )));
    }

    let signature = parts[4];
    if !is_signature_hex(signature) {
        return Err(TracemarkError::Format(
            "Signature must be 64 lowercase hex characters".into(),
        ));
    }

    let mut payload = parse_unsigned_fields(&parts[..UNSIGNED_FIELD_COUNT])?;
    payload.signature = Some(signature.to_string());
    Ok(payload)
}

/// Parse an unsigned payload (exactly four fields).
pub fn parse_unsigned(text: &str) -> Result<WatermarkPayload> {
    let parts: Vec<&str> = text.split(FIELD_DELIMITER).collect();
    if parts.len() != UNSIGNED_FIELD_COUNT {
        return Err(TracemarkError::Format(format!(
            "Expected {} fields, found {}",
            UNSIGNED_FIELD_COUNT,
            parts.len()
        )));
    }
    parse_unsigned_fields(&parts)
}

/// Check whether `candidate` is a 64-character lowercase hex string.
pub fn is_signature_hex(candidate: &str) -> bool {
    candidate.len() == SIGNATURE_HEX_LEN
        && candidate
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// Parse a decimal millisecond timestamp. Signs and whitespace are rejected.
pub fn parse_timestamp_ms(field: &str) -> Option<u64> {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}

fn parse_unsigned_fields(parts: &[&str]) -> Result<WatermarkPayload> {
    let issued_at_ms = parse_timestamp_ms(parts[2]).ok_or_else(|| {
        TracemarkError::Format(format!("Timestamp is not an integer: {:?}", parts[2]))
    })?;

    Ok(WatermarkPayload {
        document_id: parts[0].to_string(),
        recipient_email: parts[1].to_string(),
        issued_at_ms,
        device_hash: parts[3].to_string(),
        signature: None,
    })
}

fn check_field(name: &str, value: &str) -> Result<()> {
    if value.contains(FIELD_DELIMITER) {
        return Err(TracemarkError::Format(format!(
            "{} must not contain '{}'",
            name, FIELD_DELIMITER
        )));
    }
    if value.contains('\0') {
        return Err(TracemarkError::Format(format!(
            "{} must not contain NUL",
            name
        )));
    }
    Ok(())
}
