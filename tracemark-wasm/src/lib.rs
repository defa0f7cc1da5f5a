//! WebAssembly bindings for Tracemark.
//!
//! Lets a browser check a payload signature and pull a watermark out of a
//! text, DOCX or PDF file without uploading it. Image extraction here only
//! sees legacy trailing chunks; bit-plane marks need the native build.

use serde::Serialize;
use tracemark_core::{
    extract, hash, is_valid_wrapped_message, verify, CarrierKind, ExtractionMethod, ImageStrategy,
};
use wasm_bindgen::prelude::*;

/// Initialize panic hook for better error messages in browser console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Result of a local signature check.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadCheck {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient_email: Option<String>,
    /// Issue time (ISO 8601)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_hash: Option<String>,
    /// SHA-256 of the payload, as stored server-side
    pub watermark_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of extraction.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractResult {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<ExtractionMethod>,
    pub authoritative: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub carrier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Verify a signed payload against a hex key.
///
/// # Returns
/// A JSON string containing a [`PayloadCheck`]
#[wasm_bindgen]
pub fn verify_payload_wasm(signed_payload: &str, key_hex: &str) -> String {
    let signed_payload = signed_payload.trim();
    let result = verify(Some(signed_payload), key_hex);
    let payload = result.payload;

    let check = PayloadCheck {
        valid: result.valid,
        issued_at: payload.as_ref().map(|p| format_timestamp(p.issued_at_ms)),
        document_id: payload.as_ref().map(|p| p.document_id.clone()),
        recipient_email: payload.as_ref().map(|p| p.recipient_email.clone()),
        device_hash: payload.map(|p| p.device_hash),
        watermark_hash: hash(signed_payload),
        error: result.error,
    };
    to_json(&check)
}

/// Extract a watermark from file bytes.
///
/// # Arguments
/// * `file_bytes` - The file content
/// * `file_name` - Optional name used to pick the carrier before sniffing
///
/// # Returns
/// A JSON string containing an [`ExtractResult`]
#[wasm_bindgen]
pub fn extract_wasm(file_bytes: &[u8], file_name: Option<String>) -> String {
    let Some(carrier) = CarrierKind::detect(file_bytes, file_name.as_deref()) else {
        return to_json(&ExtractResult {
            found: false,
            data: None,
            method: None,
            authoritative: false,
            carrier: None,
            error: Some("Unrecognized carrier".into()),
        });
    };

    let extraction = extract(file_bytes, carrier, ImageStrategy::detect());
    to_json(&ExtractResult {
        found: extraction.is_found(),
        authoritative: extraction.is_authoritative(),
        method: Some(extraction.method),
        data: extraction.data,
        carrier: Some(carrier.to_string()),
        error: None,
    })
}

/// Whether `message` holds a START sentinel followed by an END sentinel.
#[wasm_bindgen]
pub fn is_valid_wrapped_message_wasm(message: &str) -> bool {
    is_valid_wrapped_message(Some(message))
}

/// SHA-256 hex of a signed payload.
#[wasm_bindgen]
pub fn watermark_hash_wasm(signed_payload: &str) -> String {
    hash(signed_payload.trim())
}

/// Get the library version.
#[wasm_bindgen]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| {
        format!(r#"{{"valid":false,"error":"Serialization error: {}"}}"#, e)
    })
}

fn format_timestamp(timestamp_ms: u64) -> String {
    use chrono::{TimeZone, Utc};
    let secs = (timestamp_ms / 1000) as i64;
    let nsecs = ((timestamp_ms % 1000) * 1_000_000) as u32;
    match Utc.timestamp_opt(secs, nsecs) {
        chrono::LocalResult::Single(dt) => dt.to_rfc3339(),
        _ => format!("{}ms", timestamp_ms),
    }
}
