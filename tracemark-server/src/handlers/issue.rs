//! Watermark issuance handler
//!
//! Handles POST /watermark/issue: signs a payload for one recipient and
//! writes the forensic anchor that later verifications are judged against.

use axum::{extract::State, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracemark_core::issue_now;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::forensic::{verifier::is_plausible_email, ForensicRecord};
use crate::state::AppState;
use crate::validation::validate_identifier;

/// Issuance request
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IssueRequest {
    #[schema(example = "7d0b1f2e-doc")]
    pub document_id: String,
    #[schema(example = "alice@example.com")]
    pub recipient_email: String,
    /// Account granting access; must exist when the copy is verified
    #[schema(example = "grantor-1")]
    pub grantor_id: String,
    /// Raw device identifier to bind the copy to; hashed before storage
    #[serde(default)]
    pub device_id: Option<String>,
}

/// Issuance response
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IssueResponse {
    /// `documentId|email|timestampMs|deviceHash|signature`, ready to embed
    pub signed_payload: String,
    /// SHA-256 hex of `signedPayload`
    pub watermark_hash: String,
    pub document_id: String,
    /// Normalized (lower-cased) recipient email
    pub recipient_email: String,
    pub issued_at_ms: u64,
    /// Device hash written into the payload; empty when unbound
    pub device_hash: String,
}

/// Issue a signed watermark payload
///
/// The forensic record is written before the payload is returned. A second
/// issue for the same (document, recipient) is refused with 409.
#[utoipa::path(
    post,
    path = "/watermark/issue",
    tag = "Watermarking",
    request_body = IssueRequest,
    responses(
        (status = 200, description = "Payload issued and recorded", body = IssueResponse),
        (status = 400, description = "Invalid identifiers"),
        (status = 409, description = "Already issued for this recipient"),
        (status = 500, description = "Key or store failure")
    )
)]
pub async fn issue_handler(
    State(state): State<AppState>,
    Json(request): Json<IssueRequest>,
) -> Result<Json<IssueResponse>, ApiError> {
    validate_identifier("documentId", &request.document_id)?;
    validate_identifier("grantorId", &request.grantor_id)?;

    let email = request.recipient_email.trim().to_lowercase();
    if !is_plausible_email(&email) {
        return Err(ApiError::bad_request("recipientEmail is not a valid email"));
    }

    let device_hash = match request.device_id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => {
            validate_identifier("deviceId", id)?;
            state.device_hasher.hash_device(id)
        }
        _ => String::new(),
    };

    let key = state.keys.document_key(&request.document_id)?;
    let issued = issue_now(&request.document_id, &email, &device_hash, &key)?;

    let record = ForensicRecord {
        document_id: request.document_id.clone(),
        recipient_email: issued.payload.recipient_email.clone(),
        grantor_id: request.grantor_id.clone(),
        watermark_hash: issued.watermark_hash.clone(),
        signature: issued.signature.clone(),
        device_hash: device_hash.clone(),
        created_at: Utc::now(),
    };
    state.store.insert(&record).await?;

    tracing::info!(
        document_id = %record.document_id,
        grantor_id = %record.grantor_id,
        device_bound = !device_hash.is_empty(),
        store = state.store.backend(),
        "Forensic record written"
    );

    Ok(Json(IssueResponse {
        signed_payload: issued.signed_payload,
        watermark_hash: issued.watermark_hash,
        document_id: record.document_id,
        recipient_email: record.recipient_email,
        issued_at_ms: issued.payload.issued_at_ms,
        device_hash,
    }))
}
