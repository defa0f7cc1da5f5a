//! Watermark embedding handler
//!
//! Handles POST /watermark/embed requests to write a signed payload into an
//! uploaded image or document.

use axum::{
    extract::{Multipart, State},
    Json,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::Serialize;
use tracemark_core::{parse_signed, verify};
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::multipart::CarrierUpload;
use crate::state::AppState;

/// Response for a successful embed
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmbedResponse {
    /// Base64-encoded watermarked file
    pub file: String,
    /// Carrier the file was treated as: "image", "plain_text", "docx", "pdf"
    #[schema(example = "image")]
    pub carrier: String,
    /// Image strategy used; absent for documents
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "bit-plane")]
    pub image_strategy: Option<String>,
    /// False when the output carries only a legacy (strippable) mark
    pub authoritative: bool,
    /// Size of the watermarked file in bytes
    pub size: usize,
}

/// Embed a signed payload into a file
///
/// Accepts multipart/form-data with:
/// - **file** (required): Image (PNG, JPEG, GIF, WebP), text, DOCX or PDF
/// - **signed_payload** (required): Payload returned by `/watermark/issue`
///
/// The payload signature is checked against the document key before
/// anything is written. Image output is always PNG.
#[utoipa::path(
    post,
    path = "/watermark/embed",
    tag = "Watermarking",
    request_body(
        content_type = "multipart/form-data",
        description = "Carrier file and signed payload"
    ),
    responses(
        (status = 200, description = "Watermarked file", body = EmbedResponse),
        (status = 400, description = "Missing field, unknown carrier or bad payload"),
        (status = 413, description = "Image dimensions too large"),
        (status = 422, description = "Signature mismatch or carrier cannot hold the mark"),
        (status = 503, description = "Bit-plane embedding unavailable and legacy disallowed")
    )
)]
pub async fn embed_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<EmbedResponse>, ApiError> {
    let (bytes, carrier, signed_payload) = CarrierUpload::read(&mut multipart, state.max_file_size)
        .await?
        .require_payload()?;

    let payload = parse_signed(&signed_payload)?;
    let key = state.keys.document_key(&payload.document_id)?;
    verify(Some(&signed_payload), &key).into_result()?;

    let artifact = state
        .watermarker
        .embed_async(bytes, carrier, signed_payload)
        .await?;

    tracing::info!(
        document_id = %payload.document_id,
        carrier = %artifact.carrier,
        authoritative = artifact.is_authoritative(),
        size = artifact.bytes.len(),
        "Watermark embedded"
    );

    Ok(Json(EmbedResponse {
        size: artifact.bytes.len(),
        authoritative: artifact.is_authoritative(),
        image_strategy: artifact.image_strategy.map(|s| s.to_string()),
        carrier: artifact.carrier.to_string(),
        file: BASE64.encode(&artifact.bytes),
    }))
}
