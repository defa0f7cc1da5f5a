//! Watermark extraction handler

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Serialize;
use tracemark_core::extract_async;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::multipart::CarrierUpload;
use crate::state::AppState;

/// Response for extraction
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExtractResponse {
    /// Whether any payload was recovered
    pub found: bool,
    /// Recovered signed payload text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    /// Method used: "lsb", "delimiter" or "invisible"
    #[schema(example = "lsb")]
    pub method: String,
    /// False for delimiter (legacy) recoveries, which anyone can forge or strip
    pub authoritative: bool,
    #[schema(example = "image")]
    pub carrier: String,
}

/// Recover a watermark from a file
///
/// Accepts multipart/form-data with:
/// - **file** (required): The possibly-watermarked file
///
/// A file without a mark is not an error; `found` is false. Pass the
/// recovered `data` to `/forensic/verify` to judge it.
#[utoipa::path(
    post,
    path = "/watermark/extract",
    tag = "Watermarking",
    request_body(content_type = "multipart/form-data", description = "File to inspect"),
    responses(
        (status = 200, description = "Extraction attempted", body = ExtractResponse),
        (status = 400, description = "Missing file or unknown carrier")
    )
)]
pub async fn extract_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ExtractResponse>, ApiError> {
    let upload = CarrierUpload::read(&mut multipart, state.max_file_size).await?;
    let carrier = upload.carrier;

    let extraction =
        extract_async(upload.bytes, carrier, state.watermarker.image_strategy()).await?;

    tracing::debug!(
        carrier = %carrier,
        method = %extraction.method,
        found = extraction.is_found(),
        "Extraction finished"
    );

    Ok(Json(ExtractResponse {
        found: extraction.is_found(),
        authoritative: extraction.is_authoritative(),
        method: extraction.method.to_string(),
        data: extraction.data,
        carrier: carrier.to_string(),
    }))
}
