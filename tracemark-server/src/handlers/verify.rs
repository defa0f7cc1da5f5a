//! Forensic verification handler
//!
//! Handles POST /forensic/verify requests to judge a recovered payload
//! against the stored forensic record.

use axum::{extract::rejection::JsonRejection, extract::State, Json};

use crate::forensic::{ForensicErrorCode, ForensicVerifyRequest, ForensicVerifyResponse};
use crate::state::AppState;

/// Verify a recovered payload
///
/// Always answers 200 with a structured result. `valid` is true only when
/// the payload matches a stored record byte for byte and its grantor
/// exists; `confidence` is lowered for stale copies and device mismatches.
///
/// Error codes: `missing_fields`, `malformed_payload`, `document_mismatch`,
/// `invalid_email`, `invalid_timestamp`, `record_not_found`,
/// `hash_mismatch`, `timestamp_future`, `grantor_not_found`,
/// `internal_error`.
#[utoipa::path(
    post,
    path = "/forensic/verify",
    tag = "Verification",
    request_body = ForensicVerifyRequest,
    responses(
        (status = 200, description = "Verification result", body = ForensicVerifyResponse)
    )
)]
pub async fn forensic_verify_handler(
    State(state): State<AppState>,
    request: Result<Json<ForensicVerifyRequest>, JsonRejection>,
) -> Json<ForensicVerifyResponse> {
    let request = match request {
        Ok(Json(request)) => request,
        Err(rejection) => {
            return Json(ForensicVerifyResponse::failure(
                ForensicErrorCode::MissingFields,
                format!("Unreadable request body: {}", rejection.body_text()),
            ))
        }
    };

    Json(state.verifier().verify(&request).await)
}
