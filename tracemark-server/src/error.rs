//! API errors
//!
//! Every failing handler returns [`ApiError`]. The response body is
//! `{"error": <client message>, "code": <STABLE_CODE>}`; internal details
//! only reach the log.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracemark_core::TracemarkError;

use crate::forensic::ForensicStoreError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The client sent something unusable
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// A required dependency is not configured
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Watermark error: {0}")]
    Watermark(#[from] TracemarkError),

    #[error("Store error: {0}")]
    Store(#[from] ForensicStoreError),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable(message.into())
    }

    /// HTTP status and stable machine-readable code.
    fn classify(&self) -> (StatusCode, &'static str) {
        match self {
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
            Self::ServiceUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE"),
            Self::Watermark(e) => match e {
                TracemarkError::Format(_) => (StatusCode::BAD_REQUEST, "INVALID_PAYLOAD"),
                TracemarkError::ImageCodec(_) => (StatusCode::BAD_REQUEST, "UNSUPPORTED_IMAGE"),
                TracemarkError::SignatureMismatch(_) => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "SIGNATURE_MISMATCH")
                }
                TracemarkError::CapacityExceeded { .. } => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "CAPACITY_EXCEEDED")
                }
                TracemarkError::InsertionPointNotFound { .. } => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "INSERTION_POINT_NOT_FOUND")
                }
                TracemarkError::ImageTooLarge { .. } => {
                    (StatusCode::PAYLOAD_TOO_LARGE, "IMAGE_TOO_LARGE")
                }
                TracemarkError::NativeUnavailable => {
                    (StatusCode::SERVICE_UNAVAILABLE, "NATIVE_UNAVAILABLE")
                }
                TracemarkError::Key(_) => (StatusCode::INTERNAL_SERVER_ERROR, "KEY_ERROR"),
                TracemarkError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
                TracemarkError::TaskJoin(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            },
            Self::Store(e) => match e {
                ForensicStoreError::Conflict { .. } => (StatusCode::CONFLICT, "RECORD_EXISTS"),
                ForensicStoreError::Connection(_) | ForensicStoreError::Migration(_) => {
                    (StatusCode::SERVICE_UNAVAILABLE, "STORE_UNAVAILABLE")
                }
                ForensicStoreError::Query(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORE_ERROR"),
            },
        }
    }

    pub fn status_code(&self) -> StatusCode {
        self.classify().0
    }

    /// Message safe to show a client. Key material, paths and store
    /// internals are never included.
    fn client_message(&self) -> String {
        match self {
            Self::BadRequest(msg) | Self::ServiceUnavailable(msg) => msg.clone(),
            Self::Watermark(e) => match e {
                TracemarkError::Format(msg) => format!("Invalid payload: {}", msg),
                TracemarkError::SignatureMismatch(_) => "Signature verification failed".into(),
                TracemarkError::CapacityExceeded {
                    required_bits,
                    available_bits,
                } => format!(
                    "Image too small for watermark: needs {} pixels, has {}",
                    required_bits, available_bits
                ),
                TracemarkError::InsertionPointNotFound { format } => {
                    format!("No watermark insertion point found in {} file", format)
                }
                TracemarkError::ImageTooLarge { width, height, max } => {
                    format!("Image {}x{} exceeds the {}px limit", width, height, max)
                }
                TracemarkError::ImageCodec(_) => "Unsupported or corrupt image".into(),
                TracemarkError::NativeUnavailable => {
                    "Authoritative image watermarking is unavailable".into()
                }
                TracemarkError::Key(_) => "Key configuration error".into(),
                TracemarkError::Io(_) | TracemarkError::TaskJoin(_) => {
                    "Internal processing error".into()
                }
            },
            Self::Store(ForensicStoreError::Conflict { .. }) => {
                "A watermark was already issued to this recipient".into()
            }
            Self::Store(_) => "Forensic store error".into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.classify();
        let body = ErrorBody {
            error: self.client_message(),
            code,
        };

        if status.is_server_error() {
            tracing::error!(status = %status, code, error = %self, "Request failed");
        } else {
            tracing::warn!(status = %status, code, error = %self, "Request rejected");
        }

        (status, Json(body)).into_response()
    }
}
