//! Carrier uploads
//!
//! Both `/watermark/embed` and `/watermark/extract` take the same
//! multipart/form-data shape: a `file` part holding the carrier plus,
//! for embedding, a `signed_payload` text part.

use axum::extract::Multipart;
use tracemark_core::CarrierKind;

use crate::error::ApiError;
use crate::validation::{validate_content_type, validate_file_size};

const FILE_PART: &str = "file";
const PAYLOAD_PART: &str = "signed_payload";

/// A carrier file read from a multipart body, with its kind resolved.
#[derive(Debug)]
pub struct CarrierUpload {
    pub bytes: Vec<u8>,
    pub carrier: CarrierKind,
    /// Trimmed `signed_payload` part, when the client sent a non-empty one
    pub signed_payload: Option<String>,
}

impl CarrierUpload {
    /// Drain the multipart stream.
    ///
    /// Unknown parts are ignored. The carrier kind comes from the part's
    /// file name first and the leading bytes second.
    pub async fn read(multipart: &mut Multipart, max_file_size: usize) -> Result<Self, ApiError> {
        let mut file: Option<(Vec<u8>, Option<String>)> = None;
        let mut signed_payload = None;

        while let Some(part) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::bad_request(format!("Malformed multipart body: {}", e)))?
        {
            match part.name() {
                Some(FILE_PART) => {
                    validate_content_type(part.content_type())?;
                    let file_name = part.file_name().map(str::to_owned);
                    let bytes = part
                        .bytes()
                        .await
                        .map_err(|e| ApiError::bad_request(format!("Failed to read file: {}", e)))?;
                    validate_file_size(bytes.len(), max_file_size)?;
                    file = Some((bytes.to_vec(), file_name));
                }
                Some(PAYLOAD_PART) => {
                    let text = part.text().await.map_err(|e| {
                        ApiError::bad_request(format!("Failed to read '{}': {}", PAYLOAD_PART, e))
                    })?;
                    let text = text.trim();
                    signed_payload = (!text.is_empty()).then(|| text.to_owned());
                }
                _ => {}
            }
        }

        let (bytes, file_name) = file.ok_or_else(|| {
            ApiError::bad_request("No file provided. Use 'file' field in multipart form.")
        })?;
        let carrier = resolve_carrier(&bytes, file_name.as_deref())?;

        Ok(Self {
            bytes,
            carrier,
            signed_payload,
        })
    }

    /// Split off the signed payload, failing when it was not sent.
    pub fn require_payload(self) -> Result<(Vec<u8>, CarrierKind, String), ApiError> {
        match self.signed_payload {
            Some(payload) => Ok((self.bytes, self.carrier, payload)),
            None => Err(ApiError::bad_request(format!(
                "Missing '{}' field",
                PAYLOAD_PART
            ))),
        }
    }
}

fn resolve_carrier(bytes: &[u8], file_name: Option<&str>) -> Result<CarrierKind, ApiError> {
    CarrierKind::detect(bytes, file_name).ok_or_else(|| {
        ApiError::bad_request("Unrecognized carrier. Upload an image, text, DOCX or PDF file.")
    })
}
