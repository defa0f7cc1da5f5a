//! Input checks shared by the handlers

use crate::error::ApiError;

/// Upload Content-Types a carrier may arrive with. Matched as prefixes so
/// parameters such as `; charset=utf-8` pass.
const CARRIER_MIME_PREFIXES: &[&str] = &[
    "image/",
    "text/",
    "application/pdf",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/octet-stream",
];

/// Longest accepted identifier (document or grantor id)
pub const MAX_IDENTIFIER_LEN: usize = 256;

/// Reject uploads declaring a type no carrier can have. A missing header
/// is treated as binary and left for sniffing.
pub fn validate_content_type(content_type: Option<&str>) -> Result<(), ApiError> {
    let Some(declared) = content_type else {
        return Ok(());
    };
    let lower = declared.to_ascii_lowercase();
    if CARRIER_MIME_PREFIXES.iter().any(|p| lower.starts_with(p)) {
        return Ok(());
    }
    Err(ApiError::bad_request(format!(
        "Unsupported Content-Type '{}': expected an image, text, PDF or DOCX upload",
        declared
    )))
}

pub fn validate_file_size(size: usize, max_size: usize) -> Result<(), ApiError> {
    if size <= max_size {
        return Ok(());
    }
    Err(ApiError::bad_request(format!(
        "File too large: {} bytes exceeds the {} byte limit",
        size, max_size
    )))
}

/// Identifiers end up inside the `|`-delimited payload, so the delimiter
/// and control characters are refused.
pub fn validate_identifier(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::bad_request(format!("{} is required", field)));
    }
    if value.len() > MAX_IDENTIFIER_LEN {
        return Err(ApiError::bad_request(format!(
            "{} exceeds {} characters",
            field, MAX_IDENTIFIER_LEN
        )));
    }
    if value.contains('|') || value.chars().any(char::is_control) {
        return Err(ApiError::bad_request(format!(
            "{} contains forbidden characters",
            field
        )));
    }
    Ok(())
}
