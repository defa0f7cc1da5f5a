//! Document embedding engine.
//!
//! Encodes the signed payload as invisible characters and places it at a
//! format-specific insertion point:
//!
//! | Format     | Insertion point                               |
//! |------------|-----------------------------------------------|
//! | Plain text | appended to the end                           |
//! | DOCX (zip) | before the first raw `</w:body>`              |
//! | PDF        | comment line before the last `%%EOF`          |
//!
//! A missing insertion point is reported as
//! [`TracemarkError::InsertionPointNotFound`] instead of returning the
//! input unchanged, so no caller can mistake an unmarked file for a marked
//! one.

pub mod formats;
pub mod invisible;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TracemarkError};

/// Supported document families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    PlainText,
    Docx,
    Pdf,
}

impl DocumentFormat {
    /// Map a file extension (without the dot, any case).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "txt" | "text" | "md" | "csv" | "log" => Some(Self::PlainText),
            "docx" => Some(Self::Docx),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    /// Map a path by its extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Detect from leading magic bytes; valid UTF-8 falls back to plain text.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"%PDF-") {
            Some(Self::Pdf)
        } else if bytes.starts_with(b"PK\x03\x04") {
            Some(Self::Docx)
        } else if std::str::from_utf8(bytes).is_ok() {
            Some(Self::PlainText)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PlainText => "plain_text",
            Self::Docx => "docx",
            Self::Pdf => "pdf",
        }
    }
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Embed into a string of plain text.
pub fn embed_text(text: &str, signed_payload: &str) -> String {
    formats::append_plain_text(text, &invisible::encode(signed_payload))
}

/// Embed into a document byte buffer.
pub fn embed_bytes(bytes: &[u8], format: DocumentFormat, signed_payload: &str) -> Result<Vec<u8>> {
    let sequence = invisible::encode(signed_payload);

    let out = match format {
        DocumentFormat::PlainText => {
            let text = std::str::from_utf8(bytes).map_err(|e| {
                TracemarkError::Format(format!("Plain-text carrier is not UTF-8: {}", e))
            })?;
            Some(formats::append_plain_text(text, &sequence).into_bytes())
        }
        DocumentFormat::Docx => formats::insert_docx(bytes, &sequence),
        DocumentFormat::Pdf => formats::insert_pdf(bytes, &sequence),
    };

    match out {
        Some(bytes) => {
            tracing::debug!(format = %format, bytes = bytes.len(), "Embedded invisible sequence");
            Ok(bytes)
        }
        None => {
            tracing::warn!(format = %format, "No insertion point found in document");
            Err(TracemarkError::InsertionPointNotFound {
                format: format.as_str(),
            })
        }
    }
}

/// Recover the signed payload from plain text.
pub fn extract_text(text: &str) -> Option<String> {
    formats::locate_plain_text(text)
}

/// Recover the signed payload from a document byte buffer.
pub fn extract_bytes(bytes: &[u8], format: DocumentFormat) -> Option<String> {
    match format {
        DocumentFormat::PlainText => std::str::from_utf8(bytes)
            .ok()
            .and_then(formats::locate_plain_text),
        DocumentFormat::Docx => formats::locate_docx(bytes),
        DocumentFormat::Pdf => formats::locate_pdf(bytes),
    }
}
