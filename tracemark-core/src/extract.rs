//! Extraction and fallback coordinator.
//!
//! Mirrors the embedding paths. For images the bit-plane channel is tried
//! first and any failure there (absence, decode error, oversized image)
//! falls through to the legacy trailing-chunk search. Documents have a
//! single invisible-character channel.
//!
//! The result always names the channel that was attempted last, so callers
//! can tell an authoritative bit-plane hit from a legacy one.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::carrier::CarrierKind;
use crate::document::{self, DocumentFormat};
use crate::error::Result;
use crate::raster::{extract_bit_plane, extract_bit_plane_file, legacy, ImageStrategy};

/// Channel a payload was recovered through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// Blue-channel bit plane
    Lsb,
    /// Legacy base64 trailing chunk
    Delimiter,
    /// Invisible-character sequence
    Invisible,
}

impl std::fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lsb => write!(f, "lsb"),
            Self::Delimiter => write!(f, "delimiter"),
            Self::Invisible => write!(f, "invisible"),
        }
    }
}

/// Tagged extraction result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extraction {
    /// Recovered signed payload, if any
    pub data: Option<String>,
    pub method: ExtractionMethod,
}

impl Extraction {
    fn new(data: Option<String>, method: ExtractionMethod) -> Self {
        Self { data, method }
    }

    pub fn is_found(&self) -> bool {
        self.data.is_some()
    }

    /// Whether the hit came from a channel that survives scrutiny.
    pub fn is_authoritative(&self) -> bool {
        self.is_found() && self.method != ExtractionMethod::Delimiter
    }
}

/// Extract from encoded image bytes.
pub fn extract_image(image_bytes: &[u8], strategy: ImageStrategy) -> Extraction {
    if strategy == ImageStrategy::NativeBitPlane {
        match extract_bit_plane(image_bytes) {
            Ok(Some(data)) => return Extraction::new(Some(data), ExtractionMethod::Lsb),
            Ok(None) => tracing::debug!("No bit-plane message; trying legacy trailing chunk"),
            Err(e) => tracing::debug!(error = %e, "Bit-plane extraction failed; trying legacy trailing chunk"),
        }
    }

    let data = legacy::extract(image_bytes);
    if data.is_some() {
        tracing::warn!("Recovered legacy append watermark (non-authoritative)");
    }
    Extraction::new(data, ExtractionMethod::Delimiter)
}

/// Extract from an image file on disk.
pub fn extract_image_file(path: &Path, strategy: ImageStrategy) -> Result<Extraction> {
    if strategy == ImageStrategy::NativeBitPlane {
        match extract_bit_plane_file(path) {
            Ok(Some(data)) => return Ok(Extraction::new(Some(data), ExtractionMethod::Lsb)),
            Ok(None) => {}
            Err(e) => tracing::debug!(error = %e, path = %path.display(), "Bit-plane extraction failed"),
        }
    }

    let bytes = std::fs::read(path)?;
    Ok(Extraction::new(
        legacy::extract(&bytes),
        ExtractionMethod::Delimiter,
    ))
}

/// Extract from a document byte buffer.
pub fn extract_document(bytes: &[u8], format: DocumentFormat) -> Extraction {
    Extraction::new(
        document::extract_bytes(bytes, format),
        ExtractionMethod::Invisible,
    )
}

/// Extract from plain text already held as a string.
pub fn extract_text(text: &str) -> Extraction {
    Extraction::new(document::extract_text(text), ExtractionMethod::Invisible)
}

/// Extract from any carrier.
pub fn extract(bytes: &[u8], carrier: CarrierKind, strategy: ImageStrategy) -> Extraction {
    let extraction = match carrier {
        CarrierKind::Image => extract_image(bytes, strategy),
        CarrierKind::Document(format) => extract_document(bytes, format),
    };
    tracing::debug!(
        carrier = %carrier,
        method = %extraction.method,
        found = extraction.is_found(),
        "Extraction finished"
    );
    extraction
}

/// Extract on the blocking pool.
#[cfg(feature = "async")]
pub async fn extract_async(
    bytes: Vec<u8>,
    carrier: CarrierKind,
    strategy: ImageStrategy,
) -> Result<Extraction> {
    tokio::task::spawn_blocking(move || extract(&bytes, carrier, strategy))
        .await
        .map_err(|e| crate::error::TracemarkError::TaskJoin(e.to_string()))
}
