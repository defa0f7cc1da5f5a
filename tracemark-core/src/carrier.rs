//! Carrier kind detection.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::document::DocumentFormat;

const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";
const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];
const GIF_MAGIC: &[u8] = b"GIF8";

/// The kind of artifact a watermark travels in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CarrierKind {
    Image,
    Document(DocumentFormat),
}

impl CarrierKind {
    /// Detect from leading magic bytes.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if is_image(bytes) {
            Some(Self::Image)
        } else {
            DocumentFormat::sniff(bytes).map(Self::Document)
        }
    }

    /// Detect from a file name's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "png" | "jpg" | "jpeg" | "gif" | "webp" => Some(Self::Image),
            other => DocumentFormat::from_extension(other).map(Self::Document),
        }
    }

    /// Prefer the file name when one is given, otherwise sniff the bytes.
    pub fn detect(bytes: &[u8], file_name: Option<&str>) -> Option<Self> {
        file_name
            .and_then(|name| Self::from_path(Path::new(name)))
            .or_else(|| Self::sniff(bytes))
    }

    pub fn is_image(&self) -> bool {
        matches!(self, Self::Image)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Document(format) => format.as_str(),
        }
    }
}

impl std::fmt::Display for CarrierKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn is_image(bytes: &[u8]) -> bool {
    bytes.starts_with(PNG_MAGIC)
        || bytes.starts_with(JPEG_MAGIC)
        || bytes.starts_with(GIF_MAGIC)
        || (bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff() {
        assert_eq!(CarrierKind::sniff(PNG_MAGIC), Some(CarrierKind::Image));
        assert_eq!(CarrierKind::sniff(&[0xFF, 0xD8, 0xFF, 0xE0]), Some(CarrierKind::Image));
        assert_eq!(CarrierKind::sniff(b"RIFF\0\0\0\0WEBPVP8 "), Some(CarrierKind::Image));
        assert_eq!(
            CarrierKind::sniff(b"%PDF-1.7"),
            Some(CarrierKind::Document(DocumentFormat::Pdf))
        );
        assert_eq!(
            CarrierKind::sniff(b"just words"),
            Some(CarrierKind::Document(DocumentFormat::PlainText))
        );
    }

    #[test]
    fn test_name_takes_precedence() {
        assert_eq!(
            CarrierKind::detect(b"%PDF-1.7", Some("photo.JPG")),
            Some(CarrierKind::Image)
        );
        assert_eq!(
            CarrierKind::detect(b"%PDF-1.7", Some("unknown.bin")),
            Some(CarrierKind::Document(DocumentFormat::Pdf))
        );
        assert_eq!(CarrierKind::detect(&[0x00, 0xFF, 0xFE], None), None);
    }

    #[test]
    fn test_as_str() {
        assert_eq!(CarrierKind::Image.as_str(), "image");
        assert_eq!(CarrierKind::Document(DocumentFormat::Docx).to_string(), "docx");
    }
}
