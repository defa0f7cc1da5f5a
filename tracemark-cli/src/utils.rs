//! Common utility functions shared across CLI commands.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{TimeZone, Utc};
use tracemark_core::{CarrierKind, DocumentFormat};

/// Read an input file, tagging failures for exit-code classification.
pub fn read_input(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("Failed to read file: {}", path.display()))
}

/// Write an output file, tagging failures for exit-code classification.
pub fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes)
        .with_context(|| format!("Failed to write output: {}", path.display()))
}

/// Carrier kind from the extension, falling back to the content.
pub fn detect_carrier(path: &Path, bytes: &[u8]) -> Result<CarrierKind> {
    CarrierKind::from_path(path)
        .or_else(|| CarrierKind::sniff(bytes))
        .with_context(|| format!("Unsupported carrier: {}", path.display()))
}

/// Default output path for a watermarked copy.
///
/// `report.pdf` becomes `report.marked.pdf`. Images always become PNG,
/// since the bit plane does not survive lossy re-encoding.
pub fn build_marked_path(file: &Path, carrier: CarrierKind) -> PathBuf {
    let ext = match carrier {
        CarrierKind::Image => "png",
        CarrierKind::Document(DocumentFormat::Docx) => "docx",
        CarrierKind::Document(DocumentFormat::Pdf) => "pdf",
        CarrierKind::Document(DocumentFormat::PlainText) => file
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("txt"),
    };
    tagged_sibling(file, "marked", ext)
}

/// Default output of `strip`: `<stem>.clean.<ext>` next to the input, which
/// keeps its bytes.
pub fn build_clean_path(file: &Path) -> PathBuf {
    let ext = file.extension().and_then(|e| e.to_str()).unwrap_or("bin");
    tagged_sibling(file, "clean", ext)
}

fn tagged_sibling(file: &Path, tag: &str, ext: &str) -> PathBuf {
    let stem = file
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    file.with_file_name(format!("{}.{}.{}", stem, tag, ext))
}

/// Format a Unix timestamp (milliseconds) as a human-readable UTC string.
pub fn format_timestamp(timestamp_ms: u64) -> String {
    let secs = (timestamp_ms / 1000) as i64;
    let nsecs = ((timestamp_ms % 1000) * 1_000_000) as u32;
    match Utc.timestamp_opt(secs, nsecs) {
        chrono::LocalResult::Single(dt) => dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        _ => format!("{}ms", timestamp_ms),
    }
}

/// Shorten a hex string for display.
pub fn short_hex(hex: &str) -> &str {
    hex.get(..16).unwrap_or(hex)
}
