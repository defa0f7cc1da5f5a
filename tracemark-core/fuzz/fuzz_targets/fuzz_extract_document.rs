#![no_main]

//! Fuzz target for carrier extraction
//!
//! Runs every document locator and the legacy trailing-chunk search over
//! arbitrary bytes. All of them are bounded and must never panic.
//!
//! Run with: cargo +nightly fuzz run fuzz_extract_document

use libfuzzer_sys::fuzz_target;
use tracemark_core::{extract_document, strip_legacy_watermark, DocumentFormat};

fuzz_target!(|data: &[u8]| {
    for format in [DocumentFormat::PlainText, DocumentFormat::Docx, DocumentFormat::Pdf] {
        let _ = extract_document(data, format);
    }

    let stripped = strip_legacy_watermark(data);
    assert!(stripped.len() <= data.len());
});
