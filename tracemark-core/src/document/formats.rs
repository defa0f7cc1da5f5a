//! Format-aware insertion points.
//!
//! Insertion functions return `None` when the format's insertion point is
//! missing and leave the input untouched; callers decide whether that is an
//! error.

use crate::codec::{find_subslice, rfind_subslice};

use super::invisible::{anchor_bytes, decode_run, find_and_decode};

/// Body-close tag of a word-processor XML part.
pub const DOCX_BODY_CLOSE: &[u8] = b"</w:body>";

/// End-of-file marker of a page-description document.
pub const PDF_EOF: &[u8] = b"%%EOF";

/// Label of the PDF comment line carrying the sequence.
pub const PDF_COMMENT_LABEL: &str = "TracemarkWatermark";

/// Bytes searched before an insertion point when extracting.
pub const SEARCH_WINDOW: usize = 64 * 1024;

/// Append the sequence to plain text.
pub fn append_plain_text(text: &str, sequence: &str) -> String {
    let mut out = String::with_capacity(text.len() + sequence.len());
    out.push_str(text);
    out.push_str(sequence);
    out
}

/// Insert the sequence before the first `</w:body>` in the raw archive.
pub fn insert_docx(bytes: &[u8], sequence: &str) -> Option<Vec<u8>> {
    let pos = find_subslice(bytes, DOCX_BODY_CLOSE)?;
    Some(splice(bytes, pos, sequence.as_bytes()))
}

/// Insert `\n%Label: <sequence>\n` before the last `%%EOF`.
pub fn insert_pdf(bytes: &[u8], sequence: &str) -> Option<Vec<u8>> {
    let pos = rfind_subslice(bytes, PDF_EOF)?;
    let line = format!("\n%{}: {}\n", PDF_COMMENT_LABEL, sequence);
    Some(splice(bytes, pos, line.as_bytes()))
}

/// Forward scan of plain text for the anchor.
pub fn locate_plain_text(text: &str) -> Option<String> {
    find_and_decode(text)
}

/// Scan the window before `</w:body>`, or the file tail when the tag is
/// absent.
pub fn locate_docx(bytes: &[u8]) -> Option<String> {
    let end = find_subslice(bytes, DOCX_BODY_CLOSE).unwrap_or(bytes.len());
    decode_last_in_window(bytes, end)
}

/// Scan the window before the last `%%EOF`, or the file tail.
pub fn locate_pdf(bytes: &[u8]) -> Option<String> {
    let end = rfind_subslice(bytes, PDF_EOF).unwrap_or(bytes.len());
    decode_last_in_window(bytes, end)
}

fn decode_last_in_window(bytes: &[u8], end: usize) -> Option<String> {
    let start = end.saturating_sub(SEARCH_WINDOW);
    let window = &bytes[start..end];
    let anchor = anchor_bytes();
    let pos = rfind_subslice(window, &anchor)?;
    decode_run(&window[pos + anchor.len()..])
}

fn splice(bytes: &[u8], pos: usize, insert: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len() + insert.len());
    out.extend_from_slice(&bytes[..pos]);
    out.extend_from_slice(insert);
    out.extend_from_slice(&bytes[pos..]);
    out
}
