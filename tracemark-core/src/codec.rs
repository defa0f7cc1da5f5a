//! Byte-level codec shared by the embedding engines.
//!
//! Format-specific code only ever needs three things: turn a string into
//! bytes, turn bytes back into a string, and walk bytes as a bit stream.
//! Keeping those primitives here means the image and document engines never
//! touch UTF-8 or bit ordering directly.

use crate::error::{Result, TracemarkError};

/// Encode a string to its UTF-8 bytes.
pub fn encode_utf8(text: &str) -> Vec<u8> {
    text.as_bytes().to_vec()
}

/// Decode UTF-8 bytes back into a string.
///
/// Invalid sequences are a format error rather than being replaced, since a
/// lossy decode would silently corrupt a signed payload.
pub fn decode_utf8(bytes: &[u8]) -> Result<String> {
    String::from_utf8(bytes.to_vec())
        .map_err(|e| TracemarkError::Format(format!("Invalid UTF-8 in recovered bytes: {}", e)))
}

/// Iterate over the bits of `bytes`, most significant bit first.
pub fn bits_msb_first(bytes: &[u8]) -> impl Iterator<Item = bool> + '_ {
    bytes
        .iter()
        .flat_map(|byte| (0..8).rev().map(move |shift| (byte >> shift) & 1 == 1))
}

/// Pack a bit stream (MSB first) into bytes.
///
/// A trailing partial byte is dropped.
pub fn pack_bits<I: IntoIterator<Item = bool>>(bits: I) -> Vec<u8> {
    let mut out = Vec::new();
    let mut current = 0u8;
    let mut filled = 0u8;

    for bit in bits {
        current = (current << 1) | u8::from(bit);
        filled += 1;
        if filled == 8 {
            out.push(current);
            current = 0;
            filled = 0;
        }
    }

    out
}

/// Position of the first occurrence of `needle` in `haystack`.
pub fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Position of the last occurrence of `needle` in `haystack`.
pub fn rfind_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .rposition(|window| window == needle)
}
