//! Legacy append channel.
//!
//! Appends `base64(wrap(signed))` to the end of the encoded image bytes.
//! Decoders ignore trailing data so the image still renders, but the mark
//! does not survive any re-encode and offers no security guarantee. Files
//! produced this way are non-authoritative and exist only for builds
//! without the bit-plane primitive.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

use crate::error::{Result, TracemarkError};
use crate::framing::{is_valid_wrapped_message, unwrap, wrap, START_SENTINEL};

/// Shortest trailing chunk considered, in bytes.
pub const MIN_CHUNK_LEN: usize = 16;

/// Longest trailing chunk considered, in bytes.
pub const MAX_CHUNK_LEN: usize = 8192;

/// A wrapped message located at the end of a byte stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrailingMessage {
    /// Offset where the base64 chunk begins
    pub offset: usize,
    /// The decoded wrapped message
    pub wrapped: String,
}

/// Append the legacy watermark to encoded image bytes.
///
/// Fails when the base64 chunk would be longer than [`MAX_CHUNK_LEN`], since
/// [`find_trailing_message`] could never find it.
pub fn append(image_bytes: &[u8], signed_payload: &str) -> Result<Vec<u8>> {
    let encoded = BASE64.encode(wrap(signed_payload));
    if encoded.len() > MAX_CHUNK_LEN {
        return Err(TracemarkError::Format(format!(
            "Legacy chunk is {} bytes, limit is {}",
            encoded.len(),
            MAX_CHUNK_LEN
        )));
    }

    let mut out = Vec::with_capacity(image_bytes.len() + encoded.len());
    out.extend_from_slice(image_bytes);
    out.extend_from_slice(encoded.as_bytes());
    Ok(out)
}

/// Search the tail of `bytes` for an appended wrapped message.
///
/// The legacy format carries no length prefix, so every trailing chunk whose
/// length is a multiple of 4 between [`MIN_CHUNK_LEN`] and [`MAX_CHUNK_LEN`]
/// is a candidate, shortest first. Candidates that do not begin with the
/// base64 form of the start sentinel are skipped before decoding; at most
/// `(MAX_CHUNK_LEN - MIN_CHUNK_LEN) / 4 + 1` candidates (2045) are examined
/// and each decode is bounded by `MAX_CHUNK_LEN`.
pub fn find_trailing_message(bytes: &[u8]) -> Option<TrailingMessage> {
    let prefix = sentinel_base64_prefix();
    let longest = MAX_CHUNK_LEN.min(bytes.len());

    for len in (MIN_CHUNK_LEN..=longest).step_by(4) {
        let offset = bytes.len() - len;
        let chunk = &bytes[offset..];
        if !chunk.starts_with(prefix.as_bytes()) {
            continue;
        }

        let Ok(decoded) = BASE64.decode(chunk) else {
            continue;
        };
        if !decoded.starts_with(START_SENTINEL.as_bytes()) {
            continue;
        }
        let Ok(wrapped) = String::from_utf8(decoded) else {
            continue;
        };
        if is_valid_wrapped_message(Some(&wrapped)) {
            return Some(TrailingMessage { offset, wrapped });
        }
    }

    None
}

/// Recover the signed payload from the legacy trailing chunk.
pub fn extract(bytes: &[u8]) -> Option<String> {
    find_trailing_message(bytes).and_then(|found| unwrap(Some(&found.wrapped)))
}

/// Return a clean display copy with the trailing chunk removed.
///
/// Bytes without a legacy mark are returned unchanged.
pub fn strip(bytes: &[u8]) -> Vec<u8> {
    match find_trailing_message(bytes) {
        Some(found) => bytes[..found.offset].to_vec(),
        None => bytes.to_vec(),
    }
}

/// Base64 of the longest 3-byte-aligned prefix of the start sentinel.
///
/// Base64 maps each 3-byte group to 4 characters independently, so this
/// prefix is identical for every wrapped message.
fn sentinel_base64_prefix() -> String {
    let sentinel = START_SENTINEL.as_bytes();
    BASE64.encode(&sentinel[..sentinel.len() / 3 * 3])
}
