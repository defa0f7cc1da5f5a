//! Invisible-character alphabet.
//!
//! A sequence is the start anchor followed by every UTF-8 byte of the
//! payload as eight bit markers (MSB first), with a separator between
//! successive bytes. None of the code points render or affect layout.

use crate::codec::{bits_msb_first, decode_utf8, encode_utf8, pack_bits};

/// Bit 0 (ZERO WIDTH SPACE).
pub const BIT_ZERO: char = '\u{200B}';
/// Bit 1 (ZERO WIDTH NON-JOINER).
pub const BIT_ONE: char = '\u{200C}';
/// Byte separator (ZERO WIDTH JOINER).
pub const SEPARATOR: char = '\u{200D}';
/// Start-of-sequence anchor (WORD JOINER).
pub const ANCHOR: char = '\u{2060}';

/// Every marker encodes to three UTF-8 bytes.
const MARKER_UTF8_LEN: usize = 3;

/// UTF-8 bytes of [`ANCHOR`].
pub fn anchor_bytes() -> [u8; MARKER_UTF8_LEN] {
    let mut buf = [0u8; MARKER_UTF8_LEN];
    ANCHOR.encode_utf8(&mut buf);
    buf
}

/// Whether `c` belongs to the invisible alphabet.
pub fn is_marker(c: char) -> bool {
    matches!(c, BIT_ZERO | BIT_ONE | SEPARATOR | ANCHOR)
}

/// Encode `payload` as an anchored invisible sequence.
pub fn encode(payload: &str) -> String {
    let bytes = encode_utf8(payload);
    let mut out = String::with_capacity((1 + bytes.len() * 9) * MARKER_UTF8_LEN);
    out.push(ANCHOR);

    for (idx, byte) in bytes.iter().enumerate() {
        if idx > 0 {
            out.push(SEPARATOR);
        }
        for bit in bits_msb_first(std::slice::from_ref(byte)) {
            out.push(if bit { BIT_ONE } else { BIT_ZERO });
        }
    }

    out
}

/// Decode the run of bit and separator markers that starts at `bytes`.
///
/// `bytes` begins immediately after the anchor. Decoding stops at the first
/// non-marker; every byte group must hold exactly eight bits.
pub fn decode_run(bytes: &[u8]) -> Option<String> {
    let mut bits = Vec::new();
    let mut group_len = 0usize;
    let mut rest = bytes;

    while rest.len() >= MARKER_UTF8_LEN {
        let Ok(marker) = std::str::from_utf8(&rest[..MARKER_UTF8_LEN]) else {
            break;
        };
        match marker.chars().next() {
            Some(BIT_ZERO) => {
                bits.push(false);
                group_len += 1;
            }
            Some(BIT_ONE) => {
                bits.push(true);
                group_len += 1;
            }
            Some(SEPARATOR) => {
                if group_len != 8 {
                    return None;
                }
                group_len = 0;
            }
            _ => break,
        }
        rest = &rest[MARKER_UTF8_LEN..];
    }

    if bits.is_empty() || group_len != 8 {
        return None;
    }

    decode_utf8(&pack_bits(bits)).ok()
}

/// Decode the sequence after the first anchor in `text` that starts one.
///
/// A word joiner used as ordinary text is skipped in favor of later anchors.
pub fn find_and_decode(text: &str) -> Option<String> {
    text.match_indices(ANCHOR)
        .find_map(|(idx, _)| decode_run(&text.as_bytes()[idx + ANCHOR.len_utf8()..]))
}

/// Remove every invisible marker from `text`.
pub fn strip(text: &str) -> String {
    text.chars().filter(|c| !is_marker(*c)).collect()
}
