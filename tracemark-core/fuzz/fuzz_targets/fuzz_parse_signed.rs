#![no_main]

//! Fuzz target for signed payload parsing
//!
//! Feeds arbitrary text through the parser, the wrapped-message helpers and
//! the verifier. None of them may panic.
//!
//! Run with: cargo +nightly fuzz run fuzz_parse_signed

use libfuzzer_sys::fuzz_target;
use tracemark_core::{is_valid_wrapped_message, parse_signed, unwrap, verify};

const KEY: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(payload) = parse_signed(text) {
            assert_eq!(payload.signature.as_deref().map(str::len), Some(64));
            assert!(!payload.document_id.contains('|'));
        }

        let _ = verify(Some(text), KEY);
        if is_valid_wrapped_message(Some(text)) {
            assert!(unwrap(Some(text)).is_some());
        }
    }
});
