//! Sentinel framing for embedded payloads.
//!
//! A wrapped message is `START ++ signed payload ++ END`. Both the bit-plane
//! and the legacy append channel carry wrapped messages, so the same
//! sentinels are recognized by every extractor.

/// Start-of-message sentinel.
pub const START_SENTINEL: &str = "[[TRACEMARK:BEGIN]]";

/// End-of-message sentinel.
pub const END_SENTINEL: &str = "[[TRACEMARK:END]]";

/// Frame a signed payload with the sentinels.
pub fn wrap(signed_payload: &str) -> String {
    let mut out =
        String::with_capacity(START_SENTINEL.len() + signed_payload.len() + END_SENTINEL.len());
    out.push_str(START_SENTINEL);
    out.push_str(signed_payload);
    out.push_str(END_SENTINEL);
    out
}

/// Recover the payload framed by the sentinels.
///
/// Returns `None` for absent input, a missing sentinel, or an END sentinel
/// that does not follow START.
pub fn unwrap(message: Option<&str>) -> Option<String> {
    let message = message?;
    let start = message.find(START_SENTINEL)?;
    let body_start = start + START_SENTINEL.len();
    let end = message[body_start..].find(END_SENTINEL)? + body_start;
    Some(message[body_start..end].to_string())
}

/// Whether `message` contains a START sentinel followed later by END.
pub fn is_valid_wrapped_message(message: Option<&str>) -> bool {
    let Some(message) = message else {
        return false;
    };
    match message.find(START_SENTINEL) {
        Some(start) => message[start + START_SENTINEL.len()..].contains(END_SENTINEL),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_unwrap_identity() {
        let signed = format!("doc-uuid|test@example.com|1700000000000|device-hash|{}", "a".repeat(64));
        let wrapped = wrap(&signed);
        assert!(wrapped.starts_with(START_SENTINEL));
        assert!(wrapped.ends_with(END_SENTINEL));
        assert_eq!(unwrap(Some(&wrapped)), Some(signed));
    }

    #[test]
    fn test_unwrap_empty_payload() {
        assert_eq!(unwrap(Some(&wrap(""))), Some(String::new()));
    }

    #[test]
    fn test_unwrap_ignores_surrounding_noise() {
        let msg = format!("garbage{}payload{}trailing", START_SENTINEL, END_SENTINEL);
        assert_eq!(unwrap(Some(&msg)), Some("payload".to_string()));
    }

    #[test]
    fn test_unwrap_malformed() {
        assert_eq!(unwrap(None), None);
        assert_eq!(unwrap(Some("")), None);
        assert_eq!(unwrap(Some("no sentinels here")), None);
        assert_eq!(unwrap(Some(&format!("{}payload", START_SENTINEL))), None);
        assert_eq!(unwrap(Some(&format!("payload{}", END_SENTINEL))), None);
        let reversed = format!("{}payload{}", END_SENTINEL, START_SENTINEL);
        assert_eq!(unwrap(Some(&reversed)), None);
    }

    #[test]
    fn test_is_valid_wrapped_message() {
        assert!(is_valid_wrapped_message(Some(&wrap("x"))));
        assert!(!is_valid_wrapped_message(None));
        assert!(!is_valid_wrapped_message(Some("")));
        assert!(!is_valid_wrapped_message(Some("plain text")));
        assert!(!is_valid_wrapped_message(Some(START_SENTINEL)));
        assert!(!is_valid_wrapped_message(Some(END_SENTINEL)));
        let reversed = format!("{}{}", END_SENTINEL, START_SENTINEL);
        assert!(!is_valid_wrapped_message(Some(&reversed)));
    }
}
