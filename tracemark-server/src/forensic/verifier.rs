//! Forensic verification of recovered payloads
//!
//! Runs the server-side checks in a fixed order and stops at the first
//! failure:
//!
//! 1. structure (fields present, five `|` fields, document id, email,
//!    timestamp range)
//! 2. record lookup for (document, recipient)
//! 3. SHA-256 of the submitted text against the stored hash
//! 4. timestamp freshness (future rejects, older than a year downgrades)
//! 5. device binding (mismatch downgrades, never rejects)
//! 6. grantor lookup
//!
//! Every outcome is a [`ForensicVerifyResponse`]; nothing is raised past
//! [`ForensicVerifier::verify`].

use std::sync::{Arc, LazyLock};

use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracemark_core::payload::{
    is_signature_hex, parse_timestamp_ms, FIELD_DELIMITER, NO_DEVICE, SIGNED_FIELD_COUNT,
};
use utoipa::ToSchema;

use super::{ForensicRecord, ForensicStore, Grantor};

/// 2000-01-01T00:00:00Z
pub const MIN_ISSUED_AT_MS: u64 = 946_684_800_000;

/// 9999-12-31T23:59:59.999Z
pub const MAX_ISSUED_AT_MS: u64 = 253_402_300_799_999;

/// Age beyond which confidence drops one tier.
pub const STALE_AFTER_DAYS: i64 = 365;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@|]+@[^\s@|]+\.[^\s@|]+$").expect("invalid email pattern")
});

/// Distinct failure codes of forensic verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ForensicErrorCode {
    MissingFields,
    MalformedPayload,
    DocumentMismatch,
    InvalidEmail,
    InvalidTimestamp,
    RecordNotFound,
    HashMismatch,
    TimestampFuture,
    GrantorNotFound,
    InternalError,
}

impl ForensicErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingFields => "missing_fields",
            Self::MalformedPayload => "malformed_payload",
            Self::DocumentMismatch => "document_mismatch",
            Self::InvalidEmail => "invalid_email",
            Self::InvalidTimestamp => "invalid_timestamp",
            Self::RecordNotFound => "record_not_found",
            Self::HashMismatch => "hash_mismatch",
            Self::TimestampFuture => "timestamp_future",
            Self::GrantorNotFound => "grantor_not_found",
            Self::InternalError => "internal_error",
        }
    }
}

impl std::fmt::Display for ForensicErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Graded trust in a successful verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
    None,
}

impl Confidence {
    /// One tier lower; `Low` is the floor for a valid result.
    pub fn downgrade(self) -> Self {
        match self {
            Self::High => Self::Medium,
            Self::Medium | Self::Low => Self::Low,
            Self::None => Self::None,
        }
    }
}

/// Forensic verification request
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ForensicVerifyRequest {
    /// Document the recovered copy claims to be
    #[schema(example = "7d0b1f2e-doc")]
    pub document_id: Option<String>,
    /// Signed payload recovered by extraction
    pub signed_payload_text: Option<String>,
    /// Device hash of the submitting device, compared against the binding
    pub device_hash: Option<String>,
}

/// Grantor identity reported on success
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GrantorSummary {
    pub id: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl From<Grantor> for GrantorSummary {
    fn from(g: Grantor) -> Self {
        Self {
            id: g.id,
            email: g.email,
            display_name: g.display_name,
        }
    }
}

/// Supporting detail of a successful verification
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ForensicDetails {
    pub document_id: String,
    pub recipient_email: String,
    pub grantor: GrantorSummary,
    /// Issue time from the payload (RFC 3339)
    pub issued_at: String,
    pub issued_at_ms: u64,
    /// When the forensic record was written (RFC 3339)
    pub recorded_at: String,
    /// Server time of this verification (RFC 3339)
    pub verified_at: String,
    pub age_days: i64,
    /// Whether a device binding was recorded at issuance
    pub device_bound: bool,
    /// Device comparison result; absent without a binding
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_match: Option<bool>,
}

/// Forensic verification response, always structured
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ForensicVerifyResponse {
    pub valid: bool,
    pub confidence: Confidence,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ForensicErrorCode>,
    /// Human-readable explanation of `error`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<ForensicDetails>,
}

impl ForensicVerifyResponse {
    /// Failed verification with `code`; confidence is always `none`.
    pub fn failure(code: ForensicErrorCode, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            ForensicErrorCode::HashMismatch => {
                tracing::warn!(code = %code, "Forensic verification detected tampering")
            }
            ForensicErrorCode::InternalError => {
                tracing::error!(code = %code, error = %message, "Forensic verification failed")
            }
            _ => tracing::info!(code = %code, "Forensic verification rejected"),
        }
        Self {
            valid: false,
            confidence: Confidence::None,
            error: Some(code),
            message: Some(message),
            details: None,
        }
    }
}

/// Structurally valid fields of a submitted payload.
struct CheckedPayload<'a> {
    document_id: &'a str,
    recipient_email: String,
    issued_at_ms: u64,
    issued_at: DateTime<Utc>,
    device_hash: &'a str,
}

/// Verifies recovered payloads against stored forensic records.
#[derive(Clone)]
pub struct ForensicVerifier {
    store: Arc<dyn ForensicStore>,
}

impl ForensicVerifier {
    pub fn new(store: Arc<dyn ForensicStore>) -> Self {
        Self { store }
    }

    /// Verify against the current server time.
    pub async fn verify(&self, request: &ForensicVerifyRequest) -> ForensicVerifyResponse {
        self.verify_at(request, Utc::now()).await
    }

    /// Verify against an explicit server time.
    pub async fn verify_at(
        &self,
        request: &ForensicVerifyRequest,
        now: DateTime<Utc>,
    ) -> ForensicVerifyResponse {
        let (document_id, text) = match (
            non_empty(request.document_id.as_deref()),
            non_empty(request.signed_payload_text.as_deref()),
        ) {
            (Some(doc), Some(text)) => (doc, text),
            _ => {
                return ForensicVerifyResponse::failure(
                    ForensicErrorCode::MissingFields,
                    "documentId and signedPayloadText are required",
                )
            }
        };

        let payload = match check_structure(document_id, text) {
            Ok(payload) => payload,
            Err((code, message)) => return ForensicVerifyResponse::failure(code, message),
        };

        let record = match self.store.get(payload.document_id, &payload.recipient_email).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                return ForensicVerifyResponse::failure(
                    ForensicErrorCode::RecordNotFound,
                    "No forensic record exists for this document and recipient",
                )
            }
            Err(e) => {
                return ForensicVerifyResponse::failure(ForensicErrorCode::InternalError, e.to_string())
            }
        };

        if tracemark_core::hash(text) != record.watermark_hash {
            return ForensicVerifyResponse::failure(
                ForensicErrorCode::HashMismatch,
                "Payload does not match the recorded watermark",
            );
        }

        if payload.issued_at > now {
            return ForensicVerifyResponse::failure(
                ForensicErrorCode::TimestampFuture,
                "Payload was issued in the future relative to server time",
            );
        }

        let mut confidence = Confidence::High;
        let age = now - payload.issued_at;
        if age > Duration::days(STALE_AFTER_DAYS) {
            confidence = confidence.downgrade();
        }

        let device_bound = is_bound(&record);
        let device_match = if device_bound {
            let submitted = request
                .device_hash
                .as_deref()
                .filter(|d| !d.is_empty())
                .unwrap_or(payload.device_hash);
            let matches = submitted == record.device_hash;
            if !matches {
                tracing::info!(document_id = %document_id, "Device binding mismatch");
                confidence = confidence.downgrade();
            }
            Some(matches)
        } else {
            None
        };

        let grantor = match self.store.grantor(&record.grantor_id).await {
            Ok(Some(grantor)) => grantor,
            Ok(None) => {
                return ForensicVerifyResponse::failure(
                    ForensicErrorCode::GrantorNotFound,
                    "The grantor of this record no longer exists",
                )
            }
            Err(e) => {
                return ForensicVerifyResponse::failure(ForensicErrorCode::InternalError, e.to_string())
            }
        };

        tracing::info!(
            document_id = %document_id,
            confidence = ?confidence,
            device_match = ?device_match,
            "Forensic verification succeeded"
        );

        ForensicVerifyResponse {
            valid: true,
            confidence,
            error: None,
            message: None,
            details: Some(ForensicDetails {
                document_id: record.document_id.clone(),
                recipient_email: record.recipient_email.clone(),
                grantor: grantor.into(),
                issued_at: payload.issued_at.to_rfc3339(),
                issued_at_ms: payload.issued_at_ms,
                recorded_at: record.created_at.to_rfc3339(),
                verified_at: now.to_rfc3339(),
                age_days: age.num_days(),
                device_bound,
                device_match,
            }),
        }
    }
}

/// Basic email shape check shared with issuance.
pub fn is_plausible_email(candidate: &str) -> bool {
    EMAIL_PATTERN.is_match(candidate)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn is_bound(record: &ForensicRecord) -> bool {
    !record.device_hash.is_empty() && record.device_hash != NO_DEVICE
}

fn check_structure<'a>(
    document_id: &str,
    text: &'a str,
) -> Result<CheckedPayload<'a>, (ForensicErrorCode, String)> {
    let parts: Vec<&str> = text.split(FIELD_DELIMITER).collect();
    if parts.len() != SIGNED_FIELD_COUNT || !is_signature_hex(parts[4]) {
        return Err((
            ForensicErrorCode::MalformedPayload,
            format!(
                "Expected {} fields ending in a 64-hex signature",
                SIGNED_FIELD_COUNT
            ),
        ));
    }

    if parts[0] != document_id {
        return Err((
            ForensicErrorCode::DocumentMismatch,
            "Payload belongs to a different document".into(),
        ));
    }

    if !is_plausible_email(parts[1]) {
        return Err((
            ForensicErrorCode::InvalidEmail,
            "Recipient email is malformed".into(),
        ));
    }

    let issued_at_ms = parse_timestamp_ms(parts[2])
        .filter(|ms| (MIN_ISSUED_AT_MS..=MAX_ISSUED_AT_MS).contains(ms))
        .ok_or_else(|| {
            (
                ForensicErrorCode::InvalidTimestamp,
                "Issue timestamp is not a valid epoch millisecond value".to_string(),
            )
        })?;
    let issued_at = i64::try_from(issued_at_ms)
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .ok_or_else(|| {
            (
                ForensicErrorCode::InvalidTimestamp,
                "Issue timestamp is out of range".to_string(),
            )
        })?;

    Ok(CheckedPayload {
        document_id: parts[0],
        recipient_email: parts[1].to_lowercase(),
        issued_at_ms,
        issued_at,
        device_hash: parts[3],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forensic::MemoryForensicStore;
    use chrono::TimeZone;

    const KEY: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";
    const ISSUED_MS: u64 = 1_700_000_000_000;

    fn now() -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ISSUED_MS as i64 + 86_400_000)
            .single()
            .unwrap()
    }

    async fn fixture(device_hash: &str) -> (ForensicVerifier, Arc<MemoryForensicStore>, String) {
        let store = Arc::new(MemoryForensicStore::new());
        store.register_grantor(Grantor {
            id: "grantor-1".into(),
            email: "owner@example.com".into(),
            display_name: Some("Owner".into()),
        });

        let issued =
            tracemark_core::issue("doc-1", "leaker@example.com", device_hash, KEY, ISSUED_MS)
                .unwrap();
        store
            .insert(&ForensicRecord {
                document_id: "doc-1".into(),
                recipient_email: "leaker@example.com".into(),
                grantor_id: "grantor-1".into(),
                watermark_hash: issued.watermark_hash.clone(),
                signature: issued.signature.clone(),
                device_hash: issued.payload.device_hash.clone(),
                created_at: Utc.timestamp_millis_opt(ISSUED_MS as i64).single().unwrap(),
            })
            .await
            .unwrap();

        (
            ForensicVerifier::new(store.clone()),
            store,
            issued.signed_payload,
        )
    }

    fn request(doc: &str, text: &str) -> ForensicVerifyRequest {
        ForensicVerifyRequest {
            document_id: Some(doc.into()),
            signed_payload_text: Some(text.into()),
            device_hash: None,
        }
    }

    fn with_field(text: &str, idx: usize, value: &str) -> String {
        let mut parts: Vec<&str> = text.split('|').collect();
        parts[idx] = value;
        parts.join("|")
    }

    #[tokio::test]
    async fn test_valid_payload_is_high_confidence() {
        let (verifier, _, signed) = fixture("").await;
        let response = verifier.verify_at(&request("doc-1", &signed), now()).await;

        assert!(response.valid, "{:?}", response.message);
        assert_eq!(response.confidence, Confidence::High);
        let details = response.details.unwrap();
        assert_eq!(details.grantor.email, "owner@example.com");
        assert_eq!(details.age_days, 1);
        assert!(!details.device_bound);
        assert_eq!(details.device_match, None);
    }

    #[tokio::test]
    async fn test_missing_fields() {
        let (verifier, _, signed) = fixture("").await;
        let cases = [
            ForensicVerifyRequest::default(),
            ForensicVerifyRequest {
                document_id: Some("  ".into()),
                signed_payload_text: Some(signed.clone()),
                device_hash: None,
            },
            ForensicVerifyRequest {
                document_id: Some("doc-1".into()),
                signed_payload_text: None,
                device_hash: None,
            },
        ];
        for req in cases {
            let response = verifier.verify_at(&req, now()).await;
            assert_eq!(response.error, Some(ForensicErrorCode::MissingFields));
            assert_eq!(response.confidence, Confidence::None);
        }
    }

    #[tokio::test]
    async fn test_structural_failures() {
        let (verifier, _, signed) = fixture("").await;

        let cases = [
            ("doc-1".to_string(), "doc-1|a@b.co|1".to_string(), ForensicErrorCode::MalformedPayload),
            ("doc-1".to_string(), with_field(&signed, 4, "XYZ"), ForensicErrorCode::MalformedPayload),
            ("doc-2".to_string(), signed.clone(), ForensicErrorCode::DocumentMismatch),
            ("doc-1".to_string(), with_field(&signed, 1, "not-an-email"), ForensicErrorCode::InvalidEmail),
            ("doc-1".to_string(), with_field(&signed, 2, "12.5"), ForensicErrorCode::InvalidTimestamp),
            ("doc-1".to_string(), with_field(&signed, 2, "5"), ForensicErrorCode::InvalidTimestamp),
        ];

        for (doc, text, expected) in cases {
            let response = verifier.verify_at(&request(&doc, &text), now()).await;
            assert!(!response.valid);
            assert_eq!(response.error, Some(expected), "{}", text);
        }
    }

    #[tokio::test]
    async fn test_record_not_found_is_distinct_from_mismatch() {
        let (verifier, _, signed) = fixture("").await;
        let other_recipient = with_field(&signed, 1, "someone@example.com");
        let response = verifier.verify_at(&request("doc-1", &other_recipient), now()).await;
        assert_eq!(response.error, Some(ForensicErrorCode::RecordNotFound));
    }

    #[tokio::test]
    async fn test_hash_mismatch() {
        let (verifier, _, signed) = fixture("").await;
        let tampered = with_field(&signed, 2, &(ISSUED_MS + 1).to_string());
        let response = verifier.verify_at(&request("doc-1", &tampered), now()).await;
        assert!(!response.valid);
        assert_eq!(response.error, Some(ForensicErrorCode::HashMismatch));
    }

    #[tokio::test]
    async fn test_future_timestamp() {
        let (verifier, _, signed) = fixture("").await;
        let before_issue = Utc.timestamp_millis_opt(ISSUED_MS as i64 - 1).single().unwrap();
        let response = verifier.verify_at(&request("doc-1", &signed), before_issue).await;
        assert!(!response.valid);
        assert_eq!(response.error, Some(ForensicErrorCode::TimestampFuture));
    }

    #[tokio::test]
    async fn test_old_payload_downgrades() {
        let (verifier, _, signed) = fixture("").await;
        let later = now() + Duration::days(400);
        let response = verifier.verify_at(&request("doc-1", &signed), later).await;
        assert!(response.valid);
        assert_eq!(response.confidence, Confidence::Medium);
    }

    #[tokio::test]
    async fn test_device_mismatch_is_soft() {
        let (verifier, _, signed) = fixture("device-abc").await;

        let same = verifier.verify_at(&request("doc-1", &signed), now()).await;
        assert_eq!(same.confidence, Confidence::High);
        assert_eq!(same.details.unwrap().device_match, Some(true));

        let mut req = request("doc-1", &signed);
        req.device_hash = Some("device-xyz".into());
        let other = verifier.verify_at(&req, now() + Duration::days(400)).await;
        assert!(other.valid);
        assert_eq!(other.confidence, Confidence::Low);
        assert_eq!(other.details.unwrap().device_match, Some(false));
    }

    #[tokio::test]
    async fn test_grantor_not_found() {
        let (verifier, store, signed) = fixture("").await;
        store.remove_grantor("grantor-1");
        let response = verifier.verify_at(&request("doc-1", &signed), now()).await;
        assert_eq!(response.error, Some(ForensicErrorCode::GrantorNotFound));
    }

    #[tokio::test]
    async fn test_store_failure_is_internal_error() {
        use crate::forensic::ForensicStoreError;
        use async_trait::async_trait;

        struct BrokenStore;

        #[async_trait]
        impl ForensicStore for BrokenStore {
            async fn insert(&self, _: &ForensicRecord) -> Result<(), ForensicStoreError> {
                Err(ForensicStoreError::Query("down".into()))
            }
            async fn get(&self, _: &str, _: &str) -> Result<Option<ForensicRecord>, ForensicStoreError> {
                Err(ForensicStoreError::Query("down".into()))
            }
            async fn grantor(&self, _: &str) -> Result<Option<Grantor>, ForensicStoreError> {
                Err(ForensicStoreError::Query("down".into()))
            }
            fn backend(&self) -> &'static str {
                "broken"
            }
        }

        let (_, _, signed) = fixture("").await;
        let verifier = ForensicVerifier::new(Arc::new(BrokenStore));
        let response = verifier.verify_at(&request("doc-1", &signed), now()).await;
        assert!(!response.valid);
        assert_eq!(response.error, Some(ForensicErrorCode::InternalError));
    }

    #[test]
    fn test_error_code_serialization() {
        assert_eq!(
            serde_json::to_string(&ForensicErrorCode::HashMismatch).unwrap(),
            "\"hash_mismatch\""
        );
        assert_eq!(serde_json::to_string(&Confidence::None).unwrap(), "\"none\"");
        assert_eq!(ForensicErrorCode::TimestampFuture.to_string(), "timestamp_future");
    }
}
