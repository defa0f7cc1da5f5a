//! API integration tests for tracemark-server.
//!
//! These tests drive the HTTP API with realistic JSON and multipart
//! requests, covering the issue, embed, extract and forensic verify flow.

use std::io::Cursor;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde_json::{json, Value};
use tower::ServiceExt;
use async_trait::async_trait;
use tracemark_server::{
    create_router, create_router_with_state, AppState, Config, ForensicRecord, ForensicStore,
    ForensicStoreError, Grantor, MemoryForensicStore,
};

const BOUNDARY: &str = "----TestBoundary7MA4YWxkTrZu0gW";
const GRANTOR: &str = "grantor-1";

/// Helper to create a multipart body with a file and optional text fields
fn create_multipart(file_name: &str, content: &[u8], fields: &[(&str, &str)]) -> (String, Vec<u8>) {
    let mut body = Vec::new();

    // File field
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
            file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(b"\r\n");

    for (name, value) in fields {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
        );
        body.extend_from_slice(value.as_bytes());
        body.extend_from_slice(b"\r\n");
    }

    // End boundary
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    (format!("multipart/form-data; boundary={}", BOUNDARY), body)
}

/// Router backed by a memory store with one registered grantor
fn create_test_app() -> Router {
    let config = Config::default();
    let store = Arc::new(MemoryForensicStore::new());
    store.register_grantor(Grantor {
        id: GRANTOR.into(),
        email: "owner@example.com".into(),
        display_name: Some("Document Owner".into()),
    });
    let state = AppState::with_store(&config, store).unwrap();
    create_router_with_state(&config, state)
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

async fn post_json(app: &Router, uri: &str, payload: Value) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("Content-Type", "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    (status, body_json(response).await)
}

async fn post_multipart(
    app: &Router,
    uri: &str,
    file_name: &str,
    content: &[u8],
    fields: &[(&str, &str)],
) -> (StatusCode, Value) {
    let (content_type, body) = create_multipart(file_name, content, fields);
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("Content-Type", content_type)
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    (status, body_json(response).await)
}

async fn issue(app: &Router, document_id: &str, email: &str, device_id: Option<&str>) -> Value {
    let (status, json) = post_json(
        app,
        "/watermark/issue",
        json!({
            "documentId": document_id,
            "recipientEmail": email,
            "grantorId": GRANTOR,
            "deviceId": device_id,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "issue failed: {}", json);
    json
}

async fn forensic_verify(app: &Router, document_id: &str, text: &str) -> Value {
    let (status, json) = post_json(
        app,
        "/forensic/verify",
        json!({ "documentId": document_id, "signedPayloadText": text }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    json
}

fn sample_png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x * 3) as u8, (y * 5) as u8, ((x + y) * 7) as u8])
    });
    let mut out = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut out, image::ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

// ============================================================================
// Health & Readiness Tests
// ============================================================================

#[tokio::test]
async fn test_health_endpoint_returns_ok() {
    let app = create_router().unwrap();

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["service"], "tracemark-server");
    assert_eq!(json["bit_plane_available"], true);
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_ready_reports_store_backend() {
    let app = create_test_app();

    let response = app
        .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["ready"], true);
    assert_eq!(json["store"], "memory");
}

/// Store whose backend is never reachable
struct UnreachableStore;

#[async_trait]
impl ForensicStore for UnreachableStore {
    async fn insert(&self, _record: &ForensicRecord) -> Result<(), ForensicStoreError> {
        Err(ForensicStoreError::Connection("refused".into()))
    }

    async fn get(
        &self,
        _document_id: &str,
        _recipient_email: &str,
    ) -> Result<Option<ForensicRecord>, ForensicStoreError> {
        Err(ForensicStoreError::Connection("refused".into()))
    }

    async fn grantor(&self, _grantor_id: &str) -> Result<Option<Grantor>, ForensicStoreError> {
        Err(ForensicStoreError::Connection("refused".into()))
    }

    async fn ping(&self) -> Result<(), ForensicStoreError> {
        Err(ForensicStoreError::Connection("refused".into()))
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}

#[tokio::test]
async fn test_ready_fails_when_store_unreachable() {
    let config = Config::default();
    let state = AppState::with_store(&config, Arc::new(UnreachableStore)).unwrap();
    let app = create_router_with_state(&config, state);

    let response = app
        .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = body_json(response).await;
    assert_eq!(json["ready"], false);
    assert_eq!(json["store"], "postgres");
}

#[tokio::test]
async fn test_issue_reports_unreachable_store() {
    let config = Config::default();
    let state = AppState::with_store(&config, Arc::new(UnreachableStore)).unwrap();
    let app = create_router_with_state(&config, state);

    let (status, json) = post_json(
        &app,
        "/watermark/issue",
        json!({
            "documentId": "doc-down",
            "recipientEmail": "ivy@example.com",
            "grantorId": GRANTOR,
        }),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["code"], "STORE_UNAVAILABLE");
}

#[tokio::test]
async fn test_openapi_documents_every_route() {
    let app = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api-docs/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    for path in [
        "/watermark/issue",
        "/watermark/embed",
        "/watermark/extract",
        "/forensic/verify",
        "/health",
        "/ready",
    ] {
        assert!(json["paths"][path].is_object(), "{} should be documented", path);
    }
}

#[tokio::test]
async fn test_swagger_ui_endpoint() {
    let app = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/swagger-ui/")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let html = String::from_utf8_lossy(&body);
    assert!(html.contains("swagger") || html.contains("Swagger"));
}

// ============================================================================
// Full Flow Tests
// ============================================================================

#[tokio::test]
async fn test_text_document_issue_embed_extract_verify() {
    let app = create_test_app();
    let issued = issue(&app, "doc-text", "Alice@Example.com", None).await;
    let signed = issued["signedPayload"].as_str().unwrap();
    assert_eq!(issued["recipientEmail"], "alice@example.com");
    assert_eq!(issued["watermarkHash"].as_str().unwrap().len(), 64);

    let original = "Quarterly numbers are confidential.\n";
    let (status, embedded) = post_multipart(
        &app,
        "/watermark/embed",
        "report.txt",
        original.as_bytes(),
        &[("signed_payload", signed)],
    )
    .await;
    assert_eq!(status, StatusCode::OK, "embed failed: {}", embedded);
    assert_eq!(embedded["carrier"], "plain_text");
    assert_eq!(embedded["authoritative"], true);

    let marked = BASE64.decode(embedded["file"].as_str().unwrap()).unwrap();
    let marked_text = String::from_utf8(marked.clone()).unwrap();
    assert!(marked_text.starts_with(original));

    let (status, extracted) =
        post_multipart(&app, "/watermark/extract", "leaked.txt", &marked, &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(extracted["found"], true);
    assert_eq!(extracted["method"], "invisible");
    assert_eq!(extracted["data"], signed);

    let verdict = forensic_verify(&app, "doc-text", signed).await;
    assert_eq!(verdict["valid"], true, "{}", verdict);
    assert_eq!(verdict["confidence"], "high");
    assert_eq!(verdict["details"]["recipientEmail"], "alice@example.com");
    assert_eq!(verdict["details"]["grantor"]["id"], GRANTOR);
    assert_eq!(verdict["details"]["deviceBound"], false);
}

#[tokio::test]
async fn test_png_issue_embed_extract_verify() {
    let app = create_test_app();
    let issued = issue(&app, "doc-image", "bob@example.com", None).await;
    let signed = issued["signedPayload"].as_str().unwrap();

    let (status, embedded) = post_multipart(
        &app,
        "/watermark/embed",
        "photo.png",
        &sample_png(64, 64),
        &[("signed_payload", signed)],
    )
    .await;
    assert_eq!(status, StatusCode::OK, "embed failed: {}", embedded);
    assert_eq!(embedded["carrier"], "image");
    assert_eq!(embedded["imageStrategy"], "bit-plane");

    let marked = BASE64.decode(embedded["file"].as_str().unwrap()).unwrap();
    let (status, extracted) =
        post_multipart(&app, "/watermark/extract", "photo.png", &marked, &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(extracted["method"], "lsb");
    assert_eq!(extracted["authoritative"], true);
    assert_eq!(extracted["data"], signed);

    let verdict = forensic_verify(&app, "doc-image", signed).await;
    assert_eq!(verdict["valid"], true, "{}", verdict);
}

#[tokio::test]
async fn test_extract_unmarked_file_is_not_found() {
    let app = create_test_app();

    let (status, json) =
        post_multipart(&app, "/watermark/extract", "clean.txt", b"nothing here", &[]).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["found"], false);
    assert!(json.get("data").is_none());
}

#[tokio::test]
async fn test_extract_accepts_uploads_above_default_multipart_cap() {
    let app = create_test_app();
    let notes = "meeting notes\n".repeat(3 * 1024 * 1024 / 14 + 1);
    assert!(notes.len() > 3 * 1024 * 1024);

    let (status, json) =
        post_multipart(&app, "/watermark/extract", "notes.txt", notes.as_bytes(), &[]).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["found"], false);
    assert_eq!(json["carrier"], "plain_text");
}

#[tokio::test]
async fn test_upload_over_max_file_size_is_rejected() {
    let config = Config {
        max_file_size_mb: 1,
        ..Config::default()
    };
    let state = AppState::in_memory(&config).unwrap();
    let app = create_router_with_state(&config, state);
    let notes = vec![b'a'; 1024 * 1024 + 1];

    let (status, json) =
        post_multipart(&app, "/watermark/extract", "notes.txt", &notes, &[]).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "INVALID_INPUT");
    assert!(json["error"].as_str().unwrap().contains("File too large"));
}

// ============================================================================
// Issuance Tests
// ============================================================================

#[tokio::test]
async fn test_second_issue_for_same_recipient_conflicts() {
    let app = create_test_app();
    issue(&app, "doc-once", "carol@example.com", None).await;

    let (status, json) = post_json(
        &app,
        "/watermark/issue",
        json!({
            "documentId": "doc-once",
            "recipientEmail": "CAROL@example.com",
            "grantorId": GRANTOR,
        }),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "RECORD_EXISTS");
}

#[tokio::test]
async fn test_issue_rejects_invalid_identifiers() {
    let app = create_test_app();

    let (status, json) = post_json(
        &app,
        "/watermark/issue",
        json!({
            "documentId": "doc|injected",
            "recipientEmail": "dave@example.com",
            "grantorId": GRANTOR,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "INVALID_INPUT");

    let (status, _) = post_json(
        &app,
        "/watermark/issue",
        json!({
            "documentId": "doc-ok",
            "recipientEmail": "not-an-email",
            "grantorId": GRANTOR,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ============================================================================
// Embedding Error Tests
// ============================================================================

#[tokio::test]
async fn test_embed_rejects_forged_signature() {
    let app = create_test_app();
    let issued = issue(&app, "doc-forge", "erin@example.com", None).await;
    let signed = issued["signedPayload"].as_str().unwrap();
    let forged = signed.replacen("erin@", "mallory@", 1);

    let (status, json) = post_multipart(
        &app,
        "/watermark/embed",
        "notes.txt",
        b"text",
        &[("signed_payload", forged.as_str())],
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["code"], "SIGNATURE_MISMATCH");
}

#[tokio::test]
async fn test_embed_missing_payload_field() {
    let app = create_test_app();

    let (status, _) = post_multipart(&app, "/watermark/embed", "notes.txt", b"text", &[]).await;

    assert!(status.is_client_error());
}

#[tokio::test]
async fn test_embed_docx_without_body_is_refused() {
    let app = create_test_app();
    let issued = issue(&app, "doc-docx", "frank@example.com", None).await;
    let signed = issued["signedPayload"].as_str().unwrap();

    let (status, json) = post_multipart(
        &app,
        "/watermark/embed",
        "contract.docx",
        b"<w:document></w:document>",
        &[("signed_payload", signed)],
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["code"], "INSERTION_POINT_NOT_FOUND");
}

#[tokio::test]
async fn test_embed_image_too_small() {
    let app = create_test_app();
    let issued = issue(&app, "doc-tiny", "gina@example.com", None).await;
    let signed = issued["signedPayload"].as_str().unwrap();

    let (status, json) = post_multipart(
        &app,
        "/watermark/embed",
        "icon.png",
        &sample_png(4, 4),
        &[("signed_payload", signed)],
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["code"], "CAPACITY_EXCEEDED");
}

// ============================================================================
// Forensic Verification Tests
// ============================================================================

#[tokio::test]
async fn test_verify_tampered_payload_is_hash_mismatch() {
    let app = create_test_app();
    let issued = issue(&app, "doc-tamper", "hank@example.com", None).await;
    let signed = issued["signedPayload"].as_str().unwrap();

    let last = signed.chars().last().unwrap();
    let replacement = if last == '0' { '1' } else { '0' };
    let tampered = format!("{}{}", &signed[..signed.len() - 1], replacement);

    let verdict = forensic_verify(&app, "doc-tamper", &tampered).await;
    assert_eq!(verdict["valid"], false);
    assert_eq!(verdict["confidence"], "none");
    assert_eq!(verdict["error"], "hash_mismatch");
}

#[tokio::test]
async fn test_verify_unknown_record() {
    let app = create_test_app();
    let text = format!("doc-ghost|ivy@example.com|1700000000000||{}", "ab".repeat(32));

    let verdict = forensic_verify(&app, "doc-ghost", &text).await;
    assert_eq!(verdict["valid"], false);
    assert_eq!(verdict["error"], "record_not_found");
}

#[tokio::test]
async fn test_verify_document_mismatch() {
    let app = create_test_app();
    let issued = issue(&app, "doc-a", "jack@example.com", None).await;
    let signed = issued["signedPayload"].as_str().unwrap();

    let verdict = forensic_verify(&app, "doc-b", signed).await;
    assert_eq!(verdict["error"], "document_mismatch");
}

#[tokio::test]
async fn test_verify_missing_fields_and_bad_body() {
    let app = create_test_app();

    let (status, verdict) = post_json(&app, "/forensic/verify", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(verdict["error"], "missing_fields");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/forensic/verify")
                .header("Content-Type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let verdict = body_json(response).await;
    assert_eq!(verdict["valid"], false);
    assert_eq!(verdict["error"], "missing_fields");
}

#[tokio::test]
async fn test_verify_unknown_grantor() {
    let app = create_test_app();
    let (status, issued) = post_json(
        &app,
        "/watermark/issue",
        json!({
            "documentId": "doc-orphan",
            "recipientEmail": "kim@example.com",
            "grantorId": "grantor-deleted",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let verdict =
        forensic_verify(&app, "doc-orphan", issued["signedPayload"].as_str().unwrap()).await;
    assert_eq!(verdict["valid"], false);
    assert_eq!(verdict["error"], "grantor_not_found");
}

#[tokio::test]
async fn test_verify_device_binding() {
    let app = create_test_app();
    let issued = issue(&app, "doc-device", "lee@example.com", Some("laptop-7")).await;
    let signed = issued["signedPayload"].as_str().unwrap();
    let device_hash = issued["deviceHash"].as_str().unwrap();
    assert_eq!(device_hash.len(), 64);

    let (_, matched) = post_json(
        &app,
        "/forensic/verify",
        json!({
            "documentId": "doc-device",
            "signedPayloadText": signed,
            "deviceHash": device_hash,
        }),
    )
    .await;
    assert_eq!(matched["valid"], true);
    assert_eq!(matched["confidence"], "high");
    assert_eq!(matched["details"]["deviceMatch"], true);

    let (_, mismatched) = post_json(
        &app,
        "/forensic/verify",
        json!({
            "documentId": "doc-device",
            "signedPayloadText": signed,
            "deviceHash": "f".repeat(64),
        }),
    )
    .await;
    assert_eq!(mismatched["valid"], true);
    assert_eq!(mismatched["confidence"], "medium");
    assert_eq!(mismatched["details"]["deviceMatch"], false);
}
