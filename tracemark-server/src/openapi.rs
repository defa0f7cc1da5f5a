//! OpenAPI documentation configuration
//!
//! Generates the OpenAPI 3.0 document served at `/api-docs/openapi.json`.

use utoipa::OpenApi;

use crate::forensic::{
    Confidence, ForensicDetails, ForensicErrorCode, ForensicVerifyRequest, ForensicVerifyResponse,
    GrantorSummary,
};
use crate::handlers::{
    EmbedResponse, ExtractResponse, HealthResponse, IssueRequest, IssueResponse, ReadyResponse,
};

/// Tracemark API - OpenAPI Documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Tracemark API",
        version = "0.1.0",
        description = r#"
## Recipient Watermarking and Leak Attribution

Tracemark binds every distributed copy of a file to its recipient:

- **Signed payloads** - `documentId|email|timestampMs|deviceHash|HMAC-SHA256`
- **Images** - payload written into the blue-channel bit plane, output as PNG
- **Documents** - payload encoded as invisible characters in text, DOCX and PDF
- **Forensic records** - SHA-256 of each issued payload, write-once per recipient

### How It Works

1. **Issue** a payload for a recipient via `POST /watermark/issue`
2. **Embed** it into the file via `POST /watermark/embed`
3. When a copy leaks, **extract** the payload via `POST /watermark/extract`
4. **Verify** it against the forensic record via `POST /forensic/verify`

Images survive only lossless handling; any lossy re-encode destroys the mark.
"#,
        license(name = "MIT OR Apache-2.0")
    ),
    servers(
        (url = "http://localhost:3000", description = "Local development server")
    ),
    tags(
        (name = "Watermarking", description = "Issue, embed and extract recipient watermarks"),
        (name = "Verification", description = "Forensic verification of recovered payloads"),
        (name = "Health", description = "Service health and readiness endpoints")
    ),
    paths(
        crate::handlers::health::health,
        crate::handlers::health::ready,
        crate::handlers::issue::issue_handler,
        crate::handlers::embed::embed_handler,
        crate::handlers::extract::extract_handler,
        crate::handlers::verify::forensic_verify_handler,
    ),
    components(
        schemas(
            HealthResponse,
            ReadyResponse,
            IssueRequest,
            IssueResponse,
            EmbedResponse,
            ExtractResponse,
            ForensicVerifyRequest,
            ForensicVerifyResponse,
            ForensicDetails,
            ForensicErrorCode,
            GrantorSummary,
            Confidence,
        )
    )
)]
pub struct ApiDoc;
