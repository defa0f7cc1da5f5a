//! Issuance pipeline: build, sign, hash, embed.

use serde::Serialize;

use crate::carrier::CarrierKind;
use crate::document;
use crate::error::{Result, TracemarkError};
use crate::payload::{build_unsigned, parse_signed, WatermarkPayload};
use crate::raster::{ImageEmbedder, ImageStrategy};
use crate::signer::{hash, sign};

/// A freshly issued, signed watermark.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedWatermark {
    pub signed_payload: String,
    /// SHA-256 hex of `signed_payload`, stored server-side
    pub watermark_hash: String,
    pub signature: String,
    pub payload: WatermarkPayload,
}

/// Build and sign a payload for one recipient.
///
/// The recipient email is trimmed and lower-cased before it is written. Any
/// signing failure aborts issuance.
pub fn issue(
    document_id: &str,
    recipient_email: &str,
    device_hash: &str,
    key_hex: &str,
    now_ms: u64,
) -> Result<IssuedWatermark> {
    let email = recipient_email.trim().to_lowercase();
    let unsigned = build_unsigned(document_id, &email, device_hash, now_ms)?;
    let signature = sign(&unsigned, key_hex)?;
    let signed_payload = format!("{}|{}", unsigned, signature);
    let payload = parse_signed(&signed_payload)?;

    tracing::info!(document_id = %document_id, "Issued watermark payload");

    Ok(IssuedWatermark {
        watermark_hash: hash(&signed_payload),
        signed_payload,
        signature,
        payload,
    })
}

/// [`issue`] stamped with the current wall-clock time.
pub fn issue_now(
    document_id: &str,
    recipient_email: &str,
    device_hash: &str,
    key_hex: &str,
) -> Result<IssuedWatermark> {
    let now_ms = u64::try_from(chrono::Utc::now().timestamp_millis())
        .map_err(|_| TracemarkError::Format("System clock is before the Unix epoch".into()))?;
    issue(document_id, recipient_email, device_hash, key_hex, now_ms)
}

/// Watermarked output bytes and how they were produced.
#[derive(Debug, Clone)]
pub struct EmbeddedArtifact {
    pub bytes: Vec<u8>,
    pub carrier: CarrierKind,
    /// Image strategy used; `None` for documents
    pub image_strategy: Option<ImageStrategy>,
}

impl EmbeddedArtifact {
    pub fn is_authoritative(&self) -> bool {
        self.image_strategy
            .map(ImageStrategy::is_authoritative)
            .unwrap_or(true)
    }
}

/// Routes a signed payload into the right embedding engine.
///
/// Legacy image output is refused unless explicitly allowed.
#[derive(Debug, Clone, Copy)]
pub struct Watermarker {
    images: ImageEmbedder,
    allow_legacy: bool,
}

impl Default for Watermarker {
    fn default() -> Self {
        Self::new(ImageEmbedder::detected(), false)
    }
}

impl Watermarker {
    pub fn new(images: ImageEmbedder, allow_legacy: bool) -> Self {
        Self {
            images,
            allow_legacy,
        }
    }

    pub fn image_strategy(&self) -> ImageStrategy {
        self.images.strategy()
    }

    /// Embed `signed_payload` into `bytes`.
    pub fn embed(
        &self,
        bytes: &[u8],
        carrier: CarrierKind,
        signed_payload: &str,
    ) -> Result<EmbeddedArtifact> {
        match carrier {
            CarrierKind::Image => {
                if !self.images.strategy().is_authoritative() && !self.allow_legacy {
                    return Err(TracemarkError::NativeUnavailable);
                }
                let embedded = self.images.embed(bytes, signed_payload)?;
                Ok(EmbeddedArtifact {
                    bytes: embedded.bytes,
                    carrier,
                    image_strategy: Some(embedded.strategy),
                })
            }
            CarrierKind::Document(format) => Ok(EmbeddedArtifact {
                bytes: document::embed_bytes(bytes, format, signed_payload)?,
                carrier,
                image_strategy: None,
            }),
        }
    }

    /// [`Watermarker::embed`] on the blocking pool.
    #[cfg(feature = "async")]
    pub async fn embed_async(
        &self,
        bytes: Vec<u8>,
        carrier: CarrierKind,
        signed_payload: String,
    ) -> Result<EmbeddedArtifact> {
        let this = *self;
        tokio::task::spawn_blocking(move || this.embed(&bytes, carrier, &signed_payload))
            .await
            .map_err(|e| TracemarkError::TaskJoin(e.to_string()))?
    }
}
