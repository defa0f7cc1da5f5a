//! Image embedding engine.
//!
//! Two mutually exclusive strategies exist:
//!
//! - **Bit-plane** ([`ImageStrategy::NativeBitPlane`]): payload bits in the
//!   blue-channel LSBs of decoded pixels. Requires the `bit-plane` feature.
//! - **Legacy append** ([`ImageStrategy::LegacyAppend`]): base64 of the
//!   wrapped payload appended to the encoded bytes. Non-authoritative.
//!
//! The strategy is chosen once with [`ImageStrategy::detect`] and injected
//! into [`ImageEmbedder`]. Issuance entry points never fall back from the
//! bit-plane strategy to the legacy one on their own.

pub mod legacy;
#[cfg(feature = "bit-plane")]
pub mod lsb;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TracemarkError};

/// Image embedding strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageStrategy {
    NativeBitPlane,
    LegacyAppend,
}

impl ImageStrategy {
    /// Detect the best strategy this build supports.
    pub fn detect() -> Self {
        if cfg!(feature = "bit-plane") {
            Self::NativeBitPlane
        } else {
            Self::LegacyAppend
        }
    }

    /// Whether files produced with this strategy can be relied upon.
    pub fn is_authoritative(self) -> bool {
        matches!(self, Self::NativeBitPlane)
    }
}

impl std::fmt::Display for ImageStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NativeBitPlane => write!(f, "bit-plane"),
            Self::LegacyAppend => write!(f, "legacy-append"),
        }
    }
}

/// Result of embedding into an image.
#[derive(Debug, Clone)]
pub struct ImageEmbedding {
    pub bytes: Vec<u8>,
    pub strategy: ImageStrategy,
}

/// Image embedding engine bound to one strategy.
#[derive(Debug, Clone, Copy)]
pub struct ImageEmbedder {
    strategy: ImageStrategy,
}

impl Default for ImageEmbedder {
    fn default() -> Self {
        Self::detected()
    }
}

impl ImageEmbedder {
    pub fn new(strategy: ImageStrategy) -> Self {
        Self { strategy }
    }

    /// Engine using [`ImageStrategy::detect`].
    pub fn detected() -> Self {
        Self::new(ImageStrategy::detect())
    }

    pub fn strategy(&self) -> ImageStrategy {
        self.strategy
    }

    /// Embed with the configured strategy.
    ///
    /// The result is tagged with the strategy used so callers can refuse
    /// non-authoritative output.
    pub fn embed(&self, image_bytes: &[u8], signed_payload: &str) -> Result<ImageEmbedding> {
        let bytes = match self.strategy {
            ImageStrategy::NativeBitPlane => embed_bit_plane(image_bytes, signed_payload)?,
            ImageStrategy::LegacyAppend => self.embed_legacy(image_bytes, signed_payload)?,
        };
        Ok(ImageEmbedding {
            bytes,
            strategy: self.strategy,
        })
    }

    /// Bit-plane embedding only. Fails with `NativeUnavailable` instead of
    /// falling back when this engine is bound to the legacy strategy.
    pub fn embed_native(&self, image_bytes: &[u8], signed_payload: &str) -> Result<Vec<u8>> {
        self.require_native()?;
        embed_bit_plane(image_bytes, signed_payload)
    }

    /// Legacy append embedding, produced only when explicitly requested.
    pub fn embed_legacy(&self, image_bytes: &[u8], signed_payload: &str) -> Result<Vec<u8>> {
        tracing::warn!("Embedding legacy append watermark (non-authoritative)");
        legacy::append(image_bytes, signed_payload)
    }

    /// Async bit-plane embedding; never downgrades.
    #[cfg(feature = "async")]
    pub async fn embed_async(&self, image_bytes: Vec<u8>, signed_payload: String) -> Result<Vec<u8>> {
        self.require_native()?;
        tokio::task::spawn_blocking(move || embed_bit_plane(&image_bytes, &signed_payload))
            .await
            .map_err(|e| TracemarkError::TaskJoin(e.to_string()))?
    }

    /// File-based variant for large carriers: reads `source`, writes a new
    /// file at `destination`.
    pub fn embed_file(
        &self,
        source: &Path,
        destination: &Path,
        signed_payload: &str,
    ) -> Result<ImageStrategy> {
        match self.strategy {
            ImageStrategy::NativeBitPlane => {
                embed_bit_plane_file(source, destination, signed_payload)?;
            }
            ImageStrategy::LegacyAppend => {
                tracing::warn!("Embedding legacy append watermark (non-authoritative)");
                let bytes = std::fs::read(source)?;
                std::fs::write(destination, legacy::append(&bytes, signed_payload)?)?;
            }
        }
        Ok(self.strategy)
    }

    fn require_native(&self) -> Result<()> {
        match self.strategy {
            ImageStrategy::NativeBitPlane => Ok(()),
            ImageStrategy::LegacyAppend => Err(TracemarkError::NativeUnavailable),
        }
    }
}

/// Produce a clean display copy by removing a legacy trailing chunk.
pub fn strip_legacy_watermark(image_bytes: &[u8]) -> Vec<u8> {
    legacy::strip(image_bytes)
}

#[cfg(feature = "bit-plane")]
pub(crate) fn embed_bit_plane(image_bytes: &[u8], signed_payload: &str) -> Result<Vec<u8>> {
    lsb::embed(image_bytes, signed_payload)
}

#[cfg(not(feature = "bit-plane"))]
pub(crate) fn embed_bit_plane(_image_bytes: &[u8], _signed_payload: &str) -> Result<Vec<u8>> {
    Err(TracemarkError::NativeUnavailable)
}

#[cfg(feature = "bit-plane")]
fn embed_bit_plane_file(source: &Path, destination: &Path, signed_payload: &str) -> Result<()> {
    lsb::embed_file(source, destination, signed_payload)
}

#[cfg(not(feature = "bit-plane"))]
fn embed_bit_plane_file(_source: &Path, _destination: &Path, _signed_payload: &str) -> Result<()> {
    Err(TracemarkError::NativeUnavailable)
}

/// Bit-plane extraction; `NativeUnavailable` when not compiled in.
#[cfg(feature = "bit-plane")]
pub(crate) fn extract_bit_plane(image_bytes: &[u8]) -> Result<Option<String>> {
    lsb::extract(image_bytes)
}

#[cfg(not(feature = "bit-plane"))]
pub(crate) fn extract_bit_plane(_image_bytes: &[u8]) -> Result<Option<String>> {
    Err(TracemarkError::NativeUnavailable)
}

#[cfg(feature = "bit-plane")]
pub(crate) fn extract_bit_plane_file(path: &Path) -> Result<Option<String>> {
    lsb::extract_file(path)
}

#[cfg(not(feature = "bit-plane"))]
pub(crate) fn extract_bit_plane_file(_path: &Path) -> Result<Option<String>> {
    Err(TracemarkError::NativeUnavailable)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIGNED: &str = "doc|a@b.co|1|none|0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";

    #[test]
    fn test_detect_matches_build() {
        let expected = if cfg!(feature = "bit-plane") {
            ImageStrategy::NativeBitPlane
        } else {
            ImageStrategy::LegacyAppend
        };
        assert_eq!(ImageStrategy::detect(), expected);
        assert_eq!(ImageEmbedder::default().strategy(), expected);
    }

    #[test]
    fn test_legacy_engine_refuses_native_entry_point() {
        let engine = ImageEmbedder::new(ImageStrategy::LegacyAppend);
        assert!(matches!(
            engine.embed_native(b"bytes", SIGNED),
            Err(TracemarkError::NativeUnavailable)
        ));
    }

    #[test]
    fn test_legacy_engine_tags_output() {
        let engine = ImageEmbedder::new(ImageStrategy::LegacyAppend);
        let result = engine.embed(b"\x89PNG....", SIGNED).unwrap();
        assert_eq!(result.strategy, ImageStrategy::LegacyAppend);
        assert!(!result.strategy.is_authoritative());
        assert_eq!(legacy::extract(&result.bytes).as_deref(), Some(SIGNED));
    }

    #[cfg(feature = "async")]
    #[tokio::test]
    async fn test_async_entry_point_never_downgrades() {
        let engine = ImageEmbedder::new(ImageStrategy::LegacyAppend);
        let err = engine
            .embed_async(b"bytes".to_vec(), SIGNED.to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, TracemarkError::NativeUnavailable));
    }

    #[test]
    fn test_strategy_display() {
        assert_eq!(ImageStrategy::NativeBitPlane.to_string(), "bit-plane");
        assert_eq!(ImageStrategy::LegacyAppend.to_string(), "legacy-append");
    }
}
