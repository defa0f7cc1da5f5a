//! Tracemark Core - signed, recipient-specific invisible watermarks
//!
//! This crate builds, signs, embeds and recovers the payload that ties a
//! distributed copy of a file to its recipient.
//!
//! # Features
//!
//! - HMAC-SHA256 signed `|`-delimited payloads with constant-time checks
//! - Blue-channel bit-plane embedding for raster images (`bit-plane`)
//! - Invisible-character embedding for plain text, DOCX and PDF
//! - Tagged extraction with a bounded legacy fallback for images
//! - Async entry points on the blocking pool (`async`)
//!
//! # Example
//!
//! ```
//! use tracemark_core::{extract, issue, CarrierKind, DocumentFormat, ImageStrategy, Watermarker};
//!
//! # fn example() -> tracemark_core::Result<()> {
//! let key_hex = tracemark_core::generate_key_hex()?;
//! let issued = issue("doc-42", "Alice@Example.com", "", &key_hex, 1_700_000_000_000)?;
//!
//! let carrier = CarrierKind::Document(DocumentFormat::PlainText);
//! let artifact = Watermarker::default().embed(b"Board minutes", carrier, &issued.signed_payload)?;
//!
//! let recovered = extract(&artifact.bytes, carrier, ImageStrategy::detect());
//! let verification = tracemark_core::verify(recovered.data.as_deref(), &key_hex);
//! assert!(verification.valid);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

pub mod carrier;
pub mod codec;
pub mod document;
pub mod error;
pub mod extract;
pub mod framing;
pub mod issue;
pub mod keys;
pub mod payload;
pub mod raster;
pub mod signer;

// Re-export main types for convenience
pub use carrier::CarrierKind;
pub use document::DocumentFormat;
pub use error::{Result, TracemarkError};
pub use extract::{extract, extract_document, extract_image, extract_text, Extraction, ExtractionMethod};
pub use framing::{is_valid_wrapped_message, unwrap, wrap, END_SENTINEL, START_SENTINEL};
pub use issue::{issue, issue_now, EmbeddedArtifact, IssuedWatermark, Watermarker};
pub use keys::{
    generate_key_hex, DerivedKeyProvider, DeviceHasher, KeyProvider, Sha256DeviceHasher,
    WatermarkKey,
};
pub use payload::{build_unsigned, parse_signed, WatermarkPayload};
pub use raster::{strip_legacy_watermark, ImageEmbedder, ImageEmbedding, ImageStrategy};
pub use signer::{hash, sign, sign_payload, verify, PayloadVerification};

#[cfg(feature = "async")]
pub use extract::extract_async;

#[cfg(feature = "bit-plane")]
pub use raster::lsb::MAX_IMAGE_DIMENSION;

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

    /// Integration test: issue, embed into every document format, extract, verify.
    #[test]
    fn test_full_document_workflow() {
        let issued = issue("doc-7", "bob@example.com", "dev-hash", KEY, 1_700_000_000_000)
            .expect("issue");

        let carriers: [(&[u8], DocumentFormat); 3] = [
            (b"Plain memo", DocumentFormat::PlainText),
            (b"PK\x03\x04<w:body><w:p/></w:body>", DocumentFormat::Docx),
            (b"%PDF-1.7\n1 0 obj\n%%EOF\n", DocumentFormat::Pdf),
        ];

        for (bytes, format) in carriers {
            let carrier = CarrierKind::Document(format);
            let artifact = Watermarker::default()
                .embed(bytes, carrier, &issued.signed_payload)
                .expect("embed");
            let extraction = extract(&artifact.bytes, carrier, ImageStrategy::detect());
            assert_eq!(extraction.method, ExtractionMethod::Invisible);

            let verification = verify(extraction.data.as_deref(), KEY);
            assert!(verification.valid, "{}: {:?}", format, verification.error);
            assert_eq!(
                hash(extraction.data.as_deref().unwrap_or_default()),
                issued.watermark_hash
            );
        }
    }

    #[test]
    fn test_tampered_payload_is_rejected() {
        let issued = issue("doc-7", "bob@example.com", "", KEY, 1).expect("issue");
        let tampered = issued.signed_payload.replace("bob@", "eve@");
        assert!(!verify(Some(&tampered), KEY).valid);
    }
}
