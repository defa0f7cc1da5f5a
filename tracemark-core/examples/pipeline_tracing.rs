//! Example demonstrating tracing output of the watermark pipeline.
//!
//! Run with: cargo run -p tracemark-core --example pipeline_tracing

use tracing_subscriber::{fmt, EnvFilter};
use tracemark_core::{
    extract, generate_key_hex, issue_now, verify, CarrierKind, DocumentFormat, ImageStrategy,
    Watermarker,
};

fn main() -> tracemark_core::Result<()> {
    // Initialize tracing subscriber with debug level
    fmt()
        .with_env_filter(EnvFilter::new("tracemark_core=debug,info"))
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    println!("=== Tracemark Pipeline Tracing Demo ===\n");

    let key_hex = generate_key_hex()?;
    let issued = issue_now("demo-document", "reader@example.com", "", &key_hex)?;
    println!("Watermark hash: {}\n", issued.watermark_hash);

    let carrier = CarrierKind::Document(DocumentFormat::Pdf);
    let pdf = b"%PDF-1.7\n1 0 obj\n<<>>\nendobj\n%%EOF\n";
    let artifact = Watermarker::default().embed(pdf, carrier, &issued.signed_payload)?;
    println!("Embedded {} bytes into {}\n", artifact.bytes.len(), carrier);

    let extraction = extract(&artifact.bytes, carrier, ImageStrategy::detect());
    println!("Extraction method: {}", extraction.method);

    let verification = verify(extraction.data.as_deref(), &key_hex);
    println!("Signature valid: {}", verification.valid);

    println!("\n=== Demo Complete ===");
    Ok(())
}
