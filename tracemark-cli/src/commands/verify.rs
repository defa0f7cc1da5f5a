//! Verify command implementation.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use colored::Colorize;
use tracemark_core::{extract, hash, verify, ImageStrategy, WatermarkKey};
use tracing::{error, info, warn};

use crate::utils::{detect_carrier, format_timestamp, read_input, short_hex};

/// Execute the verify command.
///
/// Checks only the HMAC signature. Whether the copy was actually issued is
/// decided server-side against the forensic record.
pub fn execute(
    file: Option<PathBuf>,
    payload: Option<String>,
    key: String,
    document: Option<String>,
    quiet: bool,
) -> Result<()> {
    WatermarkKey::from_hex(&key).context("Invalid key")?;

    let (signed, authoritative) = match (payload, file) {
        (Some(text), _) => (text.trim().to_string(), true),
        (None, Some(file)) => {
            let content = read_input(&file)?;
            let carrier = detect_carrier(&file, &content)?;
            let extraction = extract(&content, carrier, ImageStrategy::detect());
            let authoritative = extraction.is_authoritative();
            match extraction.data {
                Some(data) => (data, authoritative),
                None => bail!("No watermark found in {}", file.display()),
            }
        }
        (None, None) => bail!("Pass a FILE or --payload"),
    };

    let result = verify(Some(&signed), &key);

    let payload = match (result.valid, result.payload) {
        (true, Some(payload)) => payload,
        _ => {
            let reason = result.error.unwrap_or_else(|| "signature mismatch".into());
            error!(reason = %reason, "Signature verification failed");
            if !quiet {
                println!();
                println!("{}", "╔════════════════════════════════════════╗".red());
                println!(
                    "{}",
                    "║               INVALID                  ║".red().bold()
                );
                println!("{}", "╚════════════════════════════════════════╝".red());
                println!();
                println!("   {} {}", "Reason:".dimmed(), reason.red());
            }
            bail!("Verification failed: {}", reason);
        }
    };

    if let Some(expected) = document.as_deref() {
        if payload.document_id != expected {
            bail!(
                "Verification failed: payload belongs to document '{}', expected '{}'",
                payload.document_id,
                expected
            );
        }
    }

    info!(document_id = %payload.document_id, "Signature valid");
    if !authoritative {
        warn!("Payload recovered from a legacy trailing chunk");
    }

    if !quiet {
        println!();
        println!("{}", "╔════════════════════════════════════════╗".green());
        println!(
            "{}",
            "║               AUTHENTIC                ║".green().bold()
        );
        println!("{}", "╚════════════════════════════════════════╝".green());
        println!();
        println!("   {} {}", "Signature:".dimmed(), "Valid (HMAC-SHA256)".green());
        println!("   {} {}", "Document:".dimmed(), payload.document_id);
        println!("   {} {}", "Recipient:".dimmed(), payload.recipient_email);
        println!(
            "   {} {}",
            "Issued at:".dimmed(),
            format_timestamp(payload.issued_at_ms)
        );
        println!("   {} {}", "Device:".dimmed(), payload.device_hash);
        println!(
            "   {} {}",
            "Watermark hash:".dimmed(),
            short_hex(&hash(&signed))
        );
        if !authoritative {
            println!(
                "   {} {}",
                "Source:".dimmed(),
                "legacy trailing chunk (not authoritative)".yellow()
            );
        }
    }

    Ok(())
}
