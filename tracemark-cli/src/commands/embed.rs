//! Embed command implementation.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use colored::Colorize;
use tracemark_core::{parse_signed, verify, ImageEmbedder, ImageStrategy, TracemarkError, Watermarker};
use tracing::{debug, info, warn};

use crate::utils::{build_marked_path, detect_carrier, read_input, write_output};

pub struct EmbedArgs {
    pub file: PathBuf,
    pub payload: String,
    pub output: Option<PathBuf>,
    pub key: Option<String>,
    pub allow_legacy: bool,
    pub dry_run: bool,
    pub quiet: bool,
}

/// Execute the embed command.
pub fn execute(args: EmbedArgs) -> Result<()> {
    let signed = args.payload.trim();
    let payload = parse_signed(signed).context("Invalid payload")?;

    if let Some(key) = args.key.as_deref() {
        let verification = verify(Some(signed), key);
        if !verification.valid {
            bail!(
                "Verification failed: {}",
                verification.error.unwrap_or_default()
            );
        }
        debug!("Payload signature checked before embedding");
    }

    let content = read_input(&args.file)?;
    let carrier = detect_carrier(&args.file, &content)?;
    let output = args
        .output
        .unwrap_or_else(|| build_marked_path(&args.file, carrier));

    let strategy = ImageStrategy::detect();
    let watermarker = Watermarker::new(ImageEmbedder::new(strategy), args.allow_legacy);

    if args.dry_run {
        println!("{}", "[DRY RUN] Nothing will be written".yellow().bold());
        println!("   {} {}", "Input file:".dimmed(), args.file.display());
        println!("   {} {}", "Carrier:".dimmed(), carrier);
        if carrier.is_image() {
            println!("   {} {}", "Image strategy:".dimmed(), strategy);
        }
        println!("   {} {}", "Document:".dimmed(), payload.document_id);
        println!("   {} {}", "Recipient:".dimmed(), payload.recipient_email);
        println!("   {} {}", "Output file:".dimmed(), output.display());
        return Ok(());
    }

    let artifact = match watermarker.embed(&content, carrier, signed) {
        Ok(artifact) => artifact,
        Err(TracemarkError::NativeUnavailable) => {
            bail!("Bit-plane embedding is unavailable in this build; pass --allow-legacy to write a strippable mark")
        }
        Err(e) => return Err(e).context("Failed to embed watermark"),
    };

    write_output(&output, &artifact.bytes)?;
    info!(
        carrier = %carrier,
        authoritative = artifact.is_authoritative(),
        bytes = artifact.bytes.len(),
        path = %output.display(),
        "Watermark embedded"
    );

    if !artifact.is_authoritative() {
        warn!("Legacy image mark written; it can be stripped and is not authoritative");
        if !args.quiet {
            eprintln!(
                "{}",
                "Legacy mark written: anyone can strip it. Do not rely on it as evidence.".yellow()
            );
        }
    }

    if !args.quiet {
        println!();
        println!("{}", "Watermark embedded".green().bold());
        println!();
        println!("   {} {}", "Output:".dimmed(), output.display());
        println!("   {} {}", "Carrier:".dimmed(), carrier);
        if let Some(strategy) = artifact.image_strategy {
            println!("   {} {}", "Strategy:".dimmed(), strategy);
        }
        println!("   {} {}", "Recipient:".dimmed(), payload.recipient_email);
    }

    Ok(())
}
