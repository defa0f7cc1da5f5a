//! Issue command implementation.

use anyhow::{Context, Result};
use colored::Colorize;
use tracemark_core::{issue_now, DeviceHasher, Sha256DeviceHasher, WatermarkKey};
use tracing::info;

use crate::utils::{format_timestamp, short_hex};

pub struct IssueArgs {
    pub document: String,
    pub email: String,
    pub device: Option<String>,
    pub device_salt: String,
    pub key: String,
    pub json: bool,
    pub quiet: bool,
}

/// Execute the issue command.
///
/// Prints the signed payload on stdout so it can be piped into `embed`.
pub fn execute(args: IssueArgs) -> Result<()> {
    WatermarkKey::from_hex(&args.key).context("Invalid key")?;

    let device_hash = args
        .device
        .as_deref()
        .map(|id| Sha256DeviceHasher::with_salt(args.device_salt.as_str()).hash_device(id.trim()))
        .unwrap_or_default();

    let issued = issue_now(&args.document, &args.email, &device_hash, &args.key)
        .context("Invalid payload")?;

    info!(
        document_id = %issued.payload.document_id,
        device_bound = !device_hash.is_empty(),
        "Payload issued"
    );

    if args.json {
        let json =
            serde_json::to_string_pretty(&issued).context("Failed to serialize issuance")?;
        println!("{}", json);
        return Ok(());
    }

    println!("{}", issued.signed_payload);

    if !args.quiet {
        eprintln!();
        eprintln!("{}", "Payload signed".green().bold());
        eprintln!("   {} {}", "Recipient:".dimmed(), issued.payload.recipient_email);
        eprintln!(
            "   {} {}",
            "Issued at:".dimmed(),
            format_timestamp(issued.payload.issued_at_ms)
        );
        eprintln!(
            "   {} {}",
            "Watermark hash:".dimmed(),
            short_hex(&issued.watermark_hash)
        );
        if !device_hash.is_empty() {
            eprintln!("   {} {}", "Device hash:".dimmed(), short_hex(&device_hash));
        }
    }

    Ok(())
}
