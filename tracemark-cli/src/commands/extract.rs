//! Extract command implementation.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use colored::Colorize;
use serde::Serialize;
use tracemark_core::{extract, ExtractionMethod, ImageStrategy};
use tracing::info;

use crate::utils::{detect_carrier, read_input};

#[derive(Serialize)]
struct ExtractOutput<'a> {
    file: String,
    carrier: String,
    found: bool,
    authoritative: bool,
    method: ExtractionMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a str>,
}

/// Execute the extract command.
///
/// The payload goes to stdout; a file without one fails with exit code 65.
pub fn execute(file: PathBuf, json: bool, quiet: bool) -> Result<()> {
    let content = read_input(&file)?;
    let carrier = detect_carrier(&file, &content)?;
    let extraction = extract(&content, carrier, ImageStrategy::detect());

    info!(
        carrier = %carrier,
        method = %extraction.method,
        found = extraction.is_found(),
        "Extraction finished"
    );

    if json {
        let output = ExtractOutput {
            file: file.display().to_string(),
            carrier: carrier.to_string(),
            found: extraction.is_found(),
            authoritative: extraction.is_authoritative(),
            method: extraction.method,
            data: extraction.data.as_deref(),
        };
        let rendered =
            serde_json::to_string_pretty(&output).context("Failed to serialize result")?;
        println!("{}", rendered);
    }

    let Some(data) = extraction.data.as_deref() else {
        bail!("No watermark found in {}", file.display());
    };

    if !json {
        println!("{}", data);
        if !quiet {
            eprintln!("   {} {}", "Method:".dimmed(), extraction.method);
            if !extraction.is_authoritative() {
                eprintln!(
                    "{}",
                    "Recovered from a legacy trailing chunk: not authoritative".yellow()
                );
            }
        }
    }

    Ok(())
}
