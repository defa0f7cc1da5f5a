//! Strip command implementation.

use std::path::PathBuf;

use anyhow::{bail, Result};
use colored::Colorize;
use tracemark_core::strip_legacy_watermark;
use tracing::info;

use crate::utils::{build_clean_path, read_input, write_output};

/// Execute the strip command.
///
/// Only legacy appended marks can be removed this way; bit-plane marks are
/// part of the pixels. The input file is never modified.
pub fn execute(file: PathBuf, output: Option<PathBuf>, quiet: bool) -> Result<()> {
    let content = read_input(&file)?;
    let stripped = strip_legacy_watermark(&content);

    if stripped.len() == content.len() {
        bail!("No watermark found in {}: no legacy mark to strip", file.display());
    }

    let output = output.unwrap_or_else(|| build_clean_path(&file));
    if output == file {
        bail!("Refusing to overwrite the input file; pick another --output");
    }
    write_output(&output, &stripped)?;

    let removed = content.len() - stripped.len();
    info!(path = %output.display(), removed_bytes = removed, "Legacy mark stripped");

    if !quiet {
        println!(
            "{} {} ({} bytes removed)",
            "Stripped:".green().bold(),
            output.display(),
            removed
        );
    }

    Ok(())
}
