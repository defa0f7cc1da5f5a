//! Keygen command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;
use tracing::info;

use crate::utils::write_output;

/// Execute the keygen command.
pub fn execute(output: Option<PathBuf>, quiet: bool) -> Result<()> {
    let key = tracemark_core::generate_key_hex().context("Failed to generate key")?;

    match output {
        Some(path) => {
            write_output(&path, format!("{}\n", key).as_bytes())?;
            info!(path = %path.display(), "Key written");
            if !quiet {
                println!("{} {}", "Key saved:".green().bold(), path.display());
                println!(
                    "   {} {}",
                    "Use with:".dimmed(),
                    format!("export TRACEMARK_KEY=$(cat {})", path.display())
                );
            }
        }
        None => println!("{}", key),
    }

    Ok(())
}
