//! Tracemark CLI - recipient watermarking and leak attribution tool.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

mod commands;
mod exit_codes;
mod utils;

use exit_codes::ExitStatus;

const EXIT_CODES_HELP: &str = "\
Exit codes:
  0   Success
  1   General error
  64  Usage error
  65  Verification failed or no watermark found
  66  Cannot read input file
  69  Required capability unavailable (bit-plane embedding)
  74  Cannot write output file";

#[derive(Parser)]
#[command(name = "tracemark")]
#[command(author, version, about = "Recipient watermarking and leak attribution", long_about = None)]
#[command(after_help = EXIT_CODES_HELP)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Suppress human-readable output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a random 256-bit watermark key
    Keygen {
        /// Write the key to this file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Build and sign a payload for one recipient
    Issue {
        /// Document identifier
        #[arg(short, long)]
        document: String,

        /// Recipient email (normalized to lower case)
        #[arg(short, long)]
        email: String,

        /// Device identifier to bind the copy to
        #[arg(long)]
        device: Option<String>,

        /// Salt prefixed to the device identifier before hashing
        #[arg(long, env = "TRACEMARK_DEVICE_SALT", default_value = "", hide_env_values = true)]
        device_salt: String,

        /// Hex-encoded signing key
        #[arg(short, long, env = "TRACEMARK_KEY", hide_env_values = true)]
        key: String,

        /// Print the full issuance record as JSON
        #[arg(long)]
        json: bool,
    },

    /// Embed a signed payload into an image or document
    Embed {
        /// Carrier file (PNG, JPEG, GIF, WebP, TXT, MD, DOCX, PDF)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Signed payload produced by `issue`
        #[arg(short, long)]
        payload: String,

        /// Output path (defaults to <FILE>.marked.<ext>, PNG for images)
        #[arg(short, long, value_name = "OUT")]
        output: Option<PathBuf>,

        /// Check the payload signature with this key before embedding
        #[arg(short, long, env = "TRACEMARK_KEY", hide_env_values = true)]
        key: Option<String>,

        /// Accept a legacy (strippable) image mark when bit-plane is unavailable
        #[arg(long)]
        allow_legacy: bool,

        /// Show what would be written without writing it
        #[arg(short = 'n', long)]
        dry_run: bool,
    },

    /// Recover a watermark from a file
    Extract {
        /// File to inspect
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Verify a watermark's signature locally
    Verify {
        /// Watermarked file (omit when passing --payload)
        #[arg(value_name = "FILE", required_unless_present = "payload")]
        file: Option<PathBuf>,

        /// Verify this payload text instead of extracting one
        #[arg(short, long, conflicts_with = "file")]
        payload: Option<String>,

        /// Hex-encoded key the payload was signed with
        #[arg(short, long, env = "TRACEMARK_KEY", hide_env_values = true)]
        key: String,

        /// Expected document identifier
        #[arg(short, long)]
        document: Option<String>,
    },

    /// Remove a legacy appended image watermark
    Strip {
        /// Image carrying a legacy mark
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output path (defaults to <FILE stem>.clean.<ext>)
        #[arg(short, long, value_name = "OUT")]
        output: Option<PathBuf>,
    },
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = if verbose == 0 {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
    } else {
        EnvFilter::new(default_level)
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let quiet = cli.quiet;

    let result = match cli.command {
        Commands::Keygen { output } => commands::keygen::execute(output, quiet),
        Commands::Issue {
            document,
            email,
            device,
            device_salt,
            key,
            json,
        } => commands::issue::execute(commands::issue::IssueArgs {
            document,
            email,
            device,
            device_salt,
            key,
            json,
            quiet,
        }),
        Commands::Embed {
            file,
            payload,
            output,
            key,
            allow_legacy,
            dry_run,
        } => commands::embed::execute(commands::embed::EmbedArgs {
            file,
            payload,
            output,
            key,
            allow_legacy,
            dry_run,
            quiet,
        }),
        Commands::Extract { file, json } => commands::extract::execute(file, json, quiet),
        Commands::Verify {
            file,
            payload,
            key,
            document,
        } => commands::verify::execute(file, payload, key, document, quiet),
        Commands::Strip { file, output } => commands::strip::execute(file, output, quiet),
    };

    match result {
        Ok(()) => ExitStatus::Success.into(),
        Err(err) => {
            eprintln!("{} {:#}", "Error:".red().bold(), err);
            ExitStatus::classify(&err).into()
        }
    }
}
