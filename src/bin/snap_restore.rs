//! # snap_restore - rebuild a directory tree from a snapshot
//!
//! ## Usage
//! ```bash
//! # Restore a full or incremental snapshot into ./restored
//! snap_restore /backups/project/2024-03-02_09-00-00 ./restored
//! ```
//!
//! An incremental snapshot is merged with the full snapshot preceding it;
//! entries from the incremental snapshot win.

use clap::Parser;
use colored::*;
use humantime::format_duration;
use indicatif::{ProgressBar, ProgressStyle};
use snapchain::{format_bytes, Result, SnapChain};
use std::path::PathBuf;
use std::time::Duration;

/// Restore a snapshot into a directory
#[derive(Parser)]
#[command(name = "snap_restore")]
#[command(version)]
#[command(about = "Reconstruct a directory tree from a full or incremental snapshot")]
#[command(long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Snapshot directory to restore
    #[arg(value_name = "FROM")]
    from: PathBuf,

    /// Destination directory (created if missing)
    #[arg(value_name = "TO")]
    to: PathBuf,
}

fn main() {
    let cli = Cli::parse();

    snapchain::logging::init(cli.verbose);

    if std::env::var("NO_COLOR").is_ok() {
        colored::control::set_override(false);
    }

    if let Err(e) = run(cli) {
        eprintln!("{}: {}", "Error".red().bold(), e.user_message());
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let chain = SnapChain::new();

    let progress = if cli.json {
        None
    } else {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(style);
        }
        pb.set_message("Restoring files...");
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    };

    let result = chain.restore(&cli.from, &cli.to);

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }
    let result = result?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!(
        "{} Restored {} snapshot {}",
        "✓".green().bold(),
        result.snapshot.kind,
        result.snapshot.id.to_string().yellow().bold()
    );
    if let Some(base) = &result.base {
        println!("  Base: {}", base.id.to_string().cyan());
        println!(
            "  Entries: {} from snapshot, {} from base",
            result.from_snapshot.entries().to_string().cyan(),
            result.from_base.entries().to_string().cyan()
        );
    } else {
        println!("  Entries: {}", result.entries_restored().to_string().cyan());
    }
    println!("  Bytes written: {}", format_bytes(result.bytes_written()).cyan());
    println!("  Destination: {}", result.destination.display().to_string().cyan());
    println!(
        "  Time: {}",
        format_duration(Duration::from_millis(result.duration_ms)).to_string().cyan()
    );

    Ok(())
}
