//! # snap_backup - take a full or incremental snapshot
//!
//! ## Usage
//! ```bash
//! # Full snapshot of ./project into /backups/project
//! snap_backup --full ./project /backups/project
//!
//! # Only what changed since the latest full snapshot
//! snap_backup --increment ./project /backups/project
//!
//! # Machine-readable outcome
//! snap_backup -i --json ./project /backups/project
//! ```

use clap::Parser;
use colored::*;
use humantime::format_duration;
use indicatif::{ProgressBar, ProgressStyle};
use snapchain::{format_bytes, CopyStats, Result, SnapChain, SnapshotOutcome};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Snapshot a directory tree into a backup root
#[derive(Parser)]
#[command(name = "snap_backup")]
#[command(version)]
#[command(about = "Take a full or incremental snapshot of a directory")]
#[command(long_about = None)]
struct Cli {
    /// Copy the whole source tree
    #[arg(short, long)]
    full: bool,

    /// Copy only entries changed since the latest full snapshot
    #[arg(short, long)]
    increment: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Print the outcome as JSON
    #[arg(long)]
    json: bool,

    /// Directory to snapshot
    #[arg(value_name = "FROM")]
    from: PathBuf,

    /// Backup root receiving the snapshot
    #[arg(value_name = "TO")]
    to: PathBuf,
}

/// What the user asked for once the two flags are reconciled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Full,
    Incremental,
}

fn main() {
    let cli = Cli::parse();

    snapchain::logging::init(cli.verbose);

    // Disable colors if needed
    if std::env::var("NO_COLOR").is_ok() {
        colored::control::set_override(false);
    }

    if let Err(e) = run(cli) {
        eprintln!("{}: {}", "Error".red().bold(), e.user_message());
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mode = match (cli.full, cli.increment) {
        (true, false) => Mode::Full,
        (false, true) => Mode::Incremental,
        (true, true) => {
            eprintln!(
                "{}",
                "Both --full and --increment given; performing full backup".yellow()
            );
            Mode::Full
        }
        (false, false) => {
            eprintln!("{}", "Performing full backup due to unspecified options".blue());
            Mode::Full
        }
    };

    let chain = SnapChain::new();
    let start = Instant::now();
    let progress = if cli.json { None } else { Some(spinner(mode)) };

    let outcome = match mode {
        Mode::Full => chain
            .full_snapshot(&cli.from, &cli.to)
            .map(SnapshotOutcome::PerformedFull),
        Mode::Incremental => chain.incremental_snapshot(&cli.from, &cli.to),
    };

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }
    let outcome = outcome?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    report(&outcome, &cli.to, start.elapsed());
    Ok(())
}

fn spinner(mode: Mode) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(match mode {
        Mode::Full => "Copying source tree...",
        Mode::Incremental => "Comparing against latest full snapshot...",
    });
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn report(outcome: &SnapshotOutcome, backup_root: &Path, elapsed: Duration) {
    match outcome {
        SnapshotOutcome::PerformedFull(full) => {
            println!(
                "{} Created full snapshot {}",
                "✓".green().bold(),
                full.snapshot.id.to_string().yellow().bold()
            );
            print_copy_stats(&full.stats);
        }
        SnapshotOutcome::Created { snapshot, base, stats } => {
            println!(
                "{} Created incremental snapshot {}",
                "✓".green().bold(),
                snapshot.id.to_string().yellow().bold()
            );
            println!("  Base: {}", base.id.to_string().cyan());
            println!(
                "  Entries: {} new, {} changed, {} unchanged",
                stats.entries_new.to_string().cyan(),
                stats.entries_changed.to_string().yellow(),
                stats.entries_unchanged.to_string().cyan()
            );
            print_copy_stats(&stats.copy);
        }
        SnapshotOutcome::NoChanges { base, .. } => {
            println!(
                "{}",
                "The diff to the latest full backup is empty. Backup is not created. \
                 To force its creation, provide -f instead of -i."
                    .blue()
            );
            println!("  Latest full snapshot: {}", base.id.to_string().cyan());
        }
    }

    println!("  Backup root: {}", backup_root.display().to_string().cyan());
    println!("  Time: {}", format_duration(round_to_millis(elapsed)).to_string().cyan());
}

fn print_copy_stats(stats: &CopyStats) {
    println!(
        "  Files: {}  Directories: {}  Symlinks: {}",
        stats.files.to_string().cyan(),
        stats.directories.to_string().cyan(),
        stats.symlinks.to_string().cyan()
    );
    println!("  Size: {}", format_bytes(stats.bytes).cyan());
    if stats.skipped > 0 {
        println!("  Skipped: {}", stats.skipped.to_string().yellow());
    }
}

fn round_to_millis(duration: Duration) -> Duration {
    Duration::from_millis(duration.as_millis() as u64)
}
