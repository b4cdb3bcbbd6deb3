//! folderprof - profile a folder for duplicates, clutter and overall health.
//!
//! Usage:
//!   folderprof analyze [PATH]      Full report with recommendations
//!   folderprof duplicates [PATH]   Exact duplicate groups
//!   folderprof health [PATH]       Health score only
//!   folderprof --help              Show help

use std::fmt::Write as _;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use folderprof_analyze::{AnalysisConfig, AnalysisReport, AnalysisStatus, Analyzer, FingerprintProgress};
use folderprof_scan::{FileTree, JwalkScanner, ScanConfig, ScanProgress};

const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// 128 + SIGINT.
const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Environment variable holding the log filter.
const LOG_ENV: &str = "FOLDERPROF_LOG";

#[derive(Parser)]
#[command(
    name = "folderprof",
    version,
    about = "Find duplicates, near-duplicates and clutter in a folder",
    long_about = "folderprof fingerprints every file below a folder, groups exact and \
                  near duplicates, and turns what it finds into prioritized cleanup \
                  recommendations and a 0-100 health score.\n\n\
                  Set FOLDERPROF_LOG (e.g. `debug`) for diagnostic output on stderr."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Full analysis with recommendations
    Analyze {
        #[command(flatten)]
        common: CommonArgs,

        /// Number of recommendations to show in text output
        #[arg(short = 'n', long, default_value = "25")]
        top: usize,
    },

    /// List exact duplicate groups
    Duplicates {
        #[command(flatten)]
        common: CommonArgs,

        /// Maximum number of duplicate groups to show
        #[arg(short = 'n', long, default_value = "20")]
        top: usize,
    },

    /// Show the health score
    Health {
        #[command(flatten)]
        common: CommonArgs,
    },
}

#[derive(Args)]
struct CommonArgs {
    /// Folder to analyze
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Minimum similarity (0.0-1.0) for near-duplicates
    #[arg(short = 't', long, default_value = "0.85")]
    threshold: f64,

    /// Directory depth beyond which nesting is reported
    #[arg(short = 'd', long, default_value = "10")]
    depth: u32,

    /// Minimum age in days before temp files are reported
    #[arg(long, default_value = "7")]
    temp_age_days: u64,

    /// Worker threads for fingerprinting (0 = one per CPU)
    #[arg(short = 'j', long, default_value = "0")]
    threads: usize,

    /// Glob patterns to skip while scanning (repeatable)
    #[arg(short = 'i', long = "ignore")]
    ignore: Vec<String>,

    /// File with ignore patterns, one per line
    #[arg(long)]
    ignore_file: Option<PathBuf>,

    /// Output format
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    /// Write the report to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    init_logging();

    let cli = Cli::parse();

    let cancel = CancellationToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
        if should_exit_on_interrupt(&handler_token) {
            std::process::exit(INTERRUPTED_EXIT_CODE);
        }
        eprintln!("\nInterrupted, finishing with a partial report...");
    })
    .context("Failed to install Ctrl-C handler")?;

    match cli.command {
        Command::Analyze { common, top } => {
            let report = run_analysis(&common, &cancel)?;
            let rendered = match common.format {
                OutputFormat::Text => render_analysis(&report, top)?,
                OutputFormat::Json => serde_json::to_string_pretty(&report)?,
            };
            emit(&rendered, common.output.as_deref())?;
        }
        Command::Duplicates { common, top } => {
            let report = run_analysis(&common, &cancel)?;
            let rendered = match common.format {
                OutputFormat::Text => render_duplicates(&report, top)?,
                OutputFormat::Json => serde_json::to_string_pretty(&report.duplicates)?,
            };
            emit(&rendered, common.output.as_deref())?;
        }
        Command::Health { common } => {
            let report = run_analysis(&common, &cancel)?;
            let rendered = match common.format {
                OutputFormat::Text => render_health(&report)?,
                OutputFormat::Json => serde_json::to_string_pretty(&report.health)?,
            };
            emit(&rendered, common.output.as_deref())?;
        }
    }

    Ok(())
}

/// First Ctrl-C cancels fingerprinting; a repeated one asks for an immediate
/// exit, since the directory walk itself cannot be cancelled.
fn should_exit_on_interrupt(token: &CancellationToken) -> bool {
    if token.is_cancelled() {
        return true;
    }
    token.cancel();
    false
}

/// Diagnostics go to stderr, filtered by `FOLDERPROF_LOG` (default `warn`).
fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Scan, then analyze with the command-line settings.
fn run_analysis(args: &CommonArgs, cancel: &CancellationToken) -> Result<AnalysisReport> {
    let path = args.path.canonicalize().context("Invalid path")?;
    let tree = scan(&path, args)?;

    let config = AnalysisConfig::builder()
        .similarity_threshold(args.threshold)
        .max_depth(args.depth)
        .temp_file_age(Duration::from_secs(args.temp_age_days * SECS_PER_DAY))
        .threads(args.threads)
        .build()
        .context("Invalid analysis settings")?;
    tracing::debug!(?config, "analysis settings");
    let analyzer = Analyzer::new(config).context("Invalid analysis settings")?;

    eprintln!("Fingerprinting {} files...", tree.entries.len());
    let progress = spawn_progress(analyzer.subscribe(), |p: &FingerprintProgress| {
        format!(
            "{}/{} files, {}",
            p.files_processed,
            p.total_files,
            format_size(p.bytes_hashed)
        )
    });
    let report = analyzer.analyze(&tree, cancel).context("Analysis failed")?;

    // Closing the channel ends the progress thread.
    drop(analyzer);
    if let Some(handle) = progress {
        let _ = handle.join();
    }

    Ok(report)
}

fn scan(path: &Path, args: &CommonArgs) -> Result<FileTree> {
    eprintln!("Scanning {}...", path.display());

    let config = ScanConfig::builder()
        .root(path)
        .ignore_patterns(args.ignore.clone())
        .ignore_file(args.ignore_file.clone())
        .threads(args.threads)
        .build()
        .context("Invalid scan settings")?;
    let scanner = JwalkScanner::new();
    let progress = spawn_progress(scanner.subscribe(), |p: &ScanProgress| {
        format!(
            "{} files, {} directories, {}",
            p.files_scanned,
            p.dirs_scanned,
            format_size(p.bytes_scanned)
        )
    });
    let tree = scanner.scan(&config);

    drop(scanner);
    if let Some(handle) = progress {
        let _ = handle.join();
    }
    let tree = tree.context("Scan failed")?;

    eprintln!(
        "Found {} files in {} directories ({}) in {:.2}s",
        tree.stats.total_files,
        tree.stats.total_dirs,
        format_size(tree.stats.total_size),
        tree.scan_duration.as_secs_f64()
    );
    if tree.has_warnings() {
        eprintln!("{} entries could not be scanned", tree.warnings.len());
    }
    Ok(tree)
}

/// Live counter on an interactive stderr, until the sender is dropped.
fn spawn_progress<T, F>(mut rx: broadcast::Receiver<T>, render: F) -> Option<JoinHandle<()>>
where
    T: Clone + Send + 'static,
    F: Fn(&T) -> String + Send + 'static,
{
    if !std::io::stderr().is_terminal() {
        return None;
    }
    Some(thread::spawn(move || {
        let mut shown = false;
        loop {
            match rx.blocking_recv() {
                Ok(progress) => {
                    eprint!("\r  {}", render(&progress));
                    shown = true;
                }
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
        if shown {
            eprintln!();
        }
    }))
}

fn emit(rendered: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(output_path) => {
            std::fs::write(output_path, rendered)
                .with_context(|| format!("Failed to write {}", output_path.display()))?;
            eprintln!("Report written to {}", output_path.display());
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

fn render_analysis(report: &AnalysisReport, top_n: usize) -> Result<String> {
    let mut out = String::new();
    let stats = &report.statistics;

    writeln!(out)?;
    writeln!(out, "{}", "─".repeat(70))?;
    writeln!(
        out,
        " {} - {}",
        report.root.display(),
        format_size(stats.total_bytes)
    )?;
    writeln!(
        out,
        " {} files, {} directories, average {}",
        stats.total_files,
        stats.total_directories,
        format_size(stats.average_file_size)
    )?;
    write_status(&mut out, report)?;
    writeln!(out, "{}", "─".repeat(70))?;
    writeln!(out)?;

    out.push_str(&render_health(report)?);
    writeln!(out)?;

    if !stats.extensions.is_empty() {
        writeln!(out, " Largest file types:")?;
        for ext in stats.extensions.iter().take(5) {
            let name = if ext.extension.is_empty() {
                "(none)"
            } else {
                ext.extension.as_str()
            };
            writeln!(
                out,
                "   {:<12} {:>10} {:>8} files",
                name,
                format_size(ext.bytes),
                ext.count
            )?;
        }
        writeln!(out)?;
    }

    if report.duplicates.has_duplicates() {
        writeln!(
            out,
            " Duplicates: {} groups, {} wasted",
            report.duplicates.group_count,
            format_size(report.duplicates.total_wasted_space)
        )?;
    }
    if !report.clusters.is_empty() {
        writeln!(out, " Near-duplicate clusters: {}", report.clusters.len())?;
    }
    writeln!(out)?;

    if report.recommendations.is_empty() {
        writeln!(out, " No recommendations. Nothing to clean up.")?;
    } else {
        let savings: u64 = report
            .recommendations
            .iter()
            .map(|r| r.estimated_savings)
            .sum();
        writeln!(
            out,
            " Recommendations ({}, up to {} reclaimable):",
            report.recommendations.len(),
            format_size(savings)
        )?;
        writeln!(out)?;

        for rec in report.recommendations.iter().take(top_n) {
            writeln!(
                out,
                "   [{:<8}] {} ({})",
                rec.priority.as_ref(),
                rec.title,
                rec.action
            )?;
            writeln!(out, "              {}", rec.rationale)?;
        }
        let remaining = report.recommendations.len().saturating_sub(top_n);
        if remaining > 0 {
            writeln!(out, "   ... and {remaining} more")?;
        }
    }

    if !report.errors.is_empty() {
        writeln!(out)?;
        writeln!(out, " {} files could not be read:", report.errors.len())?;
        for error in report.errors.iter().take(10) {
            writeln!(out, "   {} ({})", error.path.display(), error.kind)?;
        }
    }

    Ok(out)
}

fn render_duplicates(report: &AnalysisReport, top_n: usize) -> Result<String> {
    let mut out = String::new();
    let duplicates = &report.duplicates;

    writeln!(out)?;
    writeln!(out, "{}", "─".repeat(70))?;
    writeln!(out, " Duplicate File Report")?;
    write_status(&mut out, report)?;
    writeln!(out, "{}", "─".repeat(70))?;
    writeln!(out)?;

    if duplicates.groups.is_empty() {
        writeln!(out, " No duplicate files found.")?;
        return Ok(out);
    }

    writeln!(
        out,
        " Found {} duplicate groups ({} files)",
        duplicates.group_count, duplicates.files_with_duplicates
    )?;
    writeln!(
        out,
        " Total wasted space: {}",
        format_size(duplicates.total_wasted_space)
    )?;
    writeln!(out)?;

    for (i, group) in duplicates.groups.iter().take(top_n).enumerate() {
        writeln!(
            out,
            " Group {} ({} files, {} each, {} wasted)",
            i + 1,
            group.count(),
            format_size(group.size),
            format_size(group.wasted_bytes)
        )?;
        writeln!(out, "   keep  {}", group.keeper().display())?;
        for path in group.redundant() {
            writeln!(out, "   dup   {}", path.display())?;
        }
        writeln!(out)?;
    }

    let remaining = duplicates.groups.len().saturating_sub(top_n);
    if remaining > 0 {
        writeln!(out, " ... and {remaining} more groups")?;
    }
    Ok(out)
}

fn render_health(report: &AnalysisReport) -> Result<String> {
    let mut out = String::new();
    let health = &report.health;

    writeln!(
        out,
        " Health: {:.1}/100 ({})",
        health.overall, health.bucket
    )?;
    writeln!(out, " {}", health.summary)?;
    writeln!(out)?;
    for (label, score) in [
        ("Duplication", health.duplication),
        ("Organization", health.organization),
        ("Naming", health.naming_consistency),
        ("Depth", health.depth),
        ("Temp files", health.temp_file_ratio),
    ] {
        writeln!(
            out,
            "   {:<14} {:>5.1} {}",
            label,
            score,
            make_bar(score / 100.0, 20)
        )?;
    }
    Ok(out)
}

fn write_status(out: &mut String, report: &AnalysisReport) -> Result<()> {
    if let AnalysisStatus::Cancelled { processed, total } = report.status {
        writeln!(
            out,
            " Cancelled: partial results from {processed} of {total} files"
        )?;
    }
    Ok(())
}

/// Create a simple ASCII bar.
fn make_bar(ratio: f64, width: usize) -> String {
    let filled = (ratio.clamp(0.0, 1.0) * width as f64).round() as usize;
    let empty = width.saturating_sub(filled);
    format!("[{}{}]", "█".repeat(filled), "░".repeat(empty))
}

/// Format size in human-readable form.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_interrupt_exits() {
        let token = CancellationToken::new();

        assert!(!should_exit_on_interrupt(&token));
        assert!(token.is_cancelled());
        assert!(should_exit_on_interrupt(&token));
    }
}
