// cli/scan.rs - `coderef scan` subcommand
//
// Indexes a workspace once and prints every referenced file with its
// referenced line ranges and the pointers into each range.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use super::display_path;
use crate::reference::{IndexerConfig, ScanSummary};
use crate::state::{TargetEntry, WorkspaceIndexContext};

/// Parsed arguments for the `scan` subcommand.
#[derive(Debug)]
pub struct ScanArgs {
    pub root: PathBuf,
    pub json: bool,
    pub sequential: bool,
}

/// Result of one workspace scan.
#[derive(Debug, Serialize)]
pub struct ScanReport {
    pub root: PathBuf,
    pub summary: ScanSummary,
    pub targets: Vec<TargetEntry>,
    #[serde(skip)]
    pub duration: Duration,
}

/// Parse `scan` arguments from the remaining CLI args.
///
/// Expected usage: `coderef scan <root> [--json] [--sequential]`
pub fn parse_args(args: &mut impl Iterator<Item = String>) -> Result<ScanArgs, String> {
    let mut root: Option<PathBuf> = None;
    let mut json = false;
    let mut sequential = false;

    for arg in args {
        match arg.as_str() {
            "--json" => json = true,
            "--sequential" => sequential = true,
            other if other.starts_with('-') => {
                return Err(format!("Unknown flag: '{}'", other));
            }
            _ => {
                if root.is_some() {
                    return Err("Multiple roots provided; expected exactly one".to_string());
                }
                root = Some(PathBuf::from(arg));
            }
        }
    }

    let root = root.ok_or_else(|| "Missing required <root> argument".to_string())?;
    if !root.is_dir() {
        return Err(format!("Not a directory: {}", root.display()));
    }

    Ok(ScanArgs {
        root,
        json,
        sequential,
    })
}

/// Run the scan command.
pub fn run_scan(args: &ScanArgs) -> ScanReport {
    let config = IndexerConfig {
        parallel_scan: !args.sequential,
        ..IndexerConfig::default()
    };
    let ctx = WorkspaceIndexContext::open(&args.root, config);

    let start = Instant::now();
    let summary = ctx.scan(&CancellationToken::new());
    let duration = start.elapsed();

    ScanReport {
        root: ctx.root().to_path_buf(),
        summary,
        targets: ctx.snapshot(),
        duration,
    }
}

/// Print a scan report in human-readable format.
pub fn print_report(report: &ScanReport) {
    let summary = &report.summary;
    println!("=== coderef scan: {} ===\n", report.root.display());

    for target in &report.targets {
        println!("{}", display_path(&report.root, &target.file));
        for entry in &target.ranges {
            println!("  {}", entry.range);
            for reference in &entry.references {
                println!(
                    "    <- {}:{}",
                    display_path(&report.root, &reference.source_file),
                    reference.definition_line
                );
            }
        }
    }
    if !report.targets.is_empty() {
        println!();
    }

    println!(
        "  {} files scanned in {:.2?} ({} indexed, {} skipped, {} failed)",
        summary.files_seen,
        report.duration,
        summary.files_indexed,
        summary.files_skipped,
        summary.files_failed
    );
    println!(
        "  {} references into {} files, {} unresolved, {} malformed",
        summary.references,
        report.targets.len(),
        summary.unresolved,
        summary.parse_failures
    );
}

/// Print a scan report as pretty JSON.
pub fn print_report_json(report: &ScanReport) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}
