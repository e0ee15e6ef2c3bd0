// cli/refs.rs - `coderef refs` subcommand
//
// Answers "who points at this line?" for one file of a workspace.

use std::path::PathBuf;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use super::display_path;
use crate::reference::{IndexerConfig, Reference};
use crate::state::WorkspaceIndexContext;

/// Parsed arguments for the `refs` subcommand.
#[derive(Debug)]
pub struct RefsArgs {
    pub root: PathBuf,
    pub file: PathBuf,
    pub line: u32,
    pub json: bool,
}

#[derive(Debug, Serialize)]
pub struct RefsReport {
    pub root: PathBuf,
    pub file: PathBuf,
    pub line: u32,
    pub references: Vec<Reference>,
}

/// Parse `refs` arguments from the remaining CLI args.
///
/// Expected usage: `coderef refs <root> <file> <line> [--json]`
pub fn parse_args(args: &mut impl Iterator<Item = String>) -> Result<RefsArgs, String> {
    let mut positional = Vec::new();
    let mut json = false;

    for arg in args {
        match arg.as_str() {
            "--json" => json = true,
            other if other.starts_with('-') => {
                return Err(format!("Unknown flag: '{}'", other));
            }
            _ => positional.push(arg),
        }
    }

    let [root, file, line]: [String; 3] = positional
        .try_into()
        .map_err(|_| "Expected <root> <file> <line>".to_string())?;

    let line: u32 = line
        .parse()
        .map_err(|_| format!("Invalid line number: '{}'", line))?;
    if line == 0 {
        return Err("Line numbers are 1-based".to_string());
    }

    Ok(RefsArgs {
        root: PathBuf::from(root),
        file: PathBuf::from(file),
        line,
        json,
    })
}

/// Index the workspace and look up references covering the requested line.
pub fn run_refs(args: &RefsArgs) -> anyhow::Result<RefsReport> {
    if !args.root.is_dir() {
        anyhow::bail!("Not a directory: {}", args.root.display());
    }
    let ctx = WorkspaceIndexContext::open(&args.root, IndexerConfig::default());
    ctx.scan(&CancellationToken::new());

    let mut references = ctx.references_at(&args.file, args.line);
    references.sort_by(|a, b| {
        (&a.source_file, a.source_start_offset).cmp(&(&b.source_file, b.source_start_offset))
    });

    Ok(RefsReport {
        root: ctx.root().to_path_buf(),
        file: ctx.resolve_input_path(&args.file),
        line: args.line,
        references,
    })
}

pub fn print_report(report: &RefsReport) {
    if report.references.is_empty() {
        println!(
            "No references to {}:{}",
            display_path(&report.root, &report.file),
            report.line
        );
        return;
    }
    for reference in &report.references {
        println!(
            "{}:{}  -> {}",
            display_path(&report.root, &reference.source_file),
            reference.definition_line,
            reference.target_range()
        );
    }
}

pub fn print_report_json(report: &RefsReport) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}
