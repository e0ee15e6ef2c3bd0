// cli/watch.rs - `coderef watch` subcommand
//
// Indexes a workspace, then keeps the index current from filesystem events
// until interrupted.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;

use crate::reference::{watch_workspace, IndexerConfig};
use crate::state::WorkspaceIndexContext;

#[derive(Debug)]
pub struct WatchArgs {
    pub root: PathBuf,
}

/// Expected usage: `coderef watch <root>`
pub fn parse_args(args: &mut impl Iterator<Item = String>) -> Result<WatchArgs, String> {
    let mut root: Option<PathBuf> = None;
    for arg in args {
        if arg.starts_with('-') {
            return Err(format!("Unknown flag: '{}'", arg));
        }
        if root.replace(PathBuf::from(&arg)).is_some() {
            return Err("Multiple roots provided; expected exactly one".to_string());
        }
    }
    let root = root.ok_or_else(|| "Missing required <root> argument".to_string())?;
    if !root.is_dir() {
        return Err(format!("Not a directory: {}", root.display()));
    }
    Ok(WatchArgs { root })
}

/// Run until Ctrl-C.
pub async fn run_watch(args: &WatchArgs) -> anyhow::Result<()> {
    let ctx = Arc::new(WorkspaceIndexContext::open(&args.root, IndexerConfig::default()));

    // Start watching before the initial scan so no change slips between the two
    let worker = ctx.spawn_worker();
    let _watcher = watch_workspace(ctx.root(), worker.sender())?;

    let scan_cancel = CancellationToken::new();
    let scan = {
        let ctx = Arc::clone(&ctx);
        let cancel = scan_cancel.clone();
        tokio::task::spawn_blocking(move || ctx.scan(&cancel))
    };

    tokio::select! {
        result = scan => {
            let summary = result.context("initial scan failed")?;
            println!(
                "Indexed {} files, {} references ({} unresolved). Watching for changes; Ctrl-C to stop.",
                summary.files_indexed, summary.references, summary.unresolved
            );
        }
        _ = tokio::signal::ctrl_c() => {
            scan_cancel.cancel();
            worker.shutdown().await;
            return Ok(());
        }
    }

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;

    worker.shutdown().await;
    println!(
        "Stopped. {} references into {} files; {} pointers unresolved.",
        ctx.index().reference_count(),
        ctx.referenced_files().len(),
        ctx.maintainer().pending_pointers()
    );
    Ok(())
}
