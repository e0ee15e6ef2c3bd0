//
// reference/watcher.rs
//
// Filesystem watching for the index worker
//

use std::path::{Path, PathBuf};

use anyhow::Context;
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc::UnboundedSender;

use super::config::{has_excluded_ancestor, is_indexable};
use super::worker::FileEvent;

/// Watch `root` recursively and forward relevant changes as [`FileEvent`]s.
///
/// The returned watcher must be kept alive for events to keep flowing.
pub fn watch_workspace(
    root: &Path,
    sender: UnboundedSender<FileEvent>,
) -> anyhow::Result<RecommendedWatcher> {
    let watch_root = root.to_path_buf();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) => {
            for file_event in file_events(&watch_root, &event) {
                if sender.send(file_event).is_err() {
                    log::trace!("Index worker gone; dropping filesystem event");
                    return;
                }
            }
        }
        Err(e) => {
            log::warn!("Filesystem watch error: {}; requesting rescan", e);
            let _ = sender.send(FileEvent::Rescan);
        }
    })
    .context("failed to create filesystem watcher")?;

    watcher
        .watch(root, RecursiveMode::Recursive)
        .with_context(|| format!("failed to watch {}", root.display()))?;
    log::info!("Watching {}", root.display());
    Ok(watcher)
}

/// Translate one notify event into index events.
///
/// Creations and removals are forwarded for any file outside excluded
/// directories, since any file can be a pointer target. Content changes only
/// matter for files that are themselves scanned.
fn file_events(root: &Path, event: &Event) -> Vec<FileEvent> {
    if event.need_rescan() {
        return vec![FileEvent::Rescan];
    }

    let relevant = |p: &PathBuf| !has_excluded_ancestor(root, p);
    let paths = event.paths.iter().filter(|p| relevant(*p)).cloned();

    match &event.kind {
        EventKind::Create(_) => paths.map(FileEvent::Created).collect(),
        EventKind::Remove(_) => paths.map(FileEvent::Removed).collect(),
        EventKind::Modify(ModifyKind::Name(mode)) => match mode {
            RenameMode::From => paths.map(FileEvent::Removed).collect(),
            RenameMode::To => paths.map(FileEvent::Created).collect(),
            RenameMode::Both => {
                let mut out = Vec::new();
                if let Some(from) = event.paths.first().filter(|p| relevant(*p)) {
                    out.push(FileEvent::Removed(from.clone()));
                }
                if let Some(to) = event.paths.get(1).filter(|p| relevant(*p)) {
                    out.push(FileEvent::Created(to.clone()));
                }
                out
            }
            // Unknown rename direction: let the worker sort it out from disk
            _ => paths
                .map(|p| {
                    if p.exists() {
                        FileEvent::Created(p)
                    } else {
                        FileEvent::Removed(p)
                    }
                })
                .collect(),
        },
        EventKind::Modify(_) => paths
            .filter(|p| is_indexable(root, p))
            .map(FileEvent::Changed)
            .collect(),
        _ => Vec::new(),
    }
}
