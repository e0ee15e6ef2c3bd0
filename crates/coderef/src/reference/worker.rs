//! Event-driven index maintenance.
//!
//! File events arrive on an unbounded channel and are handled by a single
//! tokio task, one event at a time. Events already queued when the worker
//! wakes are drained as a batch and duplicate `Changed` events are coalesced,
//! since content is read at processing time anyway. The blocking work (disk
//! reads, resolution probes, index writes) runs on `spawn_blocking`.
//!
//! # Shutdown
//! - Cancelling the handle's token stops the worker after the current event
//! - Dropping every sender lets the worker drain the queue and exit

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::config::is_indexable;
use super::maintainer::IndexMaintainer;

/// A change to the workspace the index should react to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileEvent {
    /// Content of an existing file changed
    Changed(PathBuf),
    /// A file or directory appeared
    Created(PathBuf),
    /// A file or directory disappeared
    Removed(PathBuf),
    /// Events may have been lost; rescan everything
    Rescan,
}

impl FileEvent {
    pub fn path(&self) -> Option<&Path> {
        match self {
            FileEvent::Changed(p) | FileEvent::Created(p) | FileEvent::Removed(p) => Some(p),
            FileEvent::Rescan => None,
        }
    }
}

/// Owning handle for a running index worker
#[derive(Debug)]
pub struct IndexWorkerHandle {
    sender: UnboundedSender<FileEvent>,
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

impl IndexWorkerHandle {
    /// Queue an event. Returns false once the worker has stopped.
    pub fn send(&self, event: FileEvent) -> bool {
        self.sender.send(event).is_ok()
    }

    /// A sender for producers such as the filesystem watcher
    pub fn sender(&self) -> UnboundedSender<FileEvent> {
        self.sender.clone()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Stop the worker without processing queued events and wait for it
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.join.await {
            log::warn!("Index worker terminated abnormally: {}", e);
        }
    }

    /// Process everything already queued, then stop.
    ///
    /// Waits until every other sender (for example a watcher's) is dropped too.
    pub async fn finish(self) {
        let IndexWorkerHandle { sender, join, .. } = self;
        drop(sender);
        if let Err(e) = join.await {
            log::warn!("Index worker terminated abnormally: {}", e);
        }
    }
}

/// Background task applying [`FileEvent`]s to an [`IndexMaintainer`]
pub struct IndexWorker;

impl IndexWorker {
    /// Start a worker on the current tokio runtime
    pub fn spawn(maintainer: Arc<IndexMaintainer>) -> IndexWorkerHandle {
        let (sender, receiver) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let join = tokio::spawn(Self::run(maintainer, receiver, cancel.clone()));
        IndexWorkerHandle {
            sender,
            cancel,
            join,
        }
    }

    async fn run(
        maintainer: Arc<IndexMaintainer>,
        mut receiver: UnboundedReceiver<FileEvent>,
        cancel: CancellationToken,
    ) {
        log::info!("Index worker started");

        'outer: loop {
            let first = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                event = receiver.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
            };

            let mut batch = vec![first];
            while let Ok(event) = receiver.try_recv() {
                batch.push(event);
            }

            for event in coalesce(batch) {
                if cancel.is_cancelled() {
                    break 'outer;
                }
                Self::process(&maintainer, &cancel, event).await;
            }
        }

        log::info!("Index worker stopped");
    }

    async fn process(maintainer: &Arc<IndexMaintainer>, cancel: &CancellationToken, event: FileEvent) {
        let start = Instant::now();
        let description = format!("{:?}", event);
        let maintainer = Arc::clone(maintainer);
        let cancel = cancel.clone();

        let result = tokio::task::spawn_blocking(move || apply(&maintainer, &cancel, event)).await;
        match result {
            Ok(()) => log::trace!("Processed {} in {:?}", description, start.elapsed()),
            Err(e) => log::warn!("Failed to process {}: {}", description, e),
        }
    }
}

fn apply(maintainer: &IndexMaintainer, cancel: &CancellationToken, event: FileEvent) {
    let root = maintainer.layout().root().to_path_buf();
    let source = maintainer.text_source();

    match event {
        FileEvent::Changed(path) => {
            if !is_indexable(&root, &path) {
                return;
            }
            let seq = maintainer.next_sequence();
            source.invalidate(&path);
            match maintainer.reindex_from_source(&path, seq) {
                Ok(_) => {}
                Err(_) if !path.exists() => maintainer.on_file_removed(&path),
                Err(e) => log::warn!("Could not reindex {}: {:#}", path.display(), e),
            }
        }
        FileEvent::Created(path) if path.is_dir() => {
            maintainer.on_directory_created(&path, cancel);
        }
        FileEvent::Created(path) => {
            if is_indexable(&root, &path) {
                let seq = maintainer.next_sequence();
                source.invalidate(&path);
                if let Err(e) = maintainer.reindex_from_source(&path, seq) {
                    log::warn!("Could not index new file {}: {:#}", path.display(), e);
                }
            }
            // Any file may be the target of pending pointers
            maintainer.retry_unresolved();
        }
        FileEvent::Removed(path) => maintainer.on_path_removed(&path),
        FileEvent::Rescan => {
            maintainer.reindex_workspace(cancel);
        }
    }
}

/// Drop events made redundant by an earlier queued event.
///
/// A `Changed` is redundant when the last queued event for the same path is
/// also a `Changed`; consecutive `Rescan`s collapse into one.
fn coalesce(batch: Vec<FileEvent>) -> Vec<FileEvent> {
    let mut out: Vec<FileEvent> = Vec::with_capacity(batch.len());
    for event in batch {
        let redundant = match &event {
            FileEvent::Changed(path) => matches!(
                out.iter().rev().find(|e| e.path() == Some(path.as_path())),
                Some(FileEvent::Changed(_))
            ),
            FileEvent::Rescan => matches!(out.last(), Some(FileEvent::Rescan)),
            _ => false,
        };
        if !redundant {
            out.push(event);
        }
    }
    out
}
