//! Keeps the reference index consistent with file contents.
//!
//! # Flow
//! - `reindex_file`: scan text for pointers, resolve each target, replace the
//!   file's outbound references in the index
//! - `reindex_workspace`: the same for every indexable workspace file, on the
//!   rayon pool, checking a cancellation token between files
//! - `on_file_removed` / `on_file_created`: deletion drops the file on both
//!   sides of the graph; creation retries pointers that could not be resolved
//!   before the file existed
//! - `on_path_removed` / `on_directory_created`: the same for a whole
//!   directory moved in or out in a single event
//!
//! # Ordering
//! Every reindex request carries a sequence number. Work on one file is
//! serialized through a per-file slot, and a request older than the last one
//! applied to that file is dropped, so the latest submission wins even when
//! requests complete out of order. Different files never contend.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use dashmap::DashMap;
use rayon::prelude::*;
use ropey::Rope;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use walkdir::{DirEntry, WalkDir};

use super::config::{is_excluded_dir_name, is_indexable, IndexerConfig};
use super::content_provider::TextSource;
use super::index::ReferenceIndex;
use super::layout::WorkspaceLayout;
use super::path_resolve::PathResolver;
use super::syntax;
use super::types::{ExtractedPointer, ParsedPointer, Reference};

/// Per-file bookkeeping for serialized reindexing
#[derive(Debug, Default)]
struct FileSlot {
    /// Sequence number of the last request applied to this file
    applied: u64,
}

/// Counts for one `reindex_file` call
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReindexOutcome {
    /// Pointer-shaped matches found in the text
    pub matched: usize,
    /// References written to the index
    pub indexed: usize,
    pub parse_failures: usize,
    /// Parsed pointers whose target could not be found
    pub unresolved: usize,
    /// The request was older than one already applied and was dropped
    pub superseded: bool,
    /// The file exceeded the size limit; its outbound references were dropped
    pub oversized: bool,
}

/// Totals for one `reindex_workspace` call
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    pub files_seen: usize,
    pub files_indexed: usize,
    /// Unreadable files
    pub files_failed: usize,
    /// Oversized files
    pub files_skipped: usize,
    /// Previously indexed files no longer present on disk
    pub files_removed: usize,
    pub references: usize,
    pub parse_failures: usize,
    pub unresolved: usize,
    pub cancelled: bool,
}

enum FileScan {
    Indexed(ReindexOutcome),
    Failed,
    Skipped,
    Cancelled,
}

/// Orchestrates syntax scanning, path resolution and index updates
pub struct IndexMaintainer {
    layout: Arc<dyn WorkspaceLayout>,
    text_source: Arc<dyn TextSource>,
    index: Arc<ReferenceIndex>,
    config: IndexerConfig,
    slots: DashMap<PathBuf, Arc<Mutex<FileSlot>>>,
    /// Pointers found in each source file by its last applied scan
    extracted: DashMap<PathBuf, Vec<ExtractedPointer>>,
    sequence: AtomicU64,
}

impl std::fmt::Debug for IndexMaintainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexMaintainer")
            .field("root", &self.layout.root())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl IndexMaintainer {
    pub fn new(
        layout: Arc<dyn WorkspaceLayout>,
        text_source: Arc<dyn TextSource>,
        index: Arc<ReferenceIndex>,
        config: IndexerConfig,
    ) -> Self {
        Self {
            layout,
            text_source,
            index,
            config,
            slots: DashMap::new(),
            extracted: DashMap::new(),
            sequence: AtomicU64::new(0),
        }
    }

    pub fn index(&self) -> &Arc<ReferenceIndex> {
        &self.index
    }

    pub fn layout(&self) -> &Arc<dyn WorkspaceLayout> {
        &self.layout
    }

    pub fn text_source(&self) -> &Arc<dyn TextSource> {
        &self.text_source
    }

    /// Reserve the next request sequence number.
    ///
    /// Callers that queue work (the index worker) reserve a number at
    /// submission time and pass it to [`reindex_file_at`](Self::reindex_file_at).
    pub fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn slot(&self, file: &Path) -> Arc<Mutex<FileSlot>> {
        let entry = self.slots.entry(file.to_path_buf()).or_default();
        Arc::clone(entry.value())
    }

    fn lock_slot(slot: &Mutex<FileSlot>) -> MutexGuard<'_, FileSlot> {
        slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Re-scan `file` with its current `text` as the newest request
    pub fn reindex_file(&self, file: &Path, text: &str) -> ReindexOutcome {
        let seq = self.next_sequence();
        self.reindex_file_at(file, text, seq)
    }

    /// Re-scan `file` as request `seq`; dropped if a newer request was already applied
    pub fn reindex_file_at(&self, file: &Path, text: &str, seq: u64) -> ReindexOutcome {
        let slot = self.slot(file);
        let mut guard = Self::lock_slot(&slot);

        if seq < guard.applied {
            log::trace!(
                "Dropping stale reindex of {} (request {} < applied {})",
                file.display(),
                seq,
                guard.applied
            );
            return ReindexOutcome {
                superseded: true,
                ..ReindexOutcome::default()
            };
        }

        let mut outcome = ReindexOutcome::default();
        let pointers = self.extract_pointers(file, text, &mut outcome);

        self.index.remove_outbound_references(file);
        for pointer in &pointers {
            if let Some(target) = &pointer.target {
                self.index.add(target, reference_for(file, pointer));
                outcome.indexed += 1;
            }
        }
        if pointers.is_empty() {
            self.extracted.remove(file);
        } else {
            self.extracted.insert(file.to_path_buf(), pointers);
        }
        guard.applied = seq;

        log::trace!(
            "Reindexed {}: {} matches, {} indexed, {} parse failures, {} unresolved",
            file.display(),
            outcome.matched,
            outcome.indexed,
            outcome.parse_failures,
            outcome.unresolved
        );
        outcome
    }

    /// Find, parse and resolve every pointer in `text`. One bad pointer never stops the rest.
    fn extract_pointers(
        &self,
        file: &Path,
        text: &str,
        outcome: &mut ReindexOutcome,
    ) -> Vec<ExtractedPointer> {
        let mut rope: Option<Rope> = None;
        let mut pointers = Vec::new();

        for found in syntax::find_all(text) {
            outcome.matched += 1;

            let Some(pointer) = syntax::parse(found.text) else {
                outcome.parse_failures += 1;
                continue;
            };

            let rope = rope.get_or_insert_with(|| Rope::from_str(text));
            let definition_line = (rope.byte_to_line(found.start) + 1) as u32;

            let target = match PathResolver::resolve_pointer(self.layout.as_ref(), &pointer) {
                Some(resolved) => Some(resolved.path),
                None => {
                    outcome.unresolved += 1;
                    log::trace!(
                        "Unresolved pointer '{}' at {}:{}",
                        found.text,
                        file.display(),
                        definition_line
                    );
                    None
                }
            };

            pointers.push(ExtractedPointer {
                pointer,
                start_offset: found.start,
                end_offset: found.end,
                definition_line,
                target,
            });
        }

        pointers
    }

    /// Read and reindex every indexable workspace file.
    ///
    /// Checks `cancel` before each file; a cancelled scan leaves the index
    /// valid for the files already processed. A completed scan also forgets
    /// files that were indexed before but are no longer enumerated.
    pub fn reindex_workspace(&self, cancel: &CancellationToken) -> ScanSummary {
        let start = Instant::now();
        let files = self.layout.indexable_files();
        log::info!(
            "Scanning {} workspace files under {}",
            files.len(),
            self.layout.root().display()
        );

        let results: Vec<FileScan> = if self.config.parallel_scan {
            files.par_iter().map(|f| self.scan_one(f, cancel)).collect()
        } else {
            files.iter().map(|f| self.scan_one(f, cancel)).collect()
        };

        let mut summary = ScanSummary {
            files_seen: files.len(),
            ..ScanSummary::default()
        };
        for result in results {
            match result {
                FileScan::Indexed(outcome) => {
                    summary.files_indexed += 1;
                    summary.references += outcome.indexed;
                    summary.parse_failures += outcome.parse_failures;
                    summary.unresolved += outcome.unresolved;
                }
                FileScan::Failed => summary.files_failed += 1,
                FileScan::Skipped => summary.files_skipped += 1,
                FileScan::Cancelled => summary.cancelled = true,
            }
        }

        if !summary.cancelled {
            let present: HashSet<&PathBuf> = files.iter().collect();
            let vanished: Vec<PathBuf> = self
                .extracted
                .iter()
                .filter(|entry| !present.contains(entry.key()))
                .map(|entry| entry.key().clone())
                .collect();
            for file in &vanished {
                self.on_file_removed(file);
            }
            summary.files_removed = vanished.len();
        }

        log::info!(
            "Workspace scan {} in {:?}: {} files indexed, {} references, {} unresolved, {} failed",
            if summary.cancelled { "cancelled" } else { "complete" },
            start.elapsed(),
            summary.files_indexed,
            summary.references,
            summary.unresolved,
            summary.files_failed
        );
        summary
    }

    fn scan_one(&self, file: &Path, cancel: &CancellationToken) -> FileScan {
        if cancel.is_cancelled() {
            return FileScan::Cancelled;
        }
        let seq = self.next_sequence();
        match self.reindex_from_source(file, seq) {
            Ok(outcome) if outcome.oversized => FileScan::Skipped,
            Ok(outcome) => FileScan::Indexed(outcome),
            Err(e) => {
                log::warn!("Skipping {}: {:#}", file.display(), e);
                FileScan::Failed
            }
        }
    }

    /// Read `file` through the text source and reindex it as request `seq`.
    ///
    /// Reserve `seq` before calling: an edit applied while the read is in
    /// flight then supersedes the text read here. Files over the size limit
    /// are not read, and their outbound references are dropped.
    pub fn reindex_from_source(&self, file: &Path, seq: u64) -> anyhow::Result<ReindexOutcome> {
        let limit = self.config.max_file_size_bytes;
        if let Some(size) = std::fs::metadata(file)
            .ok()
            .map(|metadata| metadata.len())
            .filter(|&size| size > limit)
        {
            return Ok(self.drop_oversized(file, size, seq));
        }

        let text = self.text_source.read(file)?;
        if text.len() as u64 > limit {
            return Ok(self.drop_oversized(file, text.len() as u64, seq));
        }
        Ok(self.reindex_file_at(file, &text, seq))
    }

    fn drop_oversized(&self, file: &Path, size: u64, seq: u64) -> ReindexOutcome {
        log::info!(
            "Skipping {} ({} bytes exceeds limit of {})",
            file.display(),
            size,
            self.config.max_file_size_bytes
        );
        ReindexOutcome {
            oversized: true,
            ..self.reindex_file_at(file, "", seq)
        }
    }

    /// Forget a deleted file, both as a source and as a target.
    ///
    /// Pointers elsewhere that resolved to it become unresolved and are
    /// retried when files are created.
    pub fn on_file_removed(&self, file: &Path) {
        let slot = self.slot(file);
        {
            let mut guard = Self::lock_slot(&slot);
            guard.applied = self.next_sequence();
            self.extracted.remove(file);
            self.index.remove_references_from_file(file);
        }

        let mut orphaned = 0;
        for mut entry in self.extracted.iter_mut() {
            for pointer in entry.value_mut().iter_mut() {
                if pointer.target.as_deref() == Some(file) {
                    pointer.target = None;
                    orphaned += 1;
                }
            }
        }
        self.text_source.invalidate(file);
        log::trace!(
            "Removed {} from index; {} pointers now unresolved",
            file.display(),
            orphaned
        );
    }

    /// Forget everything tracked at or beneath `path`.
    ///
    /// Moving a directory out of the workspace arrives as a single event for
    /// the directory, so every indexed source or target under it goes too.
    pub fn on_path_removed(&self, path: &Path) {
        let mut files: HashSet<PathBuf> = self
            .extracted
            .iter()
            .filter(|entry| entry.key().starts_with(path))
            .map(|entry| entry.key().clone())
            .collect();
        files.extend(
            self.index
                .get_all_files_with_references()
                .into_iter()
                .filter(|file| file.starts_with(path)),
        );
        files.insert(path.to_path_buf());

        if files.len() > 1 {
            log::trace!(
                "Removing {} tracked files under {}",
                files.len() - 1,
                path.display()
            );
        }
        for file in &files {
            self.on_file_removed(file);
        }
    }

    /// Index every indexable file under a directory that appeared in one
    /// event, then retry pending pointers. Returns the number of files indexed.
    pub fn on_directory_created(&self, dir: &Path, cancel: &CancellationToken) -> usize {
        let root = self.layout.root();
        let files: Vec<PathBuf> = WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0
                    || !(entry.file_type().is_dir() && is_excluded_dir_name(entry.file_name()))
            })
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file() && is_indexable(root, entry.path()))
            .map(DirEntry::into_path)
            .collect();

        let mut indexed = 0;
        for file in &files {
            self.text_source.invalidate(file);
            match self.scan_one(file, cancel) {
                FileScan::Indexed(_) => indexed += 1,
                FileScan::Cancelled => break,
                FileScan::Failed | FileScan::Skipped => {}
            }
        }
        let resolved = self.retry_unresolved();
        log::trace!(
            "Directory {} appeared: {} files indexed, {} pending pointers resolved",
            dir.display(),
            indexed,
            resolved
        );
        indexed
    }

    /// Index a newly created file, then retry pointers that may now resolve
    pub fn on_file_created(&self, file: &Path, text: &str) -> ReindexOutcome {
        let outcome = self.reindex_file(file, text);
        let resolved = self.retry_unresolved();
        if resolved > 0 {
            log::trace!(
                "Creation of {} resolved {} pending pointers",
                file.display(),
                resolved
            );
        }
        outcome
    }

    /// Re-run resolution for every pointer without a target. Returns how many now resolve.
    pub fn retry_unresolved(&self) -> usize {
        let sources: Vec<PathBuf> = self
            .extracted
            .iter()
            .filter(|entry| entry.value().iter().any(|p| p.target.is_none()))
            .map(|entry| entry.key().clone())
            .collect();

        let mut resolved = 0;
        for source in sources {
            let slot = self.slot(&source);
            let _guard = Self::lock_slot(&slot);

            // Resolution can walk the whole workspace; hold no map guard meanwhile
            let pending: Vec<(usize, ParsedPointer)> = match self.extracted.get(&source) {
                Some(entry) => entry
                    .value()
                    .iter()
                    .enumerate()
                    .filter(|(_, p)| p.target.is_none())
                    .map(|(i, p)| (i, p.pointer.clone()))
                    .collect(),
                None => continue,
            };
            let found: Vec<(usize, PathBuf)> = pending
                .into_iter()
                .filter_map(|(i, pointer)| {
                    PathResolver::resolve_pointer(self.layout.as_ref(), &pointer)
                        .map(|target| (i, target.path))
                })
                .collect();
            if found.is_empty() {
                continue;
            }

            let Some(mut entry) = self.extracted.get_mut(&source) else {
                continue;
            };
            for (i, path) in found {
                let Some(pointer) = entry.value_mut().get_mut(i) else {
                    continue;
                };
                if pointer.target.is_some() {
                    continue;
                }
                self.index.add(&path, reference_for(&source, pointer));
                pointer.target = Some(path);
                resolved += 1;
            }
        }
        resolved
    }

    /// Number of pointers currently without a resolved target
    pub fn pending_pointers(&self) -> usize {
        self.extracted
            .iter()
            .map(|entry| entry.value().iter().filter(|p| p.target.is_none()).count())
            .sum()
    }

    /// Pointers found in `file` by its last applied scan
    pub fn extracted_pointers(&self, file: &Path) -> Vec<ExtractedPointer> {
        self.extracted
            .get(file)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// Drop all index and bookkeeping state
    pub fn clear(&self) {
        self.extracted.clear();
        self.index.clear();
    }
}

fn reference_for(source: &Path, pointer: &ExtractedPointer) -> Reference {
    Reference {
        source_file: source.to_path_buf(),
        source_start_offset: pointer.start_offset,
        source_end_offset: pointer.end_offset,
        target_start_line: pointer.pointer.start_line,
        target_end_line: pointer.pointer.end_line,
        definition_line: pointer.definition_line,
    }
}
