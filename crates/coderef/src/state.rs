//
// state.rs
//
// Per-workspace state: layout, reference index and maintainer
//

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::reference::{
    DiskTextSource, FsWorkspaceLayout, IndexMaintainer, IndexWorker, IndexWorkerHandle,
    IndexerConfig, LineRange, Reference, ReferenceIndex, ScanSummary, TextSource,
    WorkspaceLayout,
};

/// References into one line range of a target file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RangeEntry {
    pub range: LineRange,
    pub references: Vec<Reference>,
}

/// All ranges of one target file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetEntry {
    pub file: PathBuf,
    pub ranges: Vec<RangeEntry>,
}

/// Everything one workspace needs for reference tracking.
///
/// Built once per workspace and shared by reference; nothing here is global.
pub struct WorkspaceIndexContext {
    layout: Arc<dyn WorkspaceLayout>,
    index: Arc<ReferenceIndex>,
    maintainer: Arc<IndexMaintainer>,
}

impl WorkspaceIndexContext {
    /// Context over the filesystem at `root`, reading files from disk
    pub fn open(root: impl AsRef<Path>, config: IndexerConfig) -> Self {
        Self::with_layout(
            Arc::new(FsWorkspaceLayout::new(root)),
            Arc::new(DiskTextSource::new()),
            config,
        )
    }

    pub fn with_layout(
        layout: Arc<dyn WorkspaceLayout>,
        text_source: Arc<dyn TextSource>,
        config: IndexerConfig,
    ) -> Self {
        let index = Arc::new(ReferenceIndex::new());
        let maintainer = Arc::new(IndexMaintainer::new(
            Arc::clone(&layout),
            text_source,
            Arc::clone(&index),
            config,
        ));
        Self {
            layout,
            index,
            maintainer,
        }
    }

    pub fn root(&self) -> &Path {
        self.layout.root()
    }

    pub fn layout(&self) -> &Arc<dyn WorkspaceLayout> {
        &self.layout
    }

    pub fn index(&self) -> &Arc<ReferenceIndex> {
        &self.index
    }

    pub fn maintainer(&self) -> &Arc<IndexMaintainer> {
        &self.maintainer
    }

    /// Index the whole workspace on the calling thread
    pub fn scan(&self, cancel: &CancellationToken) -> ScanSummary {
        self.maintainer.reindex_workspace(cancel)
    }

    /// Start an event worker for this workspace on the current tokio runtime
    pub fn spawn_worker(&self) -> IndexWorkerHandle {
        IndexWorker::spawn(Arc::clone(&self.maintainer))
    }

    /// Absolute form of a user-supplied path; relative paths are taken from the workspace root
    pub fn resolve_input_path(&self, path: &Path) -> PathBuf {
        let joined = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root().join(path)
        };
        std::fs::canonicalize(&joined).unwrap_or(joined)
    }

    /// References whose target range on `file` covers `line`
    pub fn references_at(&self, file: &Path, line: u32) -> Vec<Reference> {
        let file = self.resolve_input_path(file);
        self.index.find_references_to_location(&file, line)
    }

    /// Referenced ranges of `file`
    pub fn line_ranges(&self, file: &Path) -> Vec<LineRange> {
        let file = self.resolve_input_path(file);
        self.index.get_all_line_ranges_for_file(&file)
    }

    /// Every referenced file, sorted
    pub fn referenced_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<_> = self
            .index
            .get_all_files_with_references()
            .into_iter()
            .collect();
        files.sort();
        files
    }

    /// Stable dump of the whole index: targets sorted, ranges ascending,
    /// references ordered by source file and offset
    pub fn snapshot(&self) -> Vec<TargetEntry> {
        self.referenced_files()
            .into_iter()
            .map(|file| {
                let mut ranges: Vec<RangeEntry> = self
                    .index
                    .entries_for_file(&file)
                    .into_iter()
                    .map(|(range, mut references)| {
                        references.sort_by(|a, b| {
                            (&a.source_file, a.source_start_offset)
                                .cmp(&(&b.source_file, b.source_start_offset))
                        });
                        RangeEntry { range, references }
                    })
                    .collect();
                ranges.sort_by_key(|entry| entry.range);
                TargetEntry { file, ranges }
            })
            .collect()
    }
}
