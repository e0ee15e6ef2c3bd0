//
// reference/content_provider.rs
//
// File content access for the indexer
//

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::SystemTime;

use anyhow::Context;

/// Supplies the full text of a file. Read-only from the indexer's point of view.
pub trait TextSource: Send + Sync {
    fn read(&self, path: &Path) -> anyhow::Result<String>;

    /// Forget anything cached for `path`
    fn invalidate(&self, _path: &Path) {}
}

/// Snapshot metadata used to decide whether cached content is still valid
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileSnapshot {
    /// File modification time (from filesystem metadata)
    pub mtime: SystemTime,
    /// File size in bytes
    pub size: u64,
}

impl FileSnapshot {
    /// Create snapshot from filesystem metadata
    pub fn from_metadata(metadata: &std::fs::Metadata) -> Self {
        Self {
            mtime: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            size: metadata.len(),
        }
    }

    /// Check if this snapshot matches current disk state
    pub fn matches_disk(&self, current: &FileSnapshot) -> bool {
        self.mtime == current.mtime && self.size == current.size
    }
}

#[derive(Debug, Clone)]
struct CachedFile {
    snapshot: FileSnapshot,
    content: String,
}

/// Reads files from disk, reusing cached content while the file's snapshot is unchanged
#[derive(Debug, Default)]
pub struct DiskTextSource {
    inner: RwLock<HashMap<PathBuf, CachedFile>>,
}

impl DiskTextSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached files
    pub fn cached_len(&self) -> usize {
        self.inner.read().map(|g| g.len()).unwrap_or(0)
    }

    fn get_if_fresh(&self, path: &Path, current: &FileSnapshot) -> Option<String> {
        let guard = self.inner.read().ok()?;
        guard.get(path).and_then(|cached| {
            if cached.snapshot.matches_disk(current) {
                Some(cached.content.clone())
            } else {
                None
            }
        })
    }
}

impl TextSource for DiskTextSource {
    fn read(&self, path: &Path) -> anyhow::Result<String> {
        let metadata = std::fs::metadata(path)
            .with_context(|| format!("failed to stat {}", path.display()))?;
        let current = FileSnapshot::from_metadata(&metadata);
        if let Some(content) = self.get_if_fresh(path, &current) {
            log::trace!("Using cached content for {}", path.display());
            return Ok(content);
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        if let Ok(mut guard) = self.inner.write() {
            guard.insert(
                path.to_path_buf(),
                CachedFile {
                    snapshot: current,
                    content: content.clone(),
                },
            );
        }
        Ok(content)
    }

    fn invalidate(&self, path: &Path) {
        if let Ok(mut guard) = self.inner.write() {
            guard.remove(path);
        }
    }
}
