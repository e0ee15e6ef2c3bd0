//
// reference/index.rs
//
// Reverse reference index: target file -> line range -> inbound references
//

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use indexmap::IndexMap;

use super::types::{LineRange, Reference};

/// Ranges of one target file, in first-insertion order
type RangeMap = IndexMap<LineRange, Vec<Reference>>;

#[derive(Debug, Default)]
struct Store {
    /// Target file -> ranges -> references pointing into that range
    targets: HashMap<PathBuf, RangeMap>,
    /// Source file -> target files it currently points into
    sources: HashMap<PathBuf, HashSet<PathBuf>>,
}

impl Store {
    /// Remove every reference whose source is `source`, pruning empties
    fn remove_outbound(&mut self, source: &Path) -> usize {
        let Some(targets) = self.sources.remove(source) else {
            return 0;
        };
        let mut removed = 0;
        for target in targets {
            let Some(ranges) = self.targets.get_mut(&target) else {
                continue;
            };
            ranges.retain(|_, refs| {
                let before = refs.len();
                refs.retain(|r| r.source_file != source);
                removed += before - refs.len();
                !refs.is_empty()
            });
            if ranges.is_empty() {
                self.targets.remove(&target);
            }
        }
        removed
    }

    /// Drop `target` as a target key, unlinking it from every source that pointed at it
    fn remove_target(&mut self, target: &Path) -> usize {
        let Some(ranges) = self.targets.remove(target) else {
            return 0;
        };
        let mut removed = 0;
        for reference in ranges.values().flatten() {
            removed += 1;
            if let Some(targets) = self.sources.get_mut(&reference.source_file) {
                targets.remove(target);
                if targets.is_empty() {
                    self.sources.remove(&reference.source_file);
                }
            }
        }
        removed
    }
}

/// Concurrent store of inbound references per target file.
///
/// A single `RwLock` guards the whole store, so every operation is atomic
/// with respect to every other. A poisoned lock turns writes into no-ops and
/// reads into empty results.
///
/// Invariants:
/// - at most one reference per `(source file, start line, end line)` in a range
/// - no range key with an empty reference list
/// - no target file without ranges
#[derive(Debug, Default)]
pub struct ReferenceIndex {
    inner: RwLock<Store>,
    /// Monotonic mutation counter
    version: AtomicU64,
}

impl ReferenceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get current version
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    fn increment_version(&self) -> u64 {
        self.version.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Record a reference from `source_file` to lines `start..=end` of `target_file`.
    ///
    /// Returns `true` if a new reference was stored. A reference with the same
    /// source file and target lines replaces the stored one (fresh offsets win)
    /// and returns `false`. Invalid bounds are rejected with a warning.
    #[allow(clippy::too_many_arguments)]
    pub fn add_reference(
        &self,
        target_file: &Path,
        target_start_line: u32,
        target_end_line: u32,
        source_file: &Path,
        source_start_offset: usize,
        source_end_offset: usize,
        definition_line: u32,
    ) -> bool {
        self.add(
            target_file,
            Reference {
                source_file: source_file.to_path_buf(),
                source_start_offset,
                source_end_offset,
                target_start_line,
                target_end_line,
                definition_line,
            },
        )
    }

    /// Insert or replace `reference` under `target_file`
    pub fn add(&self, target_file: &Path, reference: Reference) -> bool {
        let Some(range) = LineRange::new(reference.target_start_line, reference.target_end_line)
        else {
            log::warn!(
                "Ignoring reference from '{}' to '{}' with invalid lines {}-{}",
                reference.source_file.display(),
                target_file.display(),
                reference.target_start_line,
                reference.target_end_line
            );
            return false;
        };

        let Ok(mut guard) = self.inner.write() else {
            return false;
        };
        let store = &mut *guard;

        let refs = store
            .targets
            .entry(target_file.to_path_buf())
            .or_default()
            .entry(range)
            .or_default();

        let inserted = match refs.iter().position(|r| r.same_key(&reference)) {
            Some(pos) => {
                refs[pos] = reference;
                false
            }
            None => {
                store
                    .sources
                    .entry(reference.source_file.clone())
                    .or_default()
                    .insert(target_file.to_path_buf());
                refs.push(reference);
                true
            }
        };
        drop(guard);

        self.increment_version();
        inserted
    }

    /// All references whose target range on `file` contains `line_number` (1-based, inclusive)
    pub fn find_references_to_location(&self, file: &Path, line_number: u32) -> Vec<Reference> {
        let Ok(guard) = self.inner.read() else {
            return Vec::new();
        };
        let Some(ranges) = guard.targets.get(file) else {
            return Vec::new();
        };
        ranges
            .iter()
            .filter(|(range, _)| range.contains(line_number))
            .flat_map(|(_, refs)| refs.iter().cloned())
            .collect()
    }

    /// Every distinct range on `file` with at least one live reference
    pub fn get_all_line_ranges_for_file(&self, file: &Path) -> Vec<LineRange> {
        self.inner
            .read()
            .ok()
            .and_then(|g| g.targets.get(file).map(|r| r.keys().copied().collect()))
            .unwrap_or_default()
    }

    /// Ranges on `file` together with their references
    pub fn entries_for_file(&self, file: &Path) -> Vec<(LineRange, Vec<Reference>)> {
        self.inner
            .read()
            .ok()
            .and_then(|g| {
                g.targets
                    .get(file)
                    .map(|r| r.iter().map(|(k, v)| (*k, v.clone())).collect())
            })
            .unwrap_or_default()
    }

    /// Every target file with at least one live reference
    pub fn get_all_files_with_references(&self) -> HashSet<PathBuf> {
        self.inner
            .read()
            .ok()
            .map(|g| g.targets.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Source files that currently point into `target`
    pub fn sources_referencing(&self, target: &Path) -> HashSet<PathBuf> {
        self.inner
            .read()
            .ok()
            .and_then(|g| {
                g.targets.get(target).map(|ranges| {
                    ranges
                        .values()
                        .flatten()
                        .map(|r| r.source_file.clone())
                        .collect()
                })
            })
            .unwrap_or_default()
    }

    /// Total number of stored references
    pub fn reference_count(&self) -> usize {
        self.inner
            .read()
            .ok()
            .map(|g| g.targets.values().flat_map(|r| r.values()).map(Vec::len).sum())
            .unwrap_or(0)
    }

    /// Remove every reference whose source is `file`, and drop `file` as a target entirely.
    ///
    /// Use for deleted files. For a file whose content changed, use
    /// [`remove_outbound_references`](Self::remove_outbound_references) so
    /// references into it survive.
    pub fn remove_references_from_file(&self, file: &Path) {
        let (outbound, inbound) = match self.inner.write() {
            Ok(mut guard) => (guard.remove_outbound(file), guard.remove_target(file)),
            Err(_) => return,
        };
        self.increment_version();
        log::trace!(
            "Removed {} outbound and {} inbound references for {}",
            outbound,
            inbound,
            file.display()
        );
    }

    /// Remove only the references whose source is `file`
    pub fn remove_outbound_references(&self, file: &Path) -> usize {
        let removed = match self.inner.write() {
            Ok(mut guard) => guard.remove_outbound(file),
            Err(_) => return 0,
        };
        self.increment_version();
        removed
    }

    /// Drop all entries
    pub fn clear(&self) {
        if let Ok(mut guard) = self.inner.write() {
            guard.targets.clear();
            guard.sources.clear();
        }
        self.increment_version();
    }
}
