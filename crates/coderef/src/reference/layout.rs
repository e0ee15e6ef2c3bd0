//
// reference/layout.rs
//
// Workspace layout queries used by path resolution and workspace scans
//

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use walkdir::{DirEntry, WalkDir};

use super::config::{has_indexed_extension, is_excluded_dir_name, MODULE_MANIFEST_FILE};

/// A named unit of the workspace with its own content roots
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleInfo {
    pub name: String,
    /// Absolute directories, tried in order
    pub content_roots: Vec<PathBuf>,
}

/// Read-only view of a workspace.
///
/// Path resolution and workspace scans only ever go through this trait, so
/// tests and embedders can supply their own layout.
pub trait WorkspaceLayout: Send + Sync {
    /// Workspace root directory
    fn root(&self) -> &Path;

    /// Declared modules, in declaration order
    fn modules(&self) -> &[ModuleInfo];

    /// True if `path` names an existing regular file
    fn is_file(&self, path: &Path) -> bool;

    /// All workspace files whose file name equals `file_name`, in a stable order
    fn find_by_name(&self, file_name: &str) -> Vec<PathBuf>;

    /// All workspace files that should be scanned for pointers
    fn indexable_files(&self) -> Vec<PathBuf>;

    /// Look up a declared module by name
    fn module(&self, name: &str) -> Option<&ModuleInfo> {
        self.modules().iter().find(|m| m.name == name)
    }
}

/// On-disk shape of `.coderef.json`
#[derive(Debug, Default, Deserialize)]
struct ModuleManifest {
    #[serde(default)]
    modules: Vec<ManifestModule>,
}

#[derive(Debug, Deserialize)]
struct ManifestModule {
    name: String,
    /// Root-relative or absolute; defaults to `<root>/<name>`
    #[serde(default)]
    roots: Vec<PathBuf>,
}

/// Filesystem-backed workspace layout
#[derive(Debug, Clone)]
pub struct FsWorkspaceLayout {
    root: PathBuf,
    modules: Vec<ModuleInfo>,
}

impl FsWorkspaceLayout {
    /// Create a layout rooted at `root`, loading `.coderef.json` if present.
    ///
    /// The root is canonicalized when possible so that every path produced by
    /// the layout shares one spelling.
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let root = fs::canonicalize(root).unwrap_or_else(|e| {
            log::trace!(
                "Could not canonicalize workspace root '{}': {}",
                root.display(),
                e
            );
            root.to_path_buf()
        });
        let modules = load_manifest(&root);
        log::trace!(
            "Workspace layout at '{}' with {} declared modules",
            root.display(),
            modules.len()
        );
        Self { root, modules }
    }

    /// Register a module programmatically. Relative roots are taken from the workspace root.
    pub fn with_module<I, P>(mut self, name: impl Into<String>, roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let content_roots = roots
            .into_iter()
            .map(|r| self.root.join(r.as_ref()))
            .collect();
        self.modules.push(ModuleInfo {
            name: name.into(),
            content_roots,
        });
        self
    }

    fn walk_files(&self) -> impl Iterator<Item = DirEntry> + '_ {
        WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0
                    || !(entry.file_type().is_dir() && is_excluded_dir_name(entry.file_name()))
            })
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    log::trace!("Skipping unreadable workspace entry: {}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
    }
}

impl WorkspaceLayout for FsWorkspaceLayout {
    fn root(&self) -> &Path {
        &self.root
    }

    fn modules(&self) -> &[ModuleInfo] {
        &self.modules
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn find_by_name(&self, file_name: &str) -> Vec<PathBuf> {
        let wanted = OsStr::new(file_name);
        self.walk_files()
            .filter(|entry| entry.file_name() == wanted)
            .map(DirEntry::into_path)
            .collect()
    }

    fn indexable_files(&self) -> Vec<PathBuf> {
        self.walk_files()
            .filter(|entry| has_indexed_extension(entry.path()))
            .map(DirEntry::into_path)
            .collect()
    }
}

fn load_manifest(root: &Path) -> Vec<ModuleInfo> {
    let manifest_path = root.join(MODULE_MANIFEST_FILE);
    let text = match fs::read_to_string(&manifest_path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
        Err(e) => {
            log::warn!(
                "Failed to read module manifest '{}': {}",
                manifest_path.display(),
                e
            );
            return Vec::new();
        }
    };

    let manifest: ModuleManifest = match serde_json::from_str(&text) {
        Ok(manifest) => manifest,
        Err(e) => {
            log::warn!(
                "Ignoring malformed module manifest '{}': {}",
                manifest_path.display(),
                e
            );
            return Vec::new();
        }
    };

    manifest
        .modules
        .into_iter()
        .map(|module| {
            let content_roots = if module.roots.is_empty() {
                vec![root.join(&module.name)]
            } else {
                module.roots.iter().map(|r| root.join(r)).collect()
            };
            ModuleInfo {
                name: module.name,
                content_roots,
            }
        })
        .collect()
}
