//
// reference/config.rs
//
// Configuration for reference indexing
//

use std::ffi::OsStr;
use std::path::Path;

/// File extensions scanned for pointers (compared case-insensitively)
pub const INDEXED_EXTENSIONS: &[&str] = &[
    // Markdown / text
    "md", "markdown", "mdx", "txt", "rst", "adoc", "org",
    // Source code
    "rs", "py", "js", "jsx", "ts", "tsx", "mjs", "cjs", "java", "kt", "kts", "scala", "go", "c",
    "h", "cc", "cpp", "hpp", "cs", "rb", "php", "swift", "m", "r", "sh", "sql",
    // Config / markup
    "yaml", "yml", "toml", "json", "html", "css", "vue", "svelte",
];

/// Directory names never descended into, at any depth
pub const EXCLUDED_DIRS: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    "node_modules",
    "target",
    "build",
    "dist",
    "out",
    ".idea",
    ".vscode",
    ".gradle",
    "__pycache__",
    ".venv",
    "venv",
    "vendor",
    ".next",
    "coverage",
];

/// Conventional directory names probed by path resolution, in probe order
pub const CONVENTIONAL_DIRS: &[&str] = &[
    "src", "app", "lib", "packages", "projects", "modules", "backend", "frontend",
];

/// Name of the optional module manifest at the workspace root
pub const MODULE_MANIFEST_FILE: &str = ".coderef.json";

/// Indexer configuration
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    /// Files larger than this are skipped by workspace scans
    pub max_file_size_bytes: u64,
    /// Reindex workspace files on the rayon pool instead of sequentially
    pub parallel_scan: bool,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            max_file_size_bytes: 2 * 1024 * 1024,
            parallel_scan: true,
        }
    }
}

/// Check whether a file's extension is one we scan for pointers
pub fn has_indexed_extension(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .map(|ext| {
            INDEXED_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

/// Check whether a single directory name is excluded
pub fn is_excluded_dir_name(name: &OsStr) -> bool {
    name.to_str()
        .map(|name| EXCLUDED_DIRS.contains(&name))
        .unwrap_or(false)
}

/// Check whether any directory between `root` and `path` is excluded.
///
/// Paths outside `root` are judged on all of their components.
pub fn has_excluded_ancestor(root: &Path, path: &Path) -> bool {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let Some(parent) = relative.parent() else {
        return false;
    };
    parent
        .components()
        .any(|component| is_excluded_dir_name(component.as_os_str()))
}

/// Check whether a path should be scanned: indexed extension and no excluded ancestor
pub fn is_indexable(root: &Path, path: &Path) -> bool {
    has_indexed_extension(path) && !has_excluded_ancestor(root, path)
}
