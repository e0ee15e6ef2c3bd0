//! Deterministic fixture workspace generator for benchmarks and tests.
//!
//! Generates synthetic multi-module workspaces: `mod_<m>/src/file_<f>.rs`
//! source files and `docs/doc_<d>.md` notes, each carrying a fixed number of
//! pointers into other modules' files.
//!
//! All output is deterministic (no randomness), so benchmarks are reproducible.

use std::fmt::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::reference::syntax;

/// Configuration for generating a fixture workspace.
#[derive(Debug, Clone)]
pub struct FixtureConfig {
    pub module_count: usize,
    pub files_per_module: usize,
    pub lines_per_file: usize,
    pub pointers_per_file: usize,
    pub doc_count: usize,
}

impl FixtureConfig {
    /// Small workspace: 3 modules of 5 files, 2 docs.
    pub fn small() -> Self {
        Self {
            module_count: 3,
            files_per_module: 5,
            lines_per_file: 40,
            pointers_per_file: 2,
            doc_count: 2,
        }
    }

    /// Medium workspace: 8 modules of 20 files, 10 docs.
    pub fn medium() -> Self {
        Self {
            module_count: 8,
            files_per_module: 20,
            lines_per_file: 80,
            pointers_per_file: 4,
            doc_count: 10,
        }
    }

    /// Large workspace: 20 modules of 40 files, 40 docs.
    pub fn large() -> Self {
        Self {
            module_count: 20,
            files_per_module: 40,
            lines_per_file: 120,
            pointers_per_file: 6,
            doc_count: 40,
        }
    }

    /// Number of pointers the generated workspace contains
    pub fn expected_pointer_count(&self) -> usize {
        if self.module_count == 0 || self.files_per_module == 0 {
            return 0;
        }
        (self.module_count * self.files_per_module + self.doc_count) * self.pointers_per_file
    }
}

/// Workspace-relative path of a generated source file
pub fn source_file_path(module: usize, file: usize) -> PathBuf {
    PathBuf::from(format!("mod_{}/src/file_{}.rs", module, file))
}

/// Pointer `k` emitted by the file or doc with ordinal `ordinal`
fn pointer_text(ordinal: usize, k: usize, config: &FixtureConfig) -> String {
    let target_module = (ordinal + k + 1) % config.module_count;
    let target_file = (ordinal + k) % config.files_per_module;
    let lines = config.lines_per_file.max(1);
    let start = (k * 7) % lines + 1;
    let end = (start + 3).min(lines);
    syntax::format(
        &format!("mod_{}", target_module),
        &format!("src/file_{}.rs", target_file),
        start as u32,
        end as u32,
    )
}

fn generate_source_content(ordinal: usize, config: &FixtureConfig) -> String {
    let mut content = String::new();
    for k in 0..config.pointers_per_file {
        writeln!(content, "// see {}", pointer_text(ordinal, k, config)).unwrap();
    }
    for line_i in config.pointers_per_file..config.lines_per_file {
        writeln!(content, "fn item_{}_{}() -> usize {{ {} }}", ordinal, line_i, line_i).unwrap();
    }
    content
}

fn generate_doc_content(doc: usize, config: &FixtureConfig) -> String {
    let mut content = String::new();
    writeln!(content, "# Design note {}\n", doc).unwrap();
    for k in 0..config.pointers_per_file {
        writeln!(
            content,
            "Step {} is implemented in {}.\n",
            k + 1,
            pointer_text(doc, k, config)
        )
        .unwrap();
    }
    content
}

/// Create a temporary fixture workspace from the given configuration.
///
/// Calling this twice with the same `FixtureConfig` produces byte-identical files.
pub fn create_fixture_workspace(config: &FixtureConfig) -> TempDir {
    let temp_dir = TempDir::new().expect("Failed to create temp directory for fixture workspace");
    write_fixture_workspace(temp_dir.path(), config);
    temp_dir
}

/// Write fixture files into an existing directory.
pub fn write_fixture_workspace(dir: &Path, config: &FixtureConfig) {
    if config.module_count == 0 || config.files_per_module == 0 {
        return;
    }
    for module in 0..config.module_count {
        for file in 0..config.files_per_module {
            let ordinal = module * config.files_per_module + file;
            write(dir, &source_file_path(module, file), &generate_source_content(ordinal, config));
        }
    }
    for doc in 0..config.doc_count {
        let path = PathBuf::from(format!("docs/doc_{}.md", doc));
        write(dir, &path, &generate_doc_content(doc, config));
    }
}

fn write(dir: &Path, rel: &Path, content: &str) {
    let path = dir.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .unwrap_or_else(|e| panic!("Failed to create {}: {}", parent.display(), e));
    }
    std::fs::write(&path, content)
        .unwrap_or_else(|e| panic!("Failed to write fixture file {}: {}", rel.display(), e));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::syntax::{find_all, parse};

    #[test]
    fn test_preset_pointer_counts() {
        assert_eq!(FixtureConfig::small().expected_pointer_count(), (15 + 2) * 2);
        assert_eq!(FixtureConfig::medium().expected_pointer_count(), (160 + 10) * 4);
    }

    #[test]
    fn test_deterministic_output() {
        let config = FixtureConfig::small();
        let ws1 = create_fixture_workspace(&config);
        let ws2 = create_fixture_workspace(&config);

        for module in 0..config.module_count {
            for file in 0..config.files_per_module {
                let rel = source_file_path(module, file);
                let a = std::fs::read_to_string(ws1.path().join(&rel)).unwrap();
                let b = std::fs::read_to_string(ws2.path().join(&rel)).unwrap();
                assert_eq!(a, b, "{} should be identical across runs", rel.display());
            }
        }
    }

    #[test]
    fn test_generated_pointers_parse_and_target_generated_files() {
        let config = FixtureConfig::small();
        let workspace = create_fixture_workspace(&config);
        let content =
            std::fs::read_to_string(workspace.path().join(source_file_path(1, 2))).unwrap();

        let pointers: Vec<_> = find_all(&content)
            .map(|m| parse(m.text).expect("generated pointer parses"))
            .collect();
        assert_eq!(pointers.len(), config.pointers_per_file);
        for pointer in pointers {
            let target = workspace
                .path()
                .join(&pointer.module_name)
                .join(&pointer.relative_path);
            assert!(target.is_file(), "{} should exist", target.display());
            assert!(pointer.end_line as usize <= config.lines_per_file);
        }
    }

    #[test]
    fn test_line_count_matches_config() {
        let config = FixtureConfig::small();
        let workspace = create_fixture_workspace(&config);
        let content =
            std::fs::read_to_string(workspace.path().join(source_file_path(0, 0))).unwrap();
        assert_eq!(content.lines().count(), config.lines_per_file);
    }

    #[test]
    fn test_empty_config_writes_nothing() {
        let config = FixtureConfig {
            module_count: 0,
            ..FixtureConfig::small()
        };
        let workspace = create_fixture_workspace(&config);
        assert_eq!(std::fs::read_dir(workspace.path()).unwrap().count(), 0);
        assert_eq!(config.expected_pointer_count(), 0);
    }
}
