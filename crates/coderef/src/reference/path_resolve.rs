//
// reference/path_resolve.rs
//
// Resolution of (module, relative path) pairs to concrete workspace files
//
// Strategies are tried in a fixed order and the first existing file wins:
//
// 1. Module registry      <content root of module>/<path>
// 2. Module prefix        <root>/<module>/<path>
// 3. Root-relative        <root>/<path>
// 4. Sibling workspace    <root>/../<module>/<path>
// 5. Conventional dirs    <root|root/..>/<module>/<dir>/<path> and <root|root/..>/<dir>/<module>/<path>
// 6. Filename fallback    any workspace file with the same file name
//
// Resolution only probes the filesystem through WorkspaceLayout and keeps
// no state, so it is safe to call from any thread.
//

use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;

use super::config::CONVENTIONAL_DIRS;
use super::layout::WorkspaceLayout;
use super::types::ParsedPointer;

/// Which strategy located a target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ResolutionStrategy {
    ModuleRegistry,
    ModulePrefix,
    RootRelative,
    SiblingWorkspace,
    ConventionalDirectory,
    FileNameFallback,
}

impl fmt::Display for ResolutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResolutionStrategy::ModuleRegistry => "module-registry",
            ResolutionStrategy::ModulePrefix => "module-prefix",
            ResolutionStrategy::RootRelative => "root-relative",
            ResolutionStrategy::SiblingWorkspace => "sibling-workspace",
            ResolutionStrategy::ConventionalDirectory => "conventional-directory",
            ResolutionStrategy::FileNameFallback => "file-name-fallback",
        };
        f.write_str(name)
    }
}

/// A successfully resolved target file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedTarget {
    pub path: PathBuf,
    pub strategy: ResolutionStrategy,
}

/// Stateless resolver for pointer targets
#[derive(Debug, Clone, Copy, Default)]
pub struct PathResolver;

impl PathResolver {
    /// Resolve a parsed pointer's target file
    pub fn resolve_pointer(
        layout: &dyn WorkspaceLayout,
        pointer: &ParsedPointer,
    ) -> Option<ResolvedTarget> {
        Self::resolve(layout, &pointer.module_name, &pointer.relative_path)
    }

    /// Resolve `(module_name, relative_path)` to exactly one existing file.
    ///
    /// `None` means NotFound: the target may simply not exist yet.
    pub fn resolve(
        layout: &dyn WorkspaceLayout,
        module_name: &str,
        relative_path: &str,
    ) -> Option<ResolvedTarget> {
        if relative_path.is_empty() {
            return Self::resolve_bare_file(layout, module_name);
        }
        let Some(relative) = sanitize_relative(relative_path) else {
            log::trace!(
                "Rejecting pointer path '{}' in module '{}': not a plain relative path",
                relative_path,
                module_name
            );
            return None;
        };
        let root = layout.root();
        let sibling_root = root.parent();

        let found = Self::try_module_registry(layout, module_name, &relative)
            .map(|p| (p, ResolutionStrategy::ModuleRegistry))
            .or_else(|| {
                existing(layout, root.join(module_name).join(&relative))
                    .map(|p| (p, ResolutionStrategy::ModulePrefix))
            })
            .or_else(|| {
                existing(layout, root.join(&relative))
                    .map(|p| (p, ResolutionStrategy::RootRelative))
            })
            .or_else(|| {
                let sibling = sibling_root?;
                existing(layout, sibling.join(module_name).join(&relative))
                    .map(|p| (p, ResolutionStrategy::SiblingWorkspace))
            })
            .or_else(|| {
                Self::try_conventional_dirs(layout, root, sibling_root, module_name, &relative)
                    .map(|p| (p, ResolutionStrategy::ConventionalDirectory))
            })
            .or_else(|| {
                Self::try_file_name(layout, relative_path)
                    .map(|p| (p, ResolutionStrategy::FileNameFallback))
            });

        match found {
            Some((path, strategy)) => {
                log::trace!(
                    "Resolved '{}/{}' via {} to '{}'",
                    module_name,
                    relative_path,
                    strategy,
                    path.display()
                );
                Some(ResolvedTarget { path, strategy })
            }
            None => {
                log::trace!(
                    "Could not resolve '{}/{}' in workspace '{}'",
                    module_name,
                    relative_path,
                    root.display()
                );
                None
            }
        }
    }

    /// `@README.md:L2` has no `/`, so its whole name is a root-relative file
    fn resolve_bare_file(layout: &dyn WorkspaceLayout, name: &str) -> Option<ResolvedTarget> {
        let relative = sanitize_relative(name).filter(|p| !p.as_os_str().is_empty())?;
        let found = existing(layout, layout.root().join(relative))
            .map(|p| (p, ResolutionStrategy::RootRelative))
            .or_else(|| {
                Self::try_file_name(layout, name).map(|p| (p, ResolutionStrategy::FileNameFallback))
            });
        match found {
            Some((path, strategy)) => {
                log::trace!("Resolved '{}' via {} to '{}'", name, strategy, path.display());
                Some(ResolvedTarget { path, strategy })
            }
            None => {
                log::trace!("Could not resolve '{}' in workspace '{}'", name, layout.root().display());
                None
            }
        }
    }

    fn try_module_registry(
        layout: &dyn WorkspaceLayout,
        module_name: &str,
        relative: &Path,
    ) -> Option<PathBuf> {
        let module = layout.module(module_name)?;
        module
            .content_roots
            .iter()
            .find_map(|content_root| existing(layout, content_root.join(relative)))
    }

    fn try_conventional_dirs(
        layout: &dyn WorkspaceLayout,
        root: &Path,
        sibling_root: Option<&Path>,
        module_name: &str,
        relative: &Path,
    ) -> Option<PathBuf> {
        for dir in CONVENTIONAL_DIRS {
            let mut bases = vec![root];
            bases.extend(sibling_root);
            for base in bases {
                let candidates = [
                    base.join(module_name).join(dir).join(relative),
                    base.join(dir).join(module_name).join(relative),
                ];
                for candidate in candidates {
                    if let Some(found) = existing(layout, candidate) {
                        return Some(found);
                    }
                }
            }
        }
        None
    }

    fn try_file_name(layout: &dyn WorkspaceLayout, relative_path: &str) -> Option<PathBuf> {
        let file_name = relative_path.rsplit('/').next().filter(|n| !n.is_empty())?;
        let mut matches = layout.find_by_name(file_name);
        match matches.len() {
            0 => None,
            1 => matches.pop(),
            n => {
                log::trace!(
                    "File name '{}' matched {} workspace files, preferring one containing '{}'",
                    file_name,
                    n,
                    relative_path
                );
                let preferred = matches.iter().position(|candidate| {
                    path_to_slash_string(candidate).contains(relative_path)
                });
                Some(matches.swap_remove(preferred.unwrap_or(0)))
            }
        }
    }
}

fn existing(layout: &dyn WorkspaceLayout, candidate: PathBuf) -> Option<PathBuf> {
    if layout.is_file(&candidate) {
        Some(candidate)
    } else {
        None
    }
}

/// Validate a pointer's relative path.
///
/// Drops `.` segments and rejects absolute paths and `..` so a pointer cannot
/// climb out of the locations the strategies probe.
fn sanitize_relative(relative_path: &str) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in Path::new(relative_path).components() {
        match component {
            Component::Normal(segment) => out.push(segment),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(out)
}

/// `/`-separated rendering of a path, for substring comparison with pointer text
fn path_to_slash_string(path: &Path) -> String {
    let text = path.to_string_lossy();
    if std::path::MAIN_SEPARATOR == '/' {
        text.into_owned()
    } else {
        text.replace(std::path::MAIN_SEPARATOR, "/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::layout::FsWorkspaceLayout;
    use std::fs;
    use tempfile::TempDir;

    /// Creates `<tmp>/ws` as the workspace root so sibling lookups stay inside the temp dir
    struct Fixture {
        _tmp: TempDir,
        outer: PathBuf,
        root: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let tmp = TempDir::new().unwrap();
            let outer = fs::canonicalize(tmp.path()).unwrap();
            let root = outer.join("ws");
            fs::create_dir_all(&root).unwrap();
            Self {
                _tmp: tmp,
                outer,
                root,
            }
        }

        fn touch(&self, path: &Path) -> PathBuf {
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "x\n").unwrap();
            path.to_path_buf()
        }

        fn layout(&self) -> FsWorkspaceLayout {
            FsWorkspaceLayout::new(&self.root)
        }
    }

    #[test]
    fn test_module_registry_wins() {
        let fx = Fixture::new();
        let expected = fx.touch(&fx.root.join("apps/web/src/index.ts"));
        fx.touch(&fx.root.join("web/index.ts"));
        let layout = fx.layout().with_module("web", ["apps/web/src"]);

        let resolved = PathResolver::resolve(&layout, "web", "index.ts").unwrap();
        assert_eq!(resolved.path, expected);
        assert_eq!(resolved.strategy, ResolutionStrategy::ModuleRegistry);
    }

    #[test]
    fn test_module_registry_tries_roots_in_order() {
        let fx = Fixture::new();
        let expected = fx.touch(&fx.root.join("second/a.rs"));
        let layout = fx.layout().with_module("m", ["first", "second"]);

        let resolved = PathResolver::resolve(&layout, "m", "a.rs").unwrap();
        assert_eq!(resolved.path, expected);
    }

    #[test]
    fn test_undeclared_module_uses_module_prefix() {
        let fx = Fixture::new();
        let expected = fx.touch(&fx.root.join("frontend/components/Button.tsx"));
        let layout = fx.layout();
        assert!(layout.module("frontend").is_none());

        let resolved =
            PathResolver::resolve(&layout, "frontend", "components/Button.tsx").unwrap();
        assert_eq!(resolved.path, expected);
        assert_eq!(resolved.strategy, ResolutionStrategy::ModulePrefix);
    }

    #[test]
    fn test_root_relative_for_single_module_workspace() {
        let fx = Fixture::new();
        let expected = fx.touch(&fx.root.join("target.ts"));

        let resolved = PathResolver::resolve(&fx.layout(), "project", "target.ts").unwrap();
        assert_eq!(resolved.path, expected);
        assert_eq!(resolved.strategy, ResolutionStrategy::RootRelative);
    }

    #[test]
    fn test_sibling_workspace() {
        let fx = Fixture::new();
        let expected = fx.touch(&fx.outer.join("shared/util/log.py"));

        let resolved = PathResolver::resolve(&fx.layout(), "shared", "util/log.py").unwrap();
        assert_eq!(resolved.path, expected);
        assert_eq!(resolved.strategy, ResolutionStrategy::SiblingWorkspace);
    }

    #[test]
    fn test_conventional_dir_module_as_parent() {
        let fx = Fixture::new();
        let expected = fx.touch(&fx.root.join("api/src/routes.go"));

        let resolved = PathResolver::resolve(&fx.layout(), "api", "routes.go").unwrap();
        // "api/routes.go" does not exist, so strategy 2 fails first
        assert_eq!(resolved.path, expected);
        assert_eq!(resolved.strategy, ResolutionStrategy::ConventionalDirectory);
    }

    #[test]
    fn test_conventional_dir_module_as_child() {
        let fx = Fixture::new();
        let expected = fx.touch(&fx.root.join("packages/ui/button.tsx"));

        let resolved = PathResolver::resolve(&fx.layout(), "ui", "button.tsx").unwrap();
        assert_eq!(resolved.path, expected);
        assert_eq!(resolved.strategy, ResolutionStrategy::ConventionalDirectory);
    }

    #[test]
    fn test_conventional_dir_order_respected() {
        let fx = Fixture::new();
        let expected = fx.touch(&fx.root.join("core/src/x.rs"));
        fx.touch(&fx.root.join("core/lib/x.rs"));

        let resolved = PathResolver::resolve(&fx.layout(), "core", "x.rs").unwrap();
        assert_eq!(resolved.path, expected);
    }

    #[test]
    fn test_file_name_fallback_unique() {
        let fx = Fixture::new();
        let expected = fx.touch(&fx.root.join("deep/nested/dir/Widget.kt"));

        let resolved = PathResolver::resolve(&fx.layout(), "nope", "old/place/Widget.kt").unwrap();
        assert_eq!(resolved.path, expected);
        assert_eq!(resolved.strategy, ResolutionStrategy::FileNameFallback);
    }

    #[test]
    fn test_file_name_fallback_prefers_substring_match() {
        let fx = Fixture::new();
        fx.touch(&fx.root.join("a/other/mod.rs"));
        let expected = fx.touch(&fx.root.join("b/net/http/mod.rs"));

        let resolved = PathResolver::resolve(&fx.layout(), "nope", "net/http/mod.rs").unwrap();
        assert_eq!(resolved.path, expected);
    }

    #[test]
    fn test_file_name_fallback_first_in_traversal_order() {
        let fx = Fixture::new();
        let first = fx.touch(&fx.root.join("a/mod.rs"));
        fx.touch(&fx.root.join("b/mod.rs"));

        let resolved = PathResolver::resolve(&fx.layout(), "nope", "zzz/mod.rs").unwrap();
        assert_eq!(resolved.path, first);
    }

    #[test]
    fn test_not_found() {
        let fx = Fixture::new();
        assert!(PathResolver::resolve(&fx.layout(), "m", "missing.ts").is_none());
    }

    #[test]
    fn test_directory_is_not_a_target() {
        let fx = Fixture::new();
        fs::create_dir_all(fx.root.join("m/dir")).unwrap();
        assert!(PathResolver::resolve(&fx.layout(), "m", "dir").is_none());
    }

    #[test]
    fn test_empty_relative_path_not_found() {
        let fx = Fixture::new();
        fx.touch(&fx.root.join("m/a.md"));
        assert!(PathResolver::resolve(&fx.layout(), "m", "").is_none());
    }

    #[test]
    fn test_bare_file_name_resolves_from_root() {
        let fx = Fixture::new();
        let readme = fx.touch(&fx.root.join("README.md"));
        let found = PathResolver::resolve(&fx.layout(), "README.md", "").unwrap();
        assert_eq!(found.path, readme);
        assert_eq!(found.strategy, ResolutionStrategy::RootRelative);

        let nested = fx.touch(&fx.root.join("docs/CHANGELOG.md"));
        let found = PathResolver::resolve(&fx.layout(), "CHANGELOG.md", "").unwrap();
        assert_eq!(found.path, nested);
        assert_eq!(found.strategy, ResolutionStrategy::FileNameFallback);

        let pointer = crate::reference::syntax::parse("@README.md:L2").unwrap();
        assert_eq!(
            PathResolver::resolve_pointer(&fx.layout(), &pointer).map(|t| t.path),
            Some(readme)
        );
    }

    #[test]
    fn test_parent_dir_segments_rejected() {
        let fx = Fixture::new();
        fx.touch(&fx.outer.join("secret.txt"));
        assert!(PathResolver::resolve(&fx.layout(), "m", "../../secret.txt").is_none());
    }

    #[test]
    fn test_sanitize_relative() {
        assert_eq!(
            sanitize_relative("./a/./b.rs"),
            Some(PathBuf::from("a/b.rs"))
        );
        assert_eq!(sanitize_relative("a/../b.rs"), None);
        assert_eq!(sanitize_relative(""), Some(PathBuf::new()));
    }
}
