//! End-to-end tests of the public API over real temporary workspaces.
//!
//! Run with: `cargo test -p coderef --test workspace_scan`

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use coderef::reference::{
    syntax, FileEvent, IndexerConfig, LineRange, PathResolver, ResolutionStrategy,
};
use coderef::state::WorkspaceIndexContext;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Workspace {
    _tmp: TempDir,
    root: PathBuf,
}

impl Workspace {
    /// A workspace at `<tmp>/ws` with the given files
    fn new(files: &[(&str, &str)]) -> Self {
        let tmp = TempDir::new().unwrap();
        let root = fs::canonicalize(tmp.path()).unwrap().join("ws");
        fs::create_dir_all(&root).unwrap();
        let ws = Self { _tmp: tmp, root };
        for (rel, content) in files {
            ws.write(rel, content);
        }
        ws
    }

    fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    fn context(&self) -> WorkspaceIndexContext {
        WorkspaceIndexContext::open(&self.root, IndexerConfig::default())
    }
}

fn scanned(ws: &Workspace) -> WorkspaceIndexContext {
    let ctx = ws.context();
    let summary = ctx.scan(&CancellationToken::new());
    assert!(!summary.cancelled);
    ctx
}

// ---------------------------------------------------------------------------
// Lookup over a single indexed reference
// ---------------------------------------------------------------------------

#[test]
fn single_range_lookup_is_inclusive() {
    let ws = Workspace::new(&[
        ("web/src/app.ts", ""),
        ("notes.md", "See @web/src/app.ts:L10-15 for the handler\n"),
    ]);
    let ctx = scanned(&ws);
    let target = Path::new("web/src/app.ts");

    for line in [10, 12, 15] {
        assert_eq!(ctx.references_at(target, line).len(), 1, "line {}", line);
    }
    for line in [9, 16] {
        assert!(ctx.references_at(target, line).is_empty(), "line {}", line);
    }

    let r = &ctx.references_at(target, 10)[0];
    assert_eq!(r.source_file, ws.root.join("notes.md"));
    assert_eq!((r.source_start_offset, r.source_end_offset), (4, 26));
    assert_eq!(r.definition_line, 1);
}

// ---------------------------------------------------------------------------
// Two distinct ranges on one target
// ---------------------------------------------------------------------------

#[test]
fn distinct_ranges_are_kept_apart() {
    let ws = Workspace::new(&[
        ("core/T.ts", ""),
        ("a.md", "@core/T.ts:L17-25"),
        ("b.md", "@core/T.ts:L30"),
    ]);
    let ctx = scanned(&ws);
    let target = Path::new("core/T.ts");

    let mut ranges = ctx.line_ranges(target);
    ranges.sort();
    assert_eq!(
        ranges,
        vec![LineRange::new(17, 25).unwrap(), LineRange::new(30, 30).unwrap()]
    );
    assert_eq!(ctx.references_at(target, 20).len(), 1);
    assert_eq!(ctx.references_at(target, 30).len(), 1);
    assert!(ctx.references_at(target, 27).is_empty());
}

// ---------------------------------------------------------------------------
// Grammar edge cases in running text
// ---------------------------------------------------------------------------

#[test]
fn pointer_grammar_in_running_text() {
    let text = "a @mod/x.ts:L5 b mod/y.py:l2-4 c @mod/z.ts:L d";
    let found: Vec<_> = syntax::find_all(text).map(|m| m.text).collect();
    assert_eq!(found, vec!["@mod/x.ts:L5", "mod/y.py:l2-4"]);

    let parsed = syntax::parse("mod/y.py:l2-4").unwrap();
    assert_eq!((parsed.start_line, parsed.end_line), (2, 4));
    assert!(syntax::parse("@mod/y.py:L4-2").is_none());
}

// ---------------------------------------------------------------------------
// Module-prefix resolution from the workspace root
// ---------------------------------------------------------------------------

#[test]
fn module_prefix_resolution() {
    let ws = Workspace::new(&[("frontend/components/Button.tsx", "")]);
    let ctx = ws.context();

    let resolved =
        PathResolver::resolve(ctx.layout().as_ref(), "frontend", "components/Button.tsx").unwrap();
    assert_eq!(resolved.path, ws.root.join("frontend/components/Button.tsx"));
    assert_eq!(resolved.strategy, ResolutionStrategy::ModulePrefix);

    assert!(PathResolver::resolve(ctx.layout().as_ref(), "frontend", "../escape.tsx").is_none());
}

// ---------------------------------------------------------------------------
// Event worker keeps a context current
// ---------------------------------------------------------------------------

#[tokio::test]
async fn worker_follows_edits_and_deletions() {
    let ws = Workspace::new(&[("lib/store.rs", ""), ("README.md", "@lib/store.rs:L1-3")]);
    let ctx = scanned(&ws);
    assert_eq!(ctx.references_at(Path::new("lib/store.rs"), 2).len(), 1);

    let readme = ws.write("README.md", "moved to @lib/store.rs:L8");
    let worker = ctx.spawn_worker();
    worker.send(FileEvent::Changed(readme));
    worker.finish().await;

    assert!(ctx.references_at(Path::new("lib/store.rs"), 2).is_empty());
    assert_eq!(ctx.references_at(Path::new("lib/store.rs"), 8).len(), 1);

    let store = ws.root.join("lib/store.rs");
    fs::remove_file(&store).unwrap();
    let worker = ctx.spawn_worker();
    worker.send(FileEvent::Removed(store));
    worker.finish().await;

    assert!(ctx.referenced_files().is_empty());
    assert_eq!(ctx.maintainer().pending_pointers(), 1);
}
