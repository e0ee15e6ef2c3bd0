//
// reference/property_tests.rs
//
// Property-based tests for pointer syntax and the reference index
//

#![cfg(test)]

use proptest::prelude::*;
use std::path::{Path, PathBuf};

use super::index::ReferenceIndex;
use super::syntax::{find_all, format, parse};
use super::types::{LineRange, Reference};

// ============================================================================
// Generators
// ============================================================================

fn module_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_-]{0,8}"
}

fn relative_path() -> impl Strategy<Value = String> {
    (
        prop::collection::vec("[a-zA-Z0-9_]{1,8}", 1..=3),
        prop::sample::select(vec!["ts", "rs", "md", "py"]),
    )
        .prop_map(|(parts, ext)| format!("{}.{}", parts.join("/"), ext))
}

/// A valid `(start, end)` pair with `1 <= start <= end`
fn line_bounds() -> impl Strategy<Value = (u32, u32)> {
    (1u32..5000, 0u32..200).prop_map(|(start, len)| (start, start + len))
}

fn reference(source: &str, start: usize, range: (u32, u32)) -> Reference {
    Reference {
        source_file: PathBuf::from(source),
        source_start_offset: start,
        source_end_offset: start + 10,
        target_start_line: range.0,
        target_end_line: range.1,
        definition_line: 1,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // ========================================================================
    // Formatting then parsing yields the same components
    // ========================================================================

    #[test]
    fn prop_format_parse_round_trip(
        module in module_name(),
        path in relative_path(),
        (start, end) in line_bounds(),
    ) {
        let text = format(&module, &path, start, end);
        let parsed = parse(&text).expect("formatted pointer parses");
        prop_assert_eq!(parsed.module_name, module);
        prop_assert_eq!(parsed.relative_path, path);
        prop_assert_eq!(parsed.start_line, start);
        prop_assert_eq!(parsed.end_line, end);
    }

    // ========================================================================
    // A formatted pointer embedded in prose is found at its exact offsets
    // ========================================================================

    #[test]
    fn prop_find_all_locates_embedded_pointer(
        prefix in "[a-z ]{0,20}",
        module in module_name(),
        path in relative_path(),
        (start, end) in line_bounds(),
    ) {
        let pointer = format(&module, &path, start, end);
        let text = format!("{} {} and more", prefix, pointer);
        let matches: Vec<_> = find_all(&text).collect();
        prop_assert_eq!(matches.len(), 1);
        prop_assert_eq!(matches[0].text, pointer.as_str());
        prop_assert_eq!(matches[0].start, prefix.len() + 1);
    }

    // ========================================================================
    // Lookup returns a reference iff the line lies inside its range
    // ========================================================================

    #[test]
    fn prop_containment_iff_inside_range(
        (start, end) in line_bounds(),
        probe in 0u32..5300,
    ) {
        let index = ReferenceIndex::new();
        let target = Path::new("/ws/target.rs");
        index.add(target, reference("/ws/src.md", 0, (start, end)));

        let found = !index.find_references_to_location(target, probe).is_empty();
        prop_assert_eq!(found, start <= probe && probe <= end);
        prop_assert_eq!(
            LineRange::new(start, end).map(|r| r.contains(probe)),
            Some(found)
        );
    }

    // ========================================================================
    // Adding the same reference repeatedly stores it once
    // ========================================================================

    #[test]
    fn prop_add_is_idempotent(
        (start, end) in line_bounds(),
        offset in 0usize..10_000,
        repeats in 1usize..5,
    ) {
        let index = ReferenceIndex::new();
        let target = Path::new("/ws/target.rs");
        for _ in 0..repeats {
            index.add(target, reference("/ws/src.md", offset, (start, end)));
        }
        prop_assert_eq!(index.reference_count(), 1);
        prop_assert_eq!(index.find_references_to_location(target, start).len(), 1);
    }

    // ========================================================================
    // Removing a source leaves no reference from it anywhere
    // ========================================================================

    #[test]
    fn prop_remove_outbound_clears_source(
        ranges in prop::collection::vec(line_bounds(), 1..10),
    ) {
        let index = ReferenceIndex::new();
        for (i, range) in ranges.iter().enumerate() {
            let target = PathBuf::from(format!("/ws/t{}.rs", i));
            index.add(&target, reference("/ws/a.md", i * 20, *range));
            index.add(&target, reference("/ws/b.md", i * 20, *range));
        }

        index.remove_outbound_references(Path::new("/ws/a.md"));

        for file in index.get_all_files_with_references() {
            for (_, refs) in index.entries_for_file(&file) {
                prop_assert!(refs.iter().all(|r| r.source_file != Path::new("/ws/a.md")));
            }
        }
        prop_assert_eq!(index.reference_count(), ranges.len());
    }
}
