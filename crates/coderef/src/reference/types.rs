//
// reference/types.rs
//
// Core types for code pointers and the reference graph
//

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// A pointer parsed from text such as `@module/path/to/file.ts:L10-15`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParsedPointer {
    /// First path segment
    pub module_name: String,
    /// Remainder of the path after the first `/` (may be empty)
    pub relative_path: String,
    /// 1-based
    pub start_line: u32,
    /// 1-based, `>= start_line`
    pub end_line: u32,
}

impl ParsedPointer {
    pub fn line_range(&self) -> LineRange {
        LineRange {
            start_line: self.start_line,
            end_line: self.end_line,
        }
    }

    /// Canonical pointer text for this pointer
    pub fn to_pointer_text(&self) -> String {
        super::syntax::format(
            &self.module_name,
            &self.relative_path,
            self.start_line,
            self.end_line,
        )
    }
}

impl fmt::Display for ParsedPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_pointer_text())
    }
}

/// Inclusive 1-based line interval on a target file.
///
/// Two ranges are equal only when both bounds match; overlapping ranges are
/// distinct keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LineRange {
    pub start_line: u32,
    pub end_line: u32,
}

impl LineRange {
    /// Returns `None` unless `1 <= start_line <= end_line`
    pub fn new(start_line: u32, end_line: u32) -> Option<Self> {
        if start_line == 0 || end_line < start_line {
            return None;
        }
        Some(Self {
            start_line,
            end_line,
        })
    }

    pub fn single(line: u32) -> Option<Self> {
        Self::new(line, line)
    }

    pub fn contains(&self, line: u32) -> bool {
        self.start_line <= line && line <= self.end_line
    }

    pub fn is_single_line(&self) -> bool {
        self.start_line == self.end_line
    }
}

impl fmt::Display for LineRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_single_line() {
            write!(f, "L{}", self.start_line)
        } else {
            write!(f, "L{}-{}", self.start_line, self.end_line)
        }
    }
}

/// One recorded edge from pointer text in a source file to a target line range
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference {
    /// File containing the pointer text
    pub source_file: PathBuf,
    /// Byte offset where the pointer text starts
    pub source_start_offset: usize,
    /// Byte offset one past the end of the pointer text
    pub source_end_offset: usize,
    pub target_start_line: u32,
    pub target_end_line: u32,
    /// 1-based line in the source file where the pointer text begins
    pub definition_line: u32,
}

impl Reference {
    pub fn target_range(&self) -> LineRange {
        LineRange {
            start_line: self.target_start_line,
            end_line: self.target_end_line,
        }
    }

    /// Dedup key within one LineRange: offsets and definition line do not participate
    pub(crate) fn same_key(&self, other: &Reference) -> bool {
        self.source_file == other.source_file
            && self.target_start_line == other.target_start_line
            && self.target_end_line == other.target_end_line
    }
}

/// A pointer occurrence found in a source file, with its resolution state.
///
/// Kept by the maintainer so unresolved pointers can be retried when new
/// files appear.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedPointer {
    pub pointer: ParsedPointer,
    pub start_offset: usize,
    pub end_offset: usize,
    /// 1-based
    pub definition_line: u32,
    /// Resolved target, `None` while the target cannot be found
    pub target: Option<PathBuf>,
}
