//
// reference/syntax.rs
//
// Pointer grammar: scanning, parsing and formatting of `@module/path:L1-2`
//

use regex::Regex;
use std::sync::OnceLock;

use super::types::ParsedPointer;

/// Compiled regex patterns for pointer recognition
struct PointerPatterns {
    /// Coarse scan over arbitrary text
    scan: Regex,
    /// `:L<start>[-<end>]` suffix anchored at the end of a pointer
    line_suffix: Regex,
}

fn patterns() -> &'static PointerPatterns {
    static PATTERNS: OnceLock<PointerPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        // ASCII classes only: previously authored pointers must keep matching
        // exactly, independent of Unicode word rules.
        // Groups: 1=module, 2=path, 3=start line, 4=end line
        PointerPatterns {
            scan: Regex::new(
                r"@?([A-Za-z0-9_-]+)/([A-Za-z0-9_\-./()]+):[Ll]([0-9]+)(?:-([0-9]+))?",
            )
            .unwrap(),
            line_suffix: Regex::new(r":[Ll]([0-9]+)(?:-([0-9]+))?$").unwrap(),
        }
    })
}

/// One pointer occurrence in a larger text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerMatch<'t> {
    pub text: &'t str,
    /// Byte offset of the first character (including a leading `@`)
    pub start: usize,
    /// Byte offset one past the last character
    pub end: usize,
}

/// Scan `text` for all non-overlapping pointer occurrences, leftmost first.
///
/// A trailing `:L` without digits is not a match; nothing is logged for it.
pub fn find_all(text: &str) -> impl Iterator<Item = PointerMatch<'_>> + '_ {
    patterns().scan.find_iter(text).map(|m| PointerMatch {
        text: m.as_str(),
        start: m.start(),
        end: m.end(),
    })
}

/// Parse a single pointer. A leading `@` is optional.
///
/// Returns `None` (and logs a warning) when the `:L<digits>` suffix is
/// missing, a line number does not fit in `u32`, the start line is 0, or the
/// end line precedes the start line.
pub fn parse(pointer_text: &str) -> Option<ParsedPointer> {
    let body = pointer_text.strip_prefix('@').unwrap_or(pointer_text);

    let Some(caps) = patterns().line_suffix.captures(body) else {
        log::warn!("Invalid pointer '{}': missing :L<line> suffix", pointer_text);
        return None;
    };

    let start_line: u32 = match caps[1].parse() {
        Ok(n) => n,
        Err(e) => {
            log::warn!(
                "Invalid pointer '{}': bad start line '{}': {}",
                pointer_text,
                &caps[1],
                e
            );
            return None;
        }
    };
    let end_line: u32 = match caps.get(2) {
        Some(m) => match m.as_str().parse() {
            Ok(n) => n,
            Err(e) => {
                log::warn!(
                    "Invalid pointer '{}': bad end line '{}': {}",
                    pointer_text,
                    m.as_str(),
                    e
                );
                return None;
            }
        },
        None => start_line,
    };

    if start_line == 0 || end_line < start_line {
        log::warn!(
            "Invalid pointer '{}': line range {}-{} is not a 1-based ascending range",
            pointer_text,
            start_line,
            end_line
        );
        return None;
    }

    // Suffix match always starts at a char boundary (':')
    let location = &body[..caps.get(0).map(|m| m.start()).unwrap_or(body.len())];
    let (module_name, relative_path) = match location.split_once('/') {
        Some((module, path)) => (module.to_string(), path.to_string()),
        None => (location.to_string(), String::new()),
    };

    log::trace!(
        "Parsed pointer '{}': module='{}' path='{}' lines={}-{}",
        pointer_text,
        module_name,
        relative_path,
        start_line,
        end_line
    );

    Some(ParsedPointer {
        module_name,
        relative_path,
        start_line,
        end_line,
    })
}

/// Canonical pointer text. Single-line ranges omit the `-end` part.
pub fn format(module_name: &str, relative_path: &str, start_line: u32, end_line: u32) -> String {
    if end_line == start_line {
        format!("@{}/{}:L{}", module_name, relative_path, start_line)
    } else {
        format!(
            "@{}/{}:L{}-{}",
            module_name, relative_path, start_line, end_line
        )
    }
}
