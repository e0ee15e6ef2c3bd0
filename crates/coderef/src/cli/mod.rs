// cli/mod.rs - subcommands of the `coderef` binary

use std::path::Path;

use crate::reference::syntax;
use crate::reference::LineRange;

pub mod refs;
pub mod scan;
pub mod watch;

/// Path of `file` relative to `root` when it lies inside it, otherwise as given
pub fn display_path(root: &Path, file: &Path) -> String {
    file.strip_prefix(root)
        .unwrap_or(file)
        .display()
        .to_string()
}

/// Parsed arguments for the `format` subcommand.
#[derive(Debug, PartialEq, Eq)]
pub struct FormatArgs {
    pub module_name: String,
    pub relative_path: String,
    pub range: LineRange,
}

/// Parse `format` arguments.
///
/// Expected usage: `coderef format <module> <path> <start> [end]`
pub fn parse_format_args(args: &mut impl Iterator<Item = String>) -> Result<FormatArgs, String> {
    let positional: Vec<String> = args.collect();
    let (module_name, relative_path, start, end) = match positional.as_slice() {
        [m, p, s] => (m, p, s, None),
        [m, p, s, e] => (m, p, s, Some(e)),
        _ => return Err("Expected <module> <path> <start> [end]".to_string()),
    };

    let parse_line = |text: &String| -> Result<u32, String> {
        text.parse()
            .map_err(|_| format!("Invalid line number: '{}'", text))
    };
    let start = parse_line(start)?;
    let end = end.map(parse_line).transpose()?.unwrap_or(start);
    let range = LineRange::new(start, end)
        .ok_or_else(|| format!("Invalid line range {}-{}: expected 1 <= start <= end", start, end))?;

    Ok(FormatArgs {
        module_name: module_name.clone(),
        relative_path: relative_path.clone(),
        range,
    })
}

/// Canonical pointer text for the given components
pub fn run_format(args: &FormatArgs) -> String {
    syntax::format(
        &args.module_name,
        &args.relative_path,
        args.range.start_line,
        args.range.end_line,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> std::vec::IntoIter<String> {
        list.iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .into_iter()
    }

    #[test]
    fn test_format_range_and_single_line() {
        let range = parse_format_args(&mut args(&["web", "src/app.ts", "10", "15"])).unwrap();
        assert_eq!(run_format(&range), "@web/src/app.ts:L10-15");

        let single = parse_format_args(&mut args(&["web", "src/app.ts", "7"])).unwrap();
        assert_eq!(run_format(&single), "@web/src/app.ts:L7");
    }

    #[test]
    fn test_format_rejects_bad_ranges() {
        assert!(parse_format_args(&mut args(&["m", "a.rs", "0"])).is_err());
        assert!(parse_format_args(&mut args(&["m", "a.rs", "9", "3"])).is_err());
        assert!(parse_format_args(&mut args(&["m", "a.rs", "x"])).is_err());
        assert!(parse_format_args(&mut args(&["m", "a.rs"])).is_err());
    }

    #[test]
    fn test_display_path() {
        assert_eq!(display_path(Path::new("/ws"), Path::new("/ws/a/b.md")), "a/b.md");
        assert_eq!(display_path(Path::new("/ws"), Path::new("/other/c.md")), "/other/c.md");
    }
}
