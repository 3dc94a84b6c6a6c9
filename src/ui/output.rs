//! ui::output
//!
//! Output formatting and display.
//!
//! # Design
//!
//! Results go to stdout and respect the quiet flag. Warnings and errors go
//! to stderr so scripted use of `pit list` or `pit log` stays parseable.

use std::fmt::Display;

use crate::core::diff::Diff;
use crate::engine::CommitSummary;

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Quiet mode - minimal output
    Quiet,
    /// Normal mode - standard output
    Normal,
    /// Debug mode - verbose output
    Debug,
}

impl Verbosity {
    /// Create verbosity from flags.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }
}

/// Print a message (respects quiet mode).
pub fn print(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
}

/// Print an error message (always shown).
pub fn error(message: impl Display) {
    eprintln!("error: {}", message);
}

/// Print a warning message (respects quiet mode).
pub fn warn(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        eprintln!("warning: {}", message);
    }
}

/// Print a success message (respects quiet mode).
pub fn success(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
}

/// Format a list of items.
pub fn format_list<T: Display>(items: &[T], prefix: &str) -> String {
    items
        .iter()
        .map(|item| format!("{}{}", prefix, item))
        .collect::<Vec<_>>()
        .join("\n")
}

/// One `pit log` line: id, timestamp, file count, message.
pub fn format_commit(summary: &CommitSummary) -> String {
    format!(
        "{}  {}  {:>4} file(s)  {}",
        summary.id,
        summary.timestamp.format("%Y-%m-%d %H:%M:%S"),
        summary.files,
        summary.message
    )
}

/// Indented status listing, or a one-liner when clean.
pub fn format_diff(diff: &Diff) -> String {
    if diff.is_empty() {
        return "working tree clean".to_string();
    }
    diff.to_string()
        .lines()
        .map(|line| format!("  {}", line))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{CommitId, RelPath};
    use chrono::{TimeZone, Utc};

    #[test]
    fn verbosity_flags() {
        assert_eq!(Verbosity::from_flags(true, true), Verbosity::Quiet);
        assert_eq!(Verbosity::from_flags(false, true), Verbosity::Debug);
        assert_eq!(Verbosity::from_flags(false, false), Verbosity::Normal);
    }

    #[test]
    fn commit_line() {
        let summary = CommitSummary {
            id: CommitId::parse("002_first").unwrap(),
            message: "first".into(),
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            files: 3,
        };
        assert_eq!(
            format_commit(&summary),
            "002_first  2024-05-01 12:00:00     3 file(s)  first"
        );
    }

    #[test]
    fn diff_listing() {
        assert_eq!(format_diff(&Diff::default()), "working tree clean");

        let mut diff = Diff::default();
        diff.added.insert(RelPath::new("a.txt").unwrap());
        diff.removed.insert(RelPath::new("b.txt").unwrap());
        assert_eq!(format_diff(&diff), "  A a.txt\n  D b.txt");
        assert_eq!(format_list(&["x", "y"], "- "), "- x\n- y");
    }
}
