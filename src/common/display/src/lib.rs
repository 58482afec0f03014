//! Display utilities for planeq.
//!
//! Provides box-drawing rendering for labeled trees and small string helpers
//! used by explain output.

mod tree;

pub use tree::{DisplayTree, TreeNode};

/// Truncate a string to at most `max_len` characters, appending `...`.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

/// Indent a multi-line string.
pub fn indent(s: &str, prefix: &str) -> String {
    s.lines()
        .map(|line| format!("{prefix}{line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("Scan(orders)", 40), "Scan(orders)");
        assert_eq!(truncate_string("Filter(a > 10)", 9), "Filter...");
    }

    #[test]
    fn test_truncate_multibyte() {
        assert_eq!(truncate_string("ÄÖÜäöü", 5), "ÄÖ...");
    }

    #[test]
    fn test_indent() {
        assert_eq!(indent("a\nb", "  "), "  a\n  b");
    }
}
