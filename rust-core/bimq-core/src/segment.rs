// SPDX-License-Identifier: PMPL-1.0-or-later
//! Query segmentation.
//!
//! A query line is a filter clause optionally followed by value clauses, all
//! separated by [`DELIMITER`]:
//!
//! ```text
//! IfcWall, Name=W-01 ; Name ; type.Name
//! └──── filter ────┘   └┬─┘   └──┬────┘
//!                     value clauses
//! ```
//!
//! A delimiter inside double quotes or preceded by a backslash does not split.

/// Separates the filter clause from value clauses, and value clauses from each other.
pub const DELIMITER: char = ';';

/// A query line split into its clauses.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Segments {
    pub filter: String,
    /// Value clauses in column order; empty clauses are kept.
    pub values: Vec<String>,
}

impl Segments {
    /// True when no value clause carries any text (entity-dump mode).
    pub fn is_filter_only(&self) -> bool {
        self.values.iter().all(String::is_empty)
    }
}

/// Split a raw query line into its filter clause and value clauses.
///
/// `k` unescaped delimiters always produce exactly `k` value clauses, each
/// trimmed of surrounding whitespace.
pub fn segment(raw: &str) -> Segments {
    let mut clauses = split_top_level(raw, DELIMITER)
        .into_iter()
        .map(|clause| unescape_delimiter(clause).trim().to_string());
    let filter = clauses.next().unwrap_or_default();
    Segments {
        filter,
        values: clauses.collect(),
    }
}

/// Reconstruct the longest evaluable filter prefix for the token under the cursor.
///
/// Everything before the last comma that precedes the incomplete token is
/// returned, or the empty string when that token is the first in the clause.
pub fn extract_partial_filter(raw: &str, cursor: usize) -> String {
    let before = &raw[..clamp_cursor(raw, cursor)];
    let filter_text = match separator_positions(before, &[DELIMITER]).first() {
        Some(&(pos, _)) => &before[..pos],
        None => before,
    };
    match separator_positions(filter_text, &[',']).last() {
        Some(&(pos, _)) => unescape_delimiter(&filter_text[..pos]).trim().to_string(),
        None => String::new(),
    }
}

/// Clamp a cursor byte offset into `raw`, backing off to a char boundary.
pub fn clamp_cursor(raw: &str, cursor: usize) -> usize {
    let mut pos = cursor.min(raw.len());
    while !raw.is_char_boundary(pos) {
        pos -= 1;
    }
    pos
}

/// Byte offsets of separator characters outside double quotes and not
/// escaped by a backslash.
pub(crate) fn separator_positions(text: &str, separators: &[char]) -> Vec<(usize, char)> {
    let mut positions = Vec::new();
    let mut in_quotes = false;
    let mut escaped = false;

    for (i, ch) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '"' => in_quotes = !in_quotes,
            c if !in_quotes && separators.contains(&c) => positions.push((i, c)),
            _ => {}
        }
    }

    positions
}

/// Whether `text` ends inside an unterminated double-quoted string.
pub(crate) fn ends_in_open_quote(text: &str) -> bool {
    let mut in_quotes = false;
    let mut escaped = false;
    for ch in text.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '"' => in_quotes = !in_quotes,
            _ => {}
        }
    }
    in_quotes
}

fn split_top_level(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    for (pos, ch) in separator_positions(text, &[separator]) {
        parts.push(&text[start..pos]);
        start = pos + ch.len_utf8();
    }
    parts.push(&text[start..]);
    parts
}

fn unescape_delimiter(text: &str) -> String {
    text.replace("\\;", ";")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_only() {
        let s = segment("  IfcWall, Name=W-01  ");
        assert_eq!(s.filter, "IfcWall, Name=W-01");
        assert!(s.values.is_empty());
        assert!(s.is_filter_only());
    }

    #[test]
    fn test_value_clauses_in_order() {
        let s = segment("IfcWall ; Name ; type.Name");
        assert_eq!(s.filter, "IfcWall");
        assert_eq!(s.values, vec!["Name", "type.Name"]);
        assert!(!s.is_filter_only());
    }

    #[test]
    fn test_consecutive_delimiters_keep_empty_clause() {
        let s = segment("IfcWall;Name;;Tag");
        assert_eq!(s.values, vec!["Name", "", "Tag"]);
    }

    #[test]
    fn test_trailing_delimiter_is_filter_only() {
        let s = segment("IfcWall;");
        assert_eq!(s.values, vec![""]);
        assert!(s.is_filter_only());
    }

    #[test]
    fn test_quoted_delimiter_does_not_split() {
        let s = segment(r#"IfcWall, Name="a;b" ; Name"#);
        assert_eq!(s.filter, r#"IfcWall, Name="a;b""#);
        assert_eq!(s.values, vec!["Name"]);
    }

    #[test]
    fn test_escaped_delimiter_does_not_split() {
        let s = segment(r"IfcWall, Name=a\;b ; Name");
        assert_eq!(s.filter, "IfcWall, Name=a;b");
        assert_eq!(s.values, vec!["Name"]);
    }

    #[test]
    fn test_empty_input() {
        let s = segment("");
        assert_eq!(s.filter, "");
        assert!(s.values.is_empty());
    }

    #[test]
    fn test_partial_filter_before_pset_dot() {
        let raw = "IfcWall, Pset_WallCommon.";
        assert_eq!(extract_partial_filter(raw, raw.len()), "IfcWall");
    }

    #[test]
    fn test_partial_filter_before_comparison() {
        let raw = "IfcWall, IfcSlab, Name=";
        assert_eq!(extract_partial_filter(raw, raw.len()), "IfcWall, IfcSlab");
    }

    #[test]
    fn test_partial_filter_first_token() {
        assert_eq!(extract_partial_filter("Pset_WallCommon.", 16), "");
        assert_eq!(extract_partial_filter("IfcWa", 5), "");
    }

    #[test]
    fn test_partial_filter_ignores_quoted_comma() {
        let raw = r#"IfcWall, Name="a, b"#;
        assert_eq!(extract_partial_filter(raw, raw.len()), "IfcWall");
    }

    #[test]
    fn test_partial_filter_uses_cursor() {
        let raw = "IfcWall, Na ; Name";
        assert_eq!(extract_partial_filter(raw, 11), "IfcWall");
    }

    #[test]
    fn test_clamp_cursor_char_boundary() {
        let raw = "Name=Wänd";
        // byte 7 falls inside 'ä'
        assert_eq!(clamp_cursor(raw, 7), 6);
        assert_eq!(clamp_cursor(raw, 100), raw.len());
    }

    #[test]
    fn test_open_quote_detection() {
        assert!(ends_in_open_quote(r#"Name="abc"#));
        assert!(!ends_in_open_quote(r#"Name="abc""#));
        assert!(!ends_in_open_quote(r#"Name=\"abc"#));
    }
}
