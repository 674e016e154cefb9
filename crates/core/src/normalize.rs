//! Normalization of data values before they are substituted into slides.

use regex::Regex;
use std::sync::LazyLock;

/// Regex to collapse any whitespace run (including newlines) into one space.
static WHITESPACE_COLLAPSE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Collapse whitespace runs to a single space and trim both ends.
///
/// Spreadsheet cells often carry line breaks and double spaces that would
/// otherwise break the slide layout.
pub fn normalize_value(value: &str) -> String {
    WHITESPACE_COLLAPSE_REGEX
        .replace_all(value, " ")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(normalize_value("Hello    world"), "Hello world");
        assert_eq!(normalize_value("  Hello  "), "Hello");
        assert_eq!(normalize_value("\t\tHello\t\t"), "Hello");
    }

    #[test]
    fn test_line_breaks_become_spaces() {
        assert_eq!(normalize_value("Line one\nLine two"), "Line one Line two");
        assert_eq!(normalize_value("a\r\n\r\nb"), "a b");
    }

    #[test]
    fn test_blank_becomes_empty() {
        assert_eq!(normalize_value(""), "");
        assert_eq!(normalize_value(" \n "), "");
    }
}
