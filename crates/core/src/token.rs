//! Placeholder token scanning for template introspection.
//!
//! Scanning is read-only. Substitution never re-scans text; it matches the
//! tokens of a replacement table literally.

use crate::types::Document;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

/// `{{NAME}}` detection tokens.
static BRACE_TOKEN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([^}]+)\}\}").unwrap());

/// `[name]` replacement tokens.
static BRACKET_TOKEN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\[\]]+)\]").unwrap());

/// Which placeholder syntax to look for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSyntax {
    /// `{{NAME}}`
    Brace,
    /// `[name]`
    Bracket,
}

impl TokenSyntax {
    fn regex(self) -> &'static Regex {
        match self {
            TokenSyntax::Brace => &*BRACE_TOKEN_REGEX,
            TokenSyntax::Bracket => &*BRACKET_TOKEN_REGEX,
        }
    }
}

/// Distinct token names (delimiters stripped, case and whitespace kept)
/// found in `text`, sorted.
pub fn scan_tokens(text: &str, syntax: TokenSyntax) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    collect_tokens(text, syntax, &mut names);
    names
}

fn collect_tokens(text: &str, syntax: TokenSyntax, names: &mut BTreeSet<String>) {
    for caps in syntax.regex().captures_iter(text) {
        names.insert(caps[1].to_string());
    }
}

/// Sorted distinct `{{NAME}}` placeholders across every paragraph of the
/// document, tables and groups included.
pub fn detect_placeholders(document: &Document) -> Vec<String> {
    detect_tokens(document, TokenSyntax::Brace)
}

/// Sorted distinct tokens of the given syntax across the document.
///
/// Paragraph text is scanned as a whole, so tokens split across runs are
/// found too.
pub fn detect_tokens(document: &Document, syntax: TokenSyntax) -> Vec<String> {
    let mut names = BTreeSet::new();
    for frame in document.text_frames() {
        for paragraph in &frame.paragraphs {
            collect_tokens(&paragraph.text(), syntax, &mut names);
        }
    }
    names.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Paragraph, Run, Shape, Slide, TextFrame};

    #[test]
    fn test_scan_brace_tokens() {
        let names = scan_tokens("{{B}} and {{A}} and {{B}} and {{ spaced }}", TokenSyntax::Brace);
        let names: Vec<_> = names.into_iter().collect();
        assert_eq!(names, vec![" spaced ", "A", "B"]);
    }

    #[test]
    fn test_scan_empty_input() {
        assert!(scan_tokens("", TokenSyntax::Brace).is_empty());
        assert!(scan_tokens("no tokens here", TokenSyntax::Bracket).is_empty());
    }

    #[test]
    fn test_scan_bracket_tokens() {
        let names: Vec<_> = scan_tokens("Hi [Name], see [project_1_name]", TokenSyntax::Bracket)
            .into_iter()
            .collect();
        assert_eq!(names, vec!["Name", "project_1_name"]);
    }

    #[test]
    fn test_detect_across_runs() {
        let paragraph = Paragraph::new(vec![Run::new("Dear {{FIR"), Run::new("ST}} {{LAST}}")]);
        let mut slide = Slide::new(1);
        slide.add_shape(Shape::Group {
            name: String::new(),
            shapes: vec![Shape::Text {
                name: String::new(),
                frame: TextFrame::new(vec![paragraph]),
            }],
        });
        let mut document = Document::new();
        document.add_slide(slide);

        assert_eq!(detect_placeholders(&document), vec!["FIRST", "LAST"]);
    }
}
