//! Selective re-coloring of a substring inside a paragraph.

use crate::types::{Paragraph, Rgb};
use std::ops::Range;

/// Color the first occurrence of `target` in the paragraph.
///
/// The run holding the match is split into up to three runs (before, match,
/// after), each keeping the run's formatting; only the match gets `color`.
/// Only runs are searched, so a target straddling two runs is not found.
/// Returns the index of the colored run, or `None` when `target` is empty or
/// absent.
pub fn highlight(paragraph: &mut Paragraph, target: &str, color: Rgb) -> Option<usize> {
    if target.is_empty() {
        return None;
    }
    let (index, start) = paragraph
        .runs
        .iter()
        .enumerate()
        .find_map(|(i, run)| run.text.find(target).map(|start| (i, start)))?;

    Some(isolate(paragraph, index, start..start + target.len(), color))
}

/// Split the run at `index` so the bytes in `range` form their own run
/// colored `color`, inserted right after the remaining prefix. The original
/// run keeps its position; when the prefix is empty it becomes the match.
pub(crate) fn isolate(paragraph: &mut Paragraph, index: usize, range: Range<usize>, color: Rgb) -> usize {
    let run = &paragraph.runs[index];
    let before = run.text[..range.start].to_string();
    let after = run.text[range.end..].to_string();

    let mut matched = run.derive(&run.text[range]);
    matched.format.color = Some(color);
    let after_run = (!after.is_empty()).then(|| run.derive(after));

    let at = if before.is_empty() {
        let run = &mut paragraph.runs[index];
        run.text = matched.text;
        run.format.color = Some(color);
        index
    } else {
        paragraph.runs[index].text = before;
        paragraph.insert_after(index, matched)
    };

    if let Some(after_run) = after_run {
        paragraph.insert_after(at, after_run);
    }
    at
}
