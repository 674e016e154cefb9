//! Run-preserving placeholder substitution within a paragraph.
//!
//! Pass 1 replaces tokens that sit entirely inside one run, editing that run
//! in place and splitting off names and missing-field warnings as their own
//! colored runs. Pass 2 catches tokens that straddle run boundaries by
//! substituting on the concatenated paragraph text and collapsing it into
//! the first run.

use crate::config::FillOptions;
use crate::highlight::isolate;
use crate::resolve::{Replacement, ReplacementTable};
use crate::types::{Paragraph, Rgb, Run};
use std::collections::HashMap;
use std::ops::Range;

/// What splicing did to one paragraph.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SpliceOutcome {
    /// Runs rewritten by the single-run pass.
    pub runs_replaced: usize,
    /// Whether the cross-run pass collapsed the paragraph.
    pub merged: bool,
}

impl SpliceOutcome {
    pub fn changed(&self) -> bool {
        self.runs_replaced > 0 || self.merged
    }
}

/// A piece of substituted run text, colored when it is a flagged value.
#[derive(Debug, Clone, PartialEq)]
struct Segment {
    text: String,
    color: Option<Rgb>,
}

impl Segment {
    fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            color: None,
        }
    }
}

/// The color a replacement's text is flagged with, if any.
fn flag_color(replacement: &Replacement, options: &FillOptions) -> Option<Rgb> {
    if replacement.is_missing() {
        Some(options.palette.warning_color)
    } else if options.is_name_placeholder(&replacement.placeholder) {
        Some(options.palette.name_color)
    } else {
        None
    }
}

/// Replace every placeholder of `replacements` in `paragraph`.
///
/// Replacements apply in table order and each one sees the text left by the
/// previous ones. Plain values are spliced inline; flagged values are never
/// searched again by later replacements of the same run.
pub fn splice_paragraph(
    paragraph: &mut Paragraph,
    replacements: &ReplacementTable,
    options: &FillOptions,
) -> SpliceOutcome {
    let mut outcome = SpliceOutcome::default();
    if replacements.is_empty() {
        return outcome;
    }

    let base_format = paragraph.runs.first().map(|r| r.format.clone());
    let mut flagged: Vec<(String, Rgb)> = Vec::new();

    let mut index = 0;
    while index < paragraph.runs.len() {
        let text = &paragraph.runs[index].text;
        if text.is_empty() || !replacements.iter().any(|r| text.contains(&r.placeholder)) {
            index += 1;
            continue;
        }
        let segments = substitute(text, replacements, options);
        index = materialize(paragraph, index, segments, &mut flagged) + 1;
        outcome.runs_replaced += 1;
    }

    let text = paragraph.text();
    if replacements.iter().any(|r| text.contains(&r.placeholder)) {
        let mut merged = text;
        for replacement in replacements {
            if !merged.contains(&replacement.placeholder) {
                continue;
            }
            let occurrences = merged.matches(replacement.placeholder.as_str()).count();
            merged = merged.replace(&replacement.placeholder, &replacement.text);
            if let Some(color) = flag_color(replacement, options) {
                // Every warning is colored; a name only at its first occurrence.
                let count = if replacement.is_missing() { occurrences } else { 1 };
                flagged.extend(std::iter::repeat((replacement.text.clone(), color)).take(count));
            }
        }
        log::debug!("Collapsed paragraph with a token split across runs: {:?}", merged);

        match paragraph.runs.first_mut() {
            Some(first) => {
                first.text = merged;
                if let Some(format) = base_format {
                    first.format = format;
                }
                for run in paragraph.runs.iter_mut().skip(1) {
                    run.text.clear();
                }
            }
            None => paragraph.push_run(Run::new(merged)),
        }

        recolor_collapsed(paragraph, &flagged);
        outcome.merged = true;
    }

    outcome
}

/// Color the flagged values inside the collapsed first run.
///
/// Each entry claims the next occurrence of its text after the previous
/// claim of the same value and color, skipping occurrences that overlap an
/// earlier claim. Claimed ranges are then split off from the end backwards
/// so earlier ranges stay inside the first run.
fn recolor_collapsed(paragraph: &mut Paragraph, flagged: &[(String, Rgb)]) {
    let Some(first) = paragraph.runs.first() else {
        return;
    };
    let text = first.text.clone();

    let mut claimed: Vec<(Range<usize>, Rgb)> = Vec::new();
    let mut cursors: HashMap<(&str, Rgb), usize> = HashMap::new();
    for (target, color) in flagged {
        if target.is_empty() {
            continue;
        }
        let cursor = cursors.entry((target.as_str(), *color)).or_insert(0);
        let found = text[*cursor..]
            .match_indices(target.as_str())
            .map(|(at, _)| *cursor + at..*cursor + at + target.len())
            .find(|range| {
                !claimed
                    .iter()
                    .any(|(taken, _)| taken.start < range.end && range.start < taken.end)
            });
        if let Some(range) = found {
            *cursor = range.end;
            claimed.push((range, *color));
        }
    }

    claimed.sort_by_key(|(range, _)| range.start);
    for (range, color) in claimed.into_iter().rev() {
        isolate(paragraph, 0, range, color);
    }
}

/// Apply all replacements to one run's text.
fn substitute(text: &str, replacements: &ReplacementTable, options: &FillOptions) -> Vec<Segment> {
    let mut segments = vec![Segment::plain(text)];

    for replacement in replacements {
        let token = replacement.placeholder.as_str();
        let color = flag_color(replacement, options);
        let mut next = Vec::with_capacity(segments.len());

        for segment in segments {
            if segment.color.is_some() || !segment.text.contains(token) {
                next.push(segment);
                continue;
            }
            match color {
                None => next.push(Segment::plain(segment.text.replace(token, &replacement.text))),
                Some(color) => {
                    let mut pieces = segment.text.split(token).peekable();
                    while let Some(piece) = pieces.next() {
                        next.push(Segment::plain(piece));
                        if pieces.peek().is_some() {
                            next.push(Segment {
                                text: replacement.text.clone(),
                                color: Some(color),
                            });
                        }
                    }
                }
            }
        }
        segments = next;
    }

    segments
}

/// Write `segments` back as runs: the first into the run at `index`, the
/// rest as new runs right after it with the same formatting. Returns the
/// index of the last run written.
fn materialize(
    paragraph: &mut Paragraph,
    index: usize,
    segments: Vec<Segment>,
    flagged: &mut Vec<(String, Rgb)>,
) -> usize {
    let source = paragraph.runs[index].clone();
    let mut pieces = segments.into_iter().filter(|s| !s.text.is_empty());

    let Some(first) = pieces.next() else {
        paragraph.runs[index].text.clear();
        return index;
    };
    let run = &mut paragraph.runs[index];
    run.text = first.text;
    if let Some(color) = first.color {
        run.format.color = Some(color);
        flagged.push((run.text.clone(), color));
    }

    let mut last = index;
    for piece in pieces {
        let mut run = source.derive(piece.text);
        if let Some(color) = piece.color {
            run.format.color = Some(color);
            flagged.push((run.text.clone(), color));
        }
        last = paragraph.insert_after(last, run);
    }
    last
}
