//! Document traversal: applies substitution to every text frame.

use crate::config::FillOptions;
use crate::resolve::ReplacementTable;
use crate::splice::splice_paragraph;
use crate::types::{Document, FontSize, Shape, TextFrame};

/// Counters describing one fill pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FillReport {
    pub slides: usize,
    pub frames_visited: usize,
    pub frames_changed: usize,
    pub paragraphs_changed: usize,
    pub frames_clamped: usize,
}

/// Substitute `replacements` throughout the document, in place.
///
/// Every slide, shape, group child and table cell is visited. Frames that
/// end up with visible text get word wrap enabled; text boxes on the first
/// slide are also held to `options.title_max_font_size`.
pub fn apply_replacements(
    document: &mut Document,
    replacements: &ReplacementTable,
    options: &FillOptions,
) -> FillReport {
    let mut report = FillReport::default();

    for (idx, slide) in document.slides.iter_mut().enumerate() {
        let clamp = if idx == 0 {
            options.title_max_font_size
        } else {
            None
        };
        log::debug!("Filling slide {} ({} shapes)", slide.number, slide.shapes.len());
        for shape in &mut slide.shapes {
            walk_shape(shape, replacements, options, clamp, &mut report);
        }
        report.slides += 1;
    }

    log::info!(
        "Filled {} slides: {} of {} frames changed, {} paragraphs, {} clamped",
        report.slides,
        report.frames_changed,
        report.frames_visited,
        report.paragraphs_changed,
        report.frames_clamped
    );
    report
}

fn walk_shape(
    shape: &mut Shape,
    replacements: &ReplacementTable,
    options: &FillOptions,
    clamp: Option<FontSize>,
    report: &mut FillReport,
) {
    match shape {
        Shape::Text { frame, .. } => fill_frame(frame, replacements, options, clamp, report),
        Shape::Table { name, table } => {
            log::debug!("Table '{}' with {} rows", name, table.rows.len());
            for cell in table.rows.iter_mut().flatten() {
                fill_frame(&mut cell.frame, replacements, options, None, report);
            }
        }
        Shape::Group { shapes, .. } => {
            for child in shapes {
                walk_shape(child, replacements, options, clamp, report);
            }
        }
        Shape::Other { .. } => {}
    }
}

fn fill_frame(
    frame: &mut TextFrame,
    replacements: &ReplacementTable,
    options: &FillOptions,
    clamp: Option<FontSize>,
    report: &mut FillReport,
) {
    report.frames_visited += 1;

    let mut changed = false;
    for paragraph in &mut frame.paragraphs {
        if splice_paragraph(paragraph, replacements, options).changed() {
            report.paragraphs_changed += 1;
            changed = true;
        }
    }
    if changed {
        report.frames_changed += 1;
    }

    if !frame.has_visible_text() {
        return;
    }
    frame.word_wrap = Some(true);

    if let Some(max) = clamp {
        if clamp_font_size(frame, max) {
            report.frames_clamped += 1;
        }
    }
}

/// If any run has an explicit size above `max`, bring every explicitly
/// sized run in the frame down to at most `max`. Runs with inherited sizes
/// are left alone. Returns whether anything was clamped.
pub fn clamp_font_size(frame: &mut TextFrame, max: FontSize) -> bool {
    let oversized = frame
        .paragraphs
        .iter()
        .flat_map(|p| p.runs.iter())
        .any(|r| r.format.size.is_some_and(|size| size > max));
    if !oversized {
        return false;
    }
    for run in frame.runs_mut() {
        if let Some(size) = run.format.size.as_mut() {
            *size = (*size).min(max);
        }
    }
    true
}
