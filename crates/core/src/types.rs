//! Domain types for representing a slide deck as formatted text.
//!
//! The model only owns what substitution needs: slides, shapes, text frames,
//! paragraphs and runs. Container backends keep everything else and splice
//! the model back into the original package on save.

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// An entire presentation, loaded for the duration of one fill request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    /// Slides in presentation order.
    pub slides: Vec<Slide>,
}

impl Document {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a slide to the document.
    pub fn add_slide(&mut self, slide: Slide) {
        self.slides.push(slide);
    }

    /// All text frames in the document, depth-first, including group
    /// children and table cells.
    pub fn text_frames(&self) -> Vec<&TextFrame> {
        let mut frames = Vec::new();
        for slide in &self.slides {
            for shape in &slide.shapes {
                shape.collect_frames(&mut frames);
            }
        }
        frames
    }
}

/// A single slide.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Slide {
    /// 1-based slide number.
    pub number: usize,

    /// Top-level shapes in z-order.
    pub shapes: Vec<Shape>,
}

impl Slide {
    /// Create a new slide with the given number.
    pub fn new(number: usize) -> Self {
        Self {
            number,
            shapes: Vec::new(),
        }
    }

    /// Add a shape to this slide.
    pub fn add_shape(&mut self, shape: Shape) {
        self.shapes.push(shape);
    }
}

/// A shape, classified by what it can hold.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// A shape with a text frame (text box, placeholder, autoshape).
    Text { name: String, frame: TextFrame },
    /// A table; every cell owns a text frame.
    Table { name: String, table: Table },
    /// A group of child shapes.
    Group { name: String, shapes: Vec<Shape> },
    /// Pictures, connectors, charts and anything else without text.
    Other { name: String },
}

impl Shape {
    /// The shape's display name, empty when the container had none.
    pub fn name(&self) -> &str {
        match self {
            Shape::Text { name, .. }
            | Shape::Table { name, .. }
            | Shape::Group { name, .. }
            | Shape::Other { name } => name,
        }
    }

    fn collect_frames<'a>(&'a self, out: &mut Vec<&'a TextFrame>) {
        match self {
            Shape::Text { frame, .. } => out.push(frame),
            Shape::Table { table, .. } => {
                out.extend(table.rows.iter().flatten().map(|cell| &cell.frame))
            }
            Shape::Group { shapes, .. } => {
                for shape in shapes {
                    shape.collect_frames(out);
                }
            }
            Shape::Other { .. } => {}
        }
    }
}

/// A table grid.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    /// Rows of cells, top to bottom.
    pub rows: Vec<Vec<Cell>>,
}

/// A single table cell.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cell {
    pub frame: TextFrame,
}

/// An ordered sequence of paragraphs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextFrame {
    pub paragraphs: Vec<Paragraph>,

    /// Word-wrap flag. `None` means inherited from the layout.
    pub word_wrap: Option<bool>,
}

impl TextFrame {
    /// Create a frame from paragraphs, with wrapping inherited.
    pub fn new(paragraphs: Vec<Paragraph>) -> Self {
        Self {
            paragraphs,
            word_wrap: None,
        }
    }

    /// Paragraph texts joined by newlines.
    pub fn text(&self) -> String {
        self.paragraphs
            .iter()
            .map(Paragraph::text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Whether the frame holds any non-whitespace text.
    pub fn has_visible_text(&self) -> bool {
        self.paragraphs
            .iter()
            .flat_map(|p| p.runs.iter())
            .any(|r| !r.text.trim().is_empty())
    }

    /// Every run in every paragraph, mutably.
    pub fn runs_mut(&mut self) -> impl Iterator<Item = &mut Run> {
        self.paragraphs.iter_mut().flat_map(|p| p.runs.iter_mut())
    }
}

/// An ordered sequence of runs.
///
/// The paragraph's logical text is the concatenation of its run texts.
/// Runs are only ever inserted right after the run they came from, so the
/// relative order of existing runs never changes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Paragraph {
    pub runs: Vec<Run>,
}

impl Paragraph {
    /// Create a paragraph from runs.
    pub fn new(runs: Vec<Run>) -> Self {
        Self { runs }
    }

    /// Concatenated run texts.
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }

    /// Insert `run` immediately after the run at `index`, returning the
    /// new run's index.
    pub fn insert_after(&mut self, index: usize, run: Run) -> usize {
        let at = (index + 1).min(self.runs.len());
        self.runs.insert(at, run);
        at
    }

    /// Append a run at the end of the paragraph.
    pub fn push_run(&mut self, run: Run) {
        self.runs.push(run);
    }
}

/// An atomic span of uniformly formatted text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Run {
    pub text: String,
    pub format: RunFormat,

    /// Position of this run among the runs of the source paragraph.
    /// `None` for runs created during substitution.
    pub origin: Option<usize>,
}

impl Run {
    /// Create an unformatted run that did not come from a container.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            format: RunFormat::default(),
            origin: None,
        }
    }

    /// Set the run's formatting.
    pub fn with_format(mut self, format: RunFormat) -> Self {
        self.format = format;
        self
    }

    /// Record where the run sat in its source paragraph.
    pub fn with_origin(mut self, origin: usize) -> Self {
        self.origin = Some(origin);
        self
    }

    /// A new run with this run's formatting and the given text.
    pub fn derive(&self, text: impl Into<String>) -> Run {
        Run {
            text: text.into(),
            format: self.format.clone(),
            origin: None,
        }
    }
}

/// Character formatting of a run.
///
/// Every attribute is optional: `None` means inherited from the paragraph,
/// layout or theme, and copying a format leaves unset attributes unset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunFormat {
    /// Latin font family.
    pub font: Option<String>,
    pub size: Option<FontSize>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
    /// Explicit RGB color. Theme colors stay in `passthrough`.
    pub color: Option<Rgb>,

    /// Container-specific run properties the typed fields do not cover,
    /// serialized as the container stored them. Written back with the typed
    /// fields applied on top.
    pub passthrough: Option<String>,
}

/// Font size in hundredths of a point, as OOXML stores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FontSize(u32);

impl FontSize {
    pub const fn from_centipoints(value: u32) -> Self {
        Self(value)
    }

    pub fn from_points(points: f64) -> Self {
        Self((points * 100.0).round().max(0.0) as u32)
    }

    pub fn centipoints(self) -> u32 {
        self.0
    }

    pub fn points(self) -> f64 {
        f64::from(self.0) / 100.0
    }
}

/// An sRGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `RRGGBB` hex, with or without a leading `#`.
    pub fn from_hex(hex: &str) -> Result<Self> {
        let digits = hex.trim().trim_start_matches('#');
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::InvalidColor(hex.to_string()));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&digits[i..i + 2], 16).map_err(|_| Error::InvalidColor(hex.to_string()))
        };
        Ok(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }

    /// Uppercase `RRGGBB` hex, as OOXML writes it.
    pub fn to_hex(self) -> String {
        format!("{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Rgb {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}
