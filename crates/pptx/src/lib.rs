//! PPTX (Office Open XML) backend for the deck model.
//!
//! A .pptx file is a ZIP archive of XML parts. [`PptxPackage`] keeps every
//! part, lowers slide text into a [`deckfill_core::Document`] and splices the
//! filled model back into the slide XML on save.

pub mod package;
pub mod slide;
pub mod xml;

pub use package::PptxPackage;
