//! Core deck model and run-preserving placeholder substitution for filling
//! PowerPoint templates from spreadsheet rows.

pub mod config;
pub mod data;
pub mod error;
pub mod highlight;
pub mod normalize;
pub mod resolve;
pub mod splice;
pub mod token;
pub mod types;
pub mod walker;

pub use config::{FillOptions, MappingEntry, MappingStore, Palette};
pub use data::{CellValue, DataRow, DataTable};
pub use error::{Error, Result};
pub use highlight::highlight;
pub use normalize::normalize_value;
pub use resolve::{
    build_mapping_table, build_replacements, MappingTable, Replacement, ReplacementKind,
    ReplacementTable,
};
pub use splice::{splice_paragraph, SpliceOutcome};
pub use token::{detect_placeholders, detect_tokens, scan_tokens, TokenSyntax};
pub use types::{
    Cell, Document, FontSize, Paragraph, Rgb, Run, RunFormat, Shape, Slide, Table, TextFrame,
};
pub use walker::{apply_replacements, FillReport};
