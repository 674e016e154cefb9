//! Error types for deck filling.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a fill request.
///
/// Missing or blank data is not an error: it is substituted with a visible
/// warning. Shapes without text are skipped, not reported.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to open, read or write a file.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// The file format is not supported or could not be detected.
    #[error("Unsupported or unrecognized file format: {0}")]
    UnsupportedFormat(String),

    /// Failed to make sense of the PPTX package structure.
    #[error("PPTX parsing error: {0}")]
    PptxParseError(String),

    /// ZIP archive error (for PPTX).
    #[error("ZIP error: {0}")]
    ZipError(String),

    /// XML parsing or writing error (for PPTX).
    #[error("XML parsing error: {0}")]
    XmlError(String),

    /// Failed to load the data workbook.
    #[error("Spreadsheet error: {0}")]
    SheetError(String),

    /// The mapping configuration is malformed.
    #[error("Invalid mapping configuration: {0}")]
    ConfigurationError(String),

    /// The requested data row does not exist.
    #[error("row_index out of range. Got {index}, Excel has {rows} rows.")]
    RowOutOfRange { index: i64, rows: usize },

    /// A color could not be parsed as `RRGGBB` hex.
    #[error("Invalid color '{0}', expected six hex digits like 0066CC")]
    InvalidColor(String),
}
