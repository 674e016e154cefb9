//! Spreadsheet backend: loads the first worksheet of a workbook into a
//! [`deckfill_core::DataTable`].

pub mod loader;

pub use loader::{is_supported, load_table, table_from_rows};
