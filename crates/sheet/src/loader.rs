//! Workbook loading via calamine.

use calamine::{open_workbook_auto, Data, Reader};
use deckfill_core::{CellValue, DataTable, Error, Result};
use std::collections::HashMap;
use std::path::Path;

/// How date cells are rendered as text.
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Workbook extensions calamine can open.
const SUPPORTED_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Whether the path has a workbook extension we can read.
pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

/// Load the first worksheet. The first row is the header; every following
/// row that is not entirely blank becomes a data row.
pub fn load_table(path: &Path) -> Result<DataTable> {
    if !is_supported(path) {
        return Err(Error::UnsupportedFormat(format!(
            "'{}' is not a spreadsheet",
            path.display()
        )));
    }

    let mut workbook = open_workbook_auto(path)
        .map_err(|e| Error::SheetError(format!("Failed to open '{}': {}", path.display(), e)))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| Error::SheetError(format!("'{}' has no worksheets", path.display())))?
        .map_err(|e| Error::SheetError(format!("Failed to read first worksheet: {}", e)))?;

    let rows: Vec<Vec<CellValue>> = range
        .rows()
        .map(|row| row.iter().map(cell_value).collect())
        .collect();
    let table = table_from_rows(rows);
    log::debug!(
        "Loaded {} rows with columns {:?} from {}",
        table.len(),
        table.columns,
        path.display()
    );
    Ok(table)
}

fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty | Data::Error(_) => CellValue::Blank,
        Data::String(text) => CellValue::Text(text.clone()),
        Data::Float(n) => CellValue::Number(*n),
        Data::Int(n) => CellValue::Number(*n as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) if dt.is_datetime() => match dt.as_datetime() {
            Some(value) => CellValue::Text(value.format(DATETIME_FORMAT).to_string()),
            None => CellValue::Text(cell.to_string()),
        },
        Data::DateTimeIso(text) | Data::DurationIso(text) => CellValue::Text(text.clone()),
        _ => CellValue::Text(cell.to_string()),
    }
}

/// Build a table from raw rows, the first being the header.
///
/// Header names are trimmed; empty ones become `Unnamed: {index}` and
/// repeated ones get a `.{n}` suffix. Rows where every cell is blank are
/// dropped.
pub fn table_from_rows(rows: Vec<Vec<CellValue>>) -> DataTable {
    let mut rows = rows.into_iter();
    let Some(header) = rows.next() else {
        return DataTable::default();
    };

    let mut seen: HashMap<String, usize> = HashMap::new();
    let columns = header
        .iter()
        .enumerate()
        .map(|(index, cell)| {
            let name = cell
                .to_text()
                .map(|text| text.trim().to_string())
                .filter(|text| !text.is_empty())
                .unwrap_or_else(|| format!("Unnamed: {}", index));
            let count = seen.entry(name.clone()).or_insert(0);
            *count += 1;
            if *count > 1 {
                format!("{}.{}", name, *count - 1)
            } else {
                name
            }
        })
        .collect();

    let mut table = DataTable::new(columns);
    table.rows = rows
        .filter(|row| !row.iter().all(CellValue::is_blank))
        .collect();
    table
}
