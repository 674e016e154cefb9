//! Tabular row data that placeholders are filled from.

use crate::error::{Error, Result};

/// A single scalar cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Blank,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl CellValue {
    /// The value as text, or `None` when it is blank or not a number.
    pub fn to_text(&self) -> Option<String> {
        match self {
            CellValue::Blank => None,
            CellValue::Text(s) => Some(s.clone()),
            CellValue::Number(n) if n.is_nan() => None,
            CellValue::Number(n) => Some(format_number(*n)),
            CellValue::Bool(true) => Some("True".to_string()),
            CellValue::Bool(false) => Some("False".to_string()),
        }
    }

    /// Whether the value counts as missing data.
    pub fn is_blank(&self) -> bool {
        self.to_text().map_or(true, |s| s.trim().is_empty())
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

/// Integral values print without a fractional part.
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// One selected data row: column name to value, in column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataRow {
    cells: Vec<(String, CellValue)>,
}

impl DataRow {
    /// Build a row from `(column, value)` pairs.
    pub fn new<K, V>(cells: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<CellValue>,
    {
        Self {
            cells: cells
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Value of a column, `None` when the row has no such column.
    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Column names in order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(name, _)| name.as_str())
    }
}

/// A loaded worksheet: header names plus data rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl DataTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Number of data rows (the header is not counted).
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Select a row by index. Short rows are padded with blanks.
    pub fn row(&self, index: i64) -> Result<DataRow> {
        let out_of_range = Error::RowOutOfRange {
            index,
            rows: self.rows.len(),
        };
        let Ok(idx) = usize::try_from(index) else {
            return Err(out_of_range);
        };
        let values = self.rows.get(idx).ok_or(out_of_range)?;

        Ok(DataRow {
            cells: self
                .columns
                .iter()
                .enumerate()
                .map(|(i, name)| {
                    let value = values.get(i).cloned().unwrap_or(CellValue::Blank);
                    (name.clone(), value)
                })
                .collect(),
        })
    }
}
