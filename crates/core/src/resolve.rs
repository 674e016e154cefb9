//! Mapping and replacement tables: which column fills which placeholder,
//! and the literal text each placeholder becomes for one data row.

use crate::config::MappingEntry;
use crate::data::DataRow;
use crate::normalize::normalize_value;

/// Placeholder to column name, unique keys, in application order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappingTable {
    entries: Vec<(String, String)>,
}

impl MappingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `placeholder` to `column`. An existing key keeps its position
    /// and takes the new column.
    pub fn insert(&mut self, placeholder: impl Into<String>, column: impl Into<String>) {
        let placeholder = placeholder.into();
        let column = column.into();
        match self.entries.iter_mut().find(|(p, _)| *p == placeholder) {
            Some(entry) => entry.1 = column,
            None => self.entries.push((placeholder, column)),
        }
    }

    pub fn contains(&self, placeholder: &str) -> bool {
        self.entries.iter().any(|(p, _)| p == placeholder)
    }

    pub fn column(&self, placeholder: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(p, _)| p == placeholder)
            .map(|(_, c)| c.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(p, c)| (p.as_str(), c.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Merge configured entries with one `[column]` entry per data column the
/// configuration does not already cover. Configured entries win.
pub fn build_mapping_table<'a>(
    configured: &[MappingEntry],
    columns: impl IntoIterator<Item = &'a str>,
) -> MappingTable {
    let mut table = MappingTable::new();
    for entry in configured.iter().filter(|e| e.is_complete()) {
        table.insert(entry.ppt_placeholder.as_str(), entry.excel_column.as_str());
    }
    for column in columns {
        let placeholder = format!("[{}]", column);
        if !table.contains(&placeholder) {
            table.insert(placeholder, column);
        }
    }
    table
}

/// What kind of text a replacement holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplacementKind {
    /// A normalized data value.
    Value,
    /// A synthesized missing-field warning.
    Missing,
}

/// The resolved text for one placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    pub placeholder: String,
    pub text: String,
    pub kind: ReplacementKind,
}

impl Replacement {
    pub fn is_missing(&self) -> bool {
        self.kind == ReplacementKind::Missing
    }
}

/// Placeholder to literal text for one row, in mapping order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplacementTable {
    entries: Vec<Replacement>,
}

impl ReplacementTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or overwrite a data value.
    pub fn insert_value(&mut self, placeholder: impl Into<String>, text: impl Into<String>) {
        self.insert(placeholder.into(), text.into(), ReplacementKind::Value);
    }

    /// Add or overwrite the missing-field warning for `placeholder`.
    pub fn insert_missing(&mut self, placeholder: impl Into<String>) {
        let placeholder = placeholder.into();
        let text = missing_field_text(&placeholder);
        self.insert(placeholder, text, ReplacementKind::Missing);
    }

    fn insert(&mut self, placeholder: String, text: String, kind: ReplacementKind) {
        let replacement = Replacement {
            placeholder,
            text,
            kind,
        };
        match self
            .entries
            .iter_mut()
            .find(|r| r.placeholder == replacement.placeholder)
        {
            Some(existing) => *existing = replacement,
            None => self.entries.push(replacement),
        }
    }

    pub fn get(&self, placeholder: &str) -> Option<&Replacement> {
        self.entries.iter().find(|r| r.placeholder == placeholder)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Replacement> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a ReplacementTable {
    type Item = &'a Replacement;
    type IntoIter = std::slice::Iter<'a, Replacement>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// The warning substituted for a placeholder with no usable data.
pub fn missing_field_text(placeholder: &str) -> String {
    let field = placeholder.trim_matches(&['[', ']'][..]);
    format!("No {} field in excel", field)
}

/// Resolve every placeholder of `mapping` against `row`.
///
/// Never fails: absent columns and blank values become warnings.
pub fn build_replacements(row: &DataRow, mapping: &MappingTable) -> ReplacementTable {
    let mut replacements = ReplacementTable::new();
    for (placeholder, column) in mapping.iter() {
        let value = row
            .get(column)
            .and_then(|cell| cell.to_text())
            .map(|text| normalize_value(&text))
            .filter(|text| !text.is_empty());

        match value {
            Some(text) => replacements.insert_value(placeholder, text),
            None => {
                log::debug!("No data for {} (column '{}')", placeholder, column);
                replacements.insert_missing(placeholder);
            }
        }
    }
    replacements
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::CellValue;

    #[test]
    fn test_configured_entries_take_precedence() {
        let configured = vec![
            MappingEntry::new("[Name]", "candidate_name"),
            MappingEntry::new("[role]", "job_title"),
            MappingEntry::new("", "ignored"),
        ];
        let table = build_mapping_table(&configured, ["candidate_name", "role", "city"]);

        let entries: Vec<_> = table.iter().collect();
        assert_eq!(
            entries,
            vec![
                ("[Name]", "candidate_name"),
                ("[role]", "job_title"),
                ("[candidate_name]", "candidate_name"),
                ("[city]", "city"),
            ]
        );
        assert_eq!(table.column("[role]"), Some("job_title"));
        assert_eq!(table.column("[job_title]"), None);
    }

    #[test]
    fn test_duplicate_configured_key_keeps_first_position() {
        let configured = vec![
            MappingEntry::new("[a]", "one"),
            MappingEntry::new("[b]", "two"),
            MappingEntry::new("[a]", "three"),
        ];
        let table = build_mapping_table(&configured, std::iter::empty());
        assert_eq!(table.iter().collect::<Vec<_>>(), vec![("[a]", "three"), ("[b]", "two")]);
    }

    #[test]
    fn test_values_are_normalized() {
        let row = DataRow::new([("blurb", "  Builds \n\n  things  ")]);
        let mut mapping = MappingTable::new();
        mapping.insert("[positioning_blurb]", "blurb");

        let replacements = build_replacements(&row, &mapping);
        let r = replacements.get("[positioning_blurb]").unwrap();
        assert_eq!(r.text, "Builds things");
        assert_eq!(r.kind, ReplacementKind::Value);
    }

    #[test]
    fn test_missing_and_blank_values_become_warnings() {
        let row = DataRow::new([
            ("empty", CellValue::from("   ")),
            ("blank", CellValue::Blank),
            ("nan", CellValue::Number(f64::NAN)),
        ]);
        let mut mapping = MappingTable::new();
        mapping.insert("[empty]", "empty");
        mapping.insert("[blank]", "blank");
        mapping.insert("[nan]", "nan");
        mapping.insert("[quality_1_title]", "not_a_column");

        let replacements = build_replacements(&row, &mapping);
        assert_eq!(replacements.len(), mapping.len());
        assert!(replacements.iter().all(Replacement::is_missing));
        assert_eq!(
            replacements.get("[quality_1_title]").unwrap().text,
            "No quality_1_title field in excel"
        );
        assert_eq!(replacements.get("[empty]").unwrap().text, "No empty field in excel");
    }

    #[test]
    fn test_numbers_are_rendered() {
        let row = DataRow::new([("years", CellValue::Number(12.0))]);
        let mut mapping = MappingTable::new();
        mapping.insert("[years]", "years");

        let replacements = build_replacements(&row, &mapping);
        assert_eq!(replacements.get("[years]").unwrap().text, "12");
    }

    #[test]
    fn test_missing_field_text_strips_delimiters() {
        assert_eq!(missing_field_text("[project_1_name]"), "No project_1_name field in excel");
        assert_eq!(missing_field_text("plain"), "No plain field in excel");
    }
}
