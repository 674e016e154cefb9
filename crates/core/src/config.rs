//! Fill options and the persisted placeholder mapping configuration.

use crate::error::{Error, Result};
use crate::types::{FontSize, Rgb};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Colors used to flag substituted text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    /// Color for person names.
    pub name_color: Rgb,
    /// Color for missing-field warnings.
    pub warning_color: Rgb,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            name_color: Rgb::new(0, 102, 204),
            warning_color: Rgb::new(220, 53, 69),
        }
    }
}

/// Options for one fill pass over a document.
#[derive(Debug, Clone)]
pub struct FillOptions {
    pub palette: Palette,

    /// Tokens whose values are person names and get `palette.name_color`.
    pub name_placeholders: Vec<String>,

    /// Largest explicit font size allowed in text boxes on the first slide.
    pub title_max_font_size: Option<FontSize>,
}

impl Default for FillOptions {
    fn default() -> Self {
        Self {
            palette: Palette::default(),
            name_placeholders: vec!["[candidate_name]".to_string(), "[Name]".to_string()],
            title_max_font_size: Some(FontSize::from_points(44.0)),
        }
    }
}

impl FillOptions {
    /// Create options with the default palette, name tokens and title clamp.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_palette(mut self, palette: Palette) -> Self {
        self.palette = palette;
        self
    }

    pub fn with_name_placeholders<I, S>(mut self, placeholders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.name_placeholders = placeholders.into_iter().map(Into::into).collect();
        self
    }

    /// Set or disable (`None`) the first-slide font clamp.
    pub fn with_title_max_font_size(mut self, size: Option<FontSize>) -> Self {
        self.title_max_font_size = size;
        self
    }

    /// Whether `placeholder` stands for a person's name.
    pub fn is_name_placeholder(&self, placeholder: &str) -> bool {
        self.name_placeholders.iter().any(|p| p == placeholder)
    }
}

/// One configured placeholder to column association.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingEntry {
    #[serde(default)]
    pub ppt_placeholder: String,
    #[serde(default)]
    pub excel_column: String,
}

impl MappingEntry {
    pub fn new(placeholder: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            ppt_placeholder: placeholder.into(),
            excel_column: column.into(),
        }
    }

    /// Entries with an empty side are kept on disk but never applied.
    pub fn is_complete(&self) -> bool {
        !self.ppt_placeholder.is_empty() && !self.excel_column.is_empty()
    }
}

/// Mappings used when no configuration file exists yet.
pub fn default_mappings() -> Vec<MappingEntry> {
    [
        ("[candidate_name]", "candidate_name"),
        ("[Name]", "candidate_name"),
        ("[positioning_blurb]", "positioning_blurb"),
        ("[project_1_name]", "project_1_name"),
        ("[project_1_context]", "project_1_context"),
        ("[project_2_name]", "project_2_name"),
        ("[project_2_context]", "project_2_context"),
    ]
    .into_iter()
    .map(|(placeholder, column)| MappingEntry::new(placeholder, column))
    .collect()
}

#[derive(Serialize)]
struct MappingFile<'a> {
    mappings: &'a [MappingEntry],
}

/// Parse a mapping document of the form `{"mappings": [...]}`.
pub fn parse_mappings(json: &str) -> Result<Vec<MappingEntry>> {
    let value: serde_json::Value = serde_json::from_str(json)
        .map_err(|e| Error::ConfigurationError(format!("Invalid JSON: {}", e)))?;
    let mappings = value
        .get("mappings")
        .ok_or_else(|| Error::ConfigurationError("Missing 'mappings' in request body".to_string()))?;
    if !mappings.is_array() {
        return Err(Error::ConfigurationError(
            "'mappings' must be an array".to_string(),
        ));
    }
    serde_json::from_value(mappings.clone())
        .map_err(|e| Error::ConfigurationError(format!("Invalid mapping entry: {}", e)))
}

/// JSON file store for the mapping configuration.
#[derive(Debug, Clone)]
pub struct MappingStore {
    path: PathBuf,
}

impl MappingStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the configured mappings, writing and returning the defaults
    /// when the file does not exist yet.
    pub fn load(&self) -> Result<Vec<MappingEntry>> {
        if !self.path.exists() {
            log::info!(
                "No mapping config at {}, writing defaults",
                self.path.display()
            );
            let defaults = default_mappings();
            self.save(&defaults)?;
            return Ok(defaults);
        }
        let content = fs::read_to_string(&self.path)?;
        parse_mappings(&content)
    }

    /// Replace the stored mappings.
    pub fn save(&self, mappings: &[MappingEntry]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&MappingFile { mappings })
            .map_err(|e| Error::ConfigurationError(e.to_string()))?;
        fs::write(&self.path, json)?;
        log::debug!("Saved {} mappings to {}", mappings.len(), self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = FillOptions::new();
        assert!(options.is_name_placeholder("[candidate_name]"));
        assert!(options.is_name_placeholder("[Name]"));
        assert!(!options.is_name_placeholder("[project_1_name]"));
        assert_eq!(options.palette.name_color.to_hex(), "0066CC");
        assert_eq!(options.palette.warning_color.to_hex(), "DC3545");
        assert_eq!(options.title_max_font_size, Some(FontSize::from_centipoints(4400)));
    }

    #[test]
    fn test_parse_mappings() {
        let mappings = parse_mappings(
            r#"{"mappings": [{"pptPlaceholder": "[Name]", "excelColumn": "full_name"}, {"pptPlaceholder": "[x]"}]}"#,
        )
        .unwrap();
        assert_eq!(mappings[0], MappingEntry::new("[Name]", "full_name"));
        assert!(!mappings[1].is_complete());
    }

    #[test]
    fn test_parse_mappings_rejects_bad_shape() {
        assert!(matches!(
            parse_mappings(r#"{"mappings": {"a": "b"}}"#),
            Err(Error::ConfigurationError(_))
        ));
        assert!(matches!(
            parse_mappings(r#"{"other": []}"#),
            Err(Error::ConfigurationError(_))
        ));
        assert!(matches!(
            parse_mappings("not json"),
            Err(Error::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_store_writes_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = MappingStore::new(dir.path().join("mapping_config.json"));

        let loaded = store.load().unwrap();
        assert_eq!(loaded, default_mappings());
        assert!(store.path().exists());
    }

    #[test]
    fn test_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = MappingStore::new(dir.path().join("nested").join("mapping.json"));
        let mappings = vec![MappingEntry::new("[Title]", "job_title")];

        store.save(&mappings).unwrap();
        assert_eq!(store.load().unwrap(), mappings);

        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("\"pptPlaceholder\": \"[Title]\""));
    }
}
