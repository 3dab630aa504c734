//! User export settings.
//!
//! Mirrors the settings document the authoring app stores: the export block
//! plus default metadata applied to books that leave fields blank.

use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::export::ExportFormat;

/// Export preferences.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportSettings {
    pub format: ExportFormat,
    pub include_cover: bool,
    /// Accepted for compatibility; EPUB output always carries nav, spine and guide.
    pub include_table_of_contents: bool,
    pub default_language: String,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            format: ExportFormat::Epub,
            include_cover: true,
            include_table_of_contents: true,
            default_language: String::new(),
        }
    }
}

/// Metadata used when a book leaves a field blank.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DefaultMetadata {
    pub author: String,
    pub language: String,
    pub publisher: String,
    pub rights: String,
}

/// The stored settings document. Unknown keys (theme, autosave, ...) are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserSettings {
    pub export: ExportSettings,
    pub default_metadata: DefaultMetadata,
}

impl UserSettings {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::Validation(format!("malformed settings: {e}")))
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            Error::Validation(format!("cannot read settings {}: {e}", path.display()))
        })?;
        Self::from_json(&json)
    }

    /// Defaults handed to the normalizer. `export.defaultLanguage` fills in
    /// when the default metadata has no language of its own.
    pub fn metadata_defaults(&self) -> DefaultMetadata {
        let mut defaults = self.default_metadata.clone();
        if defaults.language.trim().is_empty() {
            defaults.language = self.export.default_language.clone();
        }
        defaults
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_settings_document() {
        let settings = UserSettings::from_json(
            r#"{
                "export": {
                    "format": "epub",
                    "includeCover": false,
                    "includeTableOfContents": true,
                    "defaultLanguage": "fr",
                    "pageSize": "A4"
                },
                "defaultMetadata": { "author": "Anon", "language": "", "rights": "CC-BY" },
                "theme": "dark",
                "autosaveInterval": 5
            }"#,
        )
        .unwrap();

        assert_eq!(settings.export.format, ExportFormat::Epub);
        assert!(!settings.export.include_cover);
        assert_eq!(settings.default_metadata.author, "Anon");

        let defaults = settings.metadata_defaults();
        assert_eq!(defaults.language, "fr");
        assert_eq!(defaults.rights, "CC-BY");
    }

    #[test]
    fn test_missing_blocks_default() {
        let settings = UserSettings::from_json("{}").unwrap();
        assert_eq!(settings, UserSettings::default());
        assert!(settings.export.include_cover);
    }

    #[test]
    fn test_format_name_is_case_insensitive() {
        let settings = UserSettings::from_json(r#"{"export": {"format": "EPUB"}}"#).unwrap();
        assert_eq!(settings.export.format, ExportFormat::Epub);

        let settings = UserSettings::from_json(r#"{"export": {"format": "Kindle"}}"#).unwrap();
        assert_eq!(settings.export.format, ExportFormat::Azw3);

        assert!(matches!(
            UserSettings::from_json(r#"{"export": {"format": "docx"}}"#),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_malformed_settings() {
        assert!(matches!(
            UserSettings::from_json("[1, 2"),
            Err(Error::Validation(_))
        ));
    }
}
