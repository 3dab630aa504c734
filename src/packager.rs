//! End-to-end export: record in, download out.

use tracing::warn;

use crate::delivery::Download;
use crate::error::Result;
use crate::export::{EpubConfig, ExportFormat, export_book};
use crate::normalize::{BookRecord, Normalizer};
use crate::provider::{Clock, IdentifierSource};
use crate::settings::{ExportSettings, UserSettings};

/// Runs normalize, build, serialize and naming for one export call.
///
/// Holds no per-call state, so one value can serve concurrent requests.
#[derive(Clone, Default)]
pub struct Packager {
    normalizer: Normalizer,
    settings: ExportSettings,
    compression_level: Option<u32>,
}

impl Packager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply stored user settings (export options and default metadata).
    pub fn with_settings(mut self, settings: &UserSettings) -> Self {
        self.normalizer = self.normalizer.with_defaults(settings.metadata_defaults());
        self.settings = settings.export.clone();
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.normalizer = self.normalizer.with_clock(clock);
        self
    }

    pub fn with_identifiers(mut self, identifiers: impl IdentifierSource + 'static) -> Self {
        self.normalizer = self.normalizer.with_identifiers(identifiers);
        self
    }

    pub fn with_compression_level(mut self, level: u32) -> Self {
        self.compression_level = Some(level);
        self
    }

    /// Format from the settings, used when a request names none.
    pub fn default_format(&self) -> ExportFormat {
        self.settings.format
    }

    pub fn export_json(&self, json: &str, format: ExportFormat) -> Result<Download> {
        if let Some(err) = format.unsupported_error() {
            return Err(err);
        }
        self.export(BookRecord::from_json(json)?, format)
    }

    pub fn export(&self, record: BookRecord, format: ExportFormat) -> Result<Download> {
        if let Some(err) = format.unsupported_error() {
            warn!(format = %format, "rejected export in unsupported format");
            return Err(err);
        }
        let input = self.normalizer.normalize(record)?;
        let config = EpubConfig {
            compression_level: self.compression_level,
            include_cover: self.settings.include_cover,
        };
        let package = export_book(&input, format, config)?;
        Ok(Download::new(&input.title, package))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::provider::{FixedClock, FixedIdentifier};

    #[test]
    fn test_export_json_names_file_from_title() {
        let download = Packager::new()
            .with_clock(FixedClock::parse("2025-01-01T00:00:00Z").unwrap())
            .with_identifiers(FixedIdentifier("urn:uuid:x".into()))
            .export_json(
                r#"{"metadata": {"title": "Tom & Jerry"}, "chapters": [{"title": "a", "content": "b"}]}"#,
                ExportFormat::Epub,
            )
            .unwrap();
        assert_eq!(download.filename, "tom_jerry.epub");
        assert_eq!(download.content_type, "application/epub+zip");
        assert!(download.bytes.starts_with(b"PK"));
    }

    #[test]
    fn test_unsupported_format_skips_parsing() {
        let err = Packager::new().export_json("not json", ExportFormat::Azw3).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat { .. }));
    }

    #[test]
    fn test_settings_apply() {
        let settings = UserSettings::from_json(
            r#"{"export": {"format": "epub", "includeCover": false},
                "defaultMetadata": {"author": "House"}}"#,
        )
        .unwrap();
        let packager = Packager::new().with_settings(&settings);
        assert_eq!(packager.default_format(), ExportFormat::Epub);

        // The svg cover would fail packaging if it were embedded.
        let download = packager
            .export_json(
                r#"{"title": "T", "coverImage": "data:image/svg+xml,%3Csvg%2F%3E",
                    "chapters": [{"title": "a"}]}"#,
                ExportFormat::Epub,
            )
            .unwrap();
        assert!(!download.bytes.is_empty());
    }
}
