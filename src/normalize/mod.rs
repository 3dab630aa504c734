//! Input normalization.
//!
//! The authoring app hands over books in several loosely-typed shapes: the
//! store's `{ metadata: { author, isbn, .. }, chapters }`, the metadata
//! dialog's `{ metadata: { creator, identifier, .. } }`, and the flat form
//! `{ title, author, genre, coverImage, chapters }`. [`BookRecord`] accepts
//! all of them and [`Normalizer`] turns one into a [`PackageInput`], filling
//! every gap with a default instead of rejecting the record.

mod data_url;

use std::sync::Arc;

use serde::{Deserialize, Deserializer};
use tracing::{debug, warn};

use crate::book::{
    DEFAULT_CREATOR, DEFAULT_LANGUAGE, DEFAULT_TITLE, PackageChapter, PackageInput,
};
use crate::error::{Error, Result};
use crate::provider::{Clock, IdentifierSource, SystemClock, UuidSource, modified_stamp};
use crate::settings::DefaultMetadata;

pub use data_url::{CoverSource, DataUrlError, parse_data_url};

/// A book record as received from the UI or an HTTP request body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BookRecord {
    /// Nested metadata block; its fields win over flat ones.
    pub metadata: Option<RecordMetadata>,
    /// Flat metadata fields (form shape).
    #[serde(flatten)]
    pub inline: RecordMetadata,
    pub chapters: Option<Vec<RecordChapter>>,
    /// Legacy single-document body used when there are no chapters.
    pub content: Option<String>,
    /// Cover supplied out of band (a picked file), preferred over `coverImage`.
    #[serde(skip)]
    pub cover_file: Option<CoverSource>,
}

/// Metadata fields under every name the app has used for them.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecordMetadata {
    pub title: Option<String>,
    pub creator: Option<String>,
    pub author: Option<String>,
    pub language: Option<String>,
    pub identifier: Option<String>,
    pub isbn: Option<String>,
    pub description: Option<String>,
    pub publisher: Option<String>,
    pub subject: Option<String>,
    pub genre: Option<String>,
    pub date: Option<String>,
    pub rights: Option<String>,
    #[serde(alias = "cover")]
    pub cover_image: Option<String>,
}

/// One chapter as stored by the app.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecordChapter {
    pub title: Option<String>,
    #[serde(alias = "data", alias = "body", alias = "bodyHtml")]
    pub content: Option<String>,
    #[serde(deserialize_with = "lenient_order")]
    pub order: Option<i64>,
}

impl BookRecord {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Attach a cover file read by the caller.
    pub fn with_cover_file(mut self, bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        self.cover_file = Some(CoverSource::Bytes {
            bytes,
            mime_type: mime_type.into(),
        });
        self
    }
}

impl RecordMetadata {
    /// Field-by-field merge: present, non-blank values in `self` win.
    fn merged(self, fallback: RecordMetadata) -> RecordMetadata {
        RecordMetadata {
            title: present(self.title).or(fallback.title),
            creator: present(self.creator).or(fallback.creator),
            author: present(self.author).or(fallback.author),
            language: present(self.language).or(fallback.language),
            identifier: present(self.identifier).or(fallback.identifier),
            isbn: present(self.isbn).or(fallback.isbn),
            description: present(self.description).or(fallback.description),
            publisher: present(self.publisher).or(fallback.publisher),
            subject: present(self.subject).or(fallback.subject),
            genre: present(self.genre).or(fallback.genre),
            date: present(self.date).or(fallback.date),
            rights: present(self.rights).or(fallback.rights),
            cover_image: present(self.cover_image).or(fallback.cover_image),
        }
    }
}

/// Turns [`BookRecord`]s into [`PackageInput`]s.
#[derive(Clone)]
pub struct Normalizer {
    defaults: DefaultMetadata,
    clock: Arc<dyn Clock>,
    identifiers: Arc<dyn IdentifierSource>,
}

impl Normalizer {
    pub fn new() -> Self {
        Self {
            defaults: DefaultMetadata::default(),
            clock: Arc::new(SystemClock),
            identifiers: Arc::new(UuidSource),
        }
    }

    /// Metadata applied before the built-in defaults.
    pub fn with_defaults(mut self, defaults: DefaultMetadata) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn with_identifiers(mut self, identifiers: impl IdentifierSource + 'static) -> Self {
        self.identifiers = Arc::new(identifiers);
        self
    }

    pub fn normalize_json(&self, json: &str) -> Result<PackageInput> {
        self.normalize(BookRecord::from_json(json)?)
    }

    pub fn normalize(&self, record: BookRecord) -> Result<PackageInput> {
        let BookRecord {
            metadata,
            inline,
            chapters,
            content,
            cover_file,
        } = record;
        let meta = match metadata {
            Some(nested) => nested.merged(inline),
            None => inline,
        };

        let title = present(meta.title);
        let chapters = chapters.unwrap_or_default();
        let content = present(content);
        if title.is_none() && chapters.is_empty() && content.is_none() {
            return Err(Error::Validation(
                "book has neither a title nor any chapters".into(),
            ));
        }
        let title = title.unwrap_or_else(|| DEFAULT_TITLE.to_string());

        let mut package_chapters = normalize_chapters(chapters);
        if package_chapters.is_empty()
            && let Some(body) = content
        {
            package_chapters.push(PackageChapter::new(title.clone(), body, 0));
        }

        let identifier = present(meta.identifier)
            .unwrap_or_else(|| self.identifiers.new_identifier());
        let isbn = present(meta.isbn)
            .filter(|isbn| *isbn != identifier)
            .unwrap_or_default();

        let cover_source = cover_file.or_else(|| present(meta.cover_image).map(CoverSource::DataUrl));
        let cover_image = cover_source.and_then(|source| match source.into_image() {
            Ok(image) => Some(image),
            Err(e) => {
                warn!(error = %e, "dropping unreadable cover image");
                None
            }
        });

        let input = PackageInput {
            creator: present(meta.creator)
                .or(present(meta.author))
                .or(present(Some(self.defaults.author.clone())))
                .unwrap_or_else(|| DEFAULT_CREATOR.to_string()),
            language: present(meta.language)
                .or(present(Some(self.defaults.language.clone())))
                .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            identifier,
            isbn,
            description: meta.description.unwrap_or_default(),
            publisher: present(meta.publisher)
                .or(present(Some(self.defaults.publisher.clone())))
                .unwrap_or_default(),
            subject: present(meta.subject).or(meta.genre).unwrap_or_default(),
            date: meta.date.unwrap_or_default(),
            rights: present(meta.rights)
                .or(present(Some(self.defaults.rights.clone())))
                .unwrap_or_default(),
            modified: modified_stamp(self.clock.now()),
            cover_image,
            chapters: package_chapters,
            title,
        };

        debug!(
            title = %input.title,
            chapters = input.chapters.len(),
            cover = input.cover_image.is_some(),
            "normalized book record"
        );
        Ok(input)
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve chapter order and default titles.
///
/// A chapter without an `order` sorts at its position in the source array.
/// Titles left blank become `Chapter N` by reading position.
fn normalize_chapters(chapters: Vec<RecordChapter>) -> Vec<PackageChapter> {
    let mut resolved: Vec<PackageChapter> = chapters
        .into_iter()
        .enumerate()
        .map(|(i, c)| PackageChapter {
            title: c.title.unwrap_or_default(),
            body: c.content.unwrap_or_default(),
            order: c.order.unwrap_or(i as i64),
        })
        .collect();
    resolved.sort_by_key(|c| c.order);

    for (i, chapter) in resolved.iter_mut().enumerate() {
        if chapter.title.trim().is_empty() {
            chapter.title = format!("Chapter {}", i + 1);
        }
    }
    resolved
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Accept `3`, `3.0` and `"3"` as an order; anything else counts as absent.
fn lenient_order<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.floor() as i64)),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}
