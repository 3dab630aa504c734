//! Canonical packaging input.
//!
//! A [`PackageInput`] is a transient snapshot of the book being exported. It
//! is built fresh for every export (usually by [`crate::normalize`]) and is
//! never stored.

/// Title used when the source record has none.
pub const DEFAULT_TITLE: &str = "Untitled Book";
/// Creator used when the source record has no author.
pub const DEFAULT_CREATOR: &str = "Unknown";
/// Language used when neither the record nor the settings name one.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Everything the archive builder needs to produce one EPUB.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageInput {
    pub title: String,
    pub creator: String,
    pub language: String,
    /// Primary unique identifier. A blank value makes the builder generate one.
    pub identifier: String,
    /// Secondary ISBN identifier, empty when absent.
    pub isbn: String,
    pub description: String,
    pub publisher: String,
    pub subject: String,
    pub date: String,
    pub rights: String,
    /// `dcterms:modified` timestamp (`YYYY-MM-DDTHH:MM:SSZ`).
    pub modified: String,
    pub cover_image: Option<CoverImage>,
    pub chapters: Vec<PackageChapter>,
}

/// One chapter of the book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageChapter {
    pub title: String,
    /// HTML fragment or plain text.
    pub body: String,
    /// Sort key; values need not be contiguous.
    pub order: i64,
}

/// Raw cover image bytes plus their declared mime type.
#[derive(Clone, PartialEq, Eq)]
pub struct CoverImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl std::fmt::Debug for CoverImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoverImage")
            .field("bytes", &format_args!("[{} bytes]", self.bytes.len()))
            .field("mime_type", &self.mime_type)
            .finish()
    }
}

/// Raster image types accepted as a cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageType {
    Jpeg,
    Png,
    Gif,
    Webp,
}

impl ImageType {
    /// Map a mime type (case-insensitive, parameters ignored) to an image type.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        match essence.as_str() {
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(ImageType::Jpeg),
            "image/png" => Some(ImageType::Png),
            "image/gif" => Some(ImageType::Gif),
            "image/webp" => Some(ImageType::Webp),
            _ => None,
        }
    }

    /// Detect an image type from its leading magic bytes.
    pub fn sniff(data: &[u8]) -> Option<Self> {
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(ImageType::Jpeg);
        }
        if data.starts_with(&[0x89, b'P', b'N', b'G']) {
            return Some(ImageType::Png);
        }
        if data.starts_with(b"GIF8") {
            return Some(ImageType::Gif);
        }
        if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
            return Some(ImageType::Webp);
        }
        None
    }

    /// Canonical mime type written into the manifest.
    pub fn mime_type(self) -> &'static str {
        match self {
            ImageType::Jpeg => "image/jpeg",
            ImageType::Png => "image/png",
            ImageType::Gif => "image/gif",
            ImageType::Webp => "image/webp",
        }
    }

    /// File extension used for `images/cover.<ext>`.
    pub fn extension(self) -> &'static str {
        match self {
            ImageType::Jpeg => "jpg",
            ImageType::Png => "png",
            ImageType::Gif => "gif",
            ImageType::Webp => "webp",
        }
    }
}

impl PackageInput {
    /// Create an input with the given title and every other field defaulted.
    ///
    /// The identifier and modification timestamp are left blank; the builder
    /// fills a blank identifier itself.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            creator: DEFAULT_CREATOR.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            identifier: String::new(),
            isbn: String::new(),
            description: String::new(),
            publisher: String::new(),
            subject: String::new(),
            date: String::new(),
            rights: String::new(),
            modified: String::new(),
            cover_image: None,
            chapters: Vec::new(),
        }
    }

    pub fn with_creator(mut self, creator: impl Into<String>) -> Self {
        self.creator = creator.into();
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = identifier.into();
        self
    }

    pub fn with_cover(mut self, bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        self.cover_image = Some(CoverImage {
            bytes,
            mime_type: mime_type.into(),
        });
        self
    }

    /// Append a chapter whose order is its insertion position.
    pub fn with_chapter(mut self, title: impl Into<String>, body: impl Into<String>) -> Self {
        let order = self.chapters.len() as i64;
        self.chapters.push(PackageChapter::new(title, body, order));
        self
    }

    /// Chapters in reading order: ascending `order`, ties in insertion order.
    pub fn sorted_chapters(&self) -> Vec<&PackageChapter> {
        let mut chapters: Vec<&PackageChapter> = self.chapters.iter().collect();
        // sort_by_key is stable
        chapters.sort_by_key(|c| c.order);
        chapters
    }
}

impl Default for PackageInput {
    fn default() -> Self {
        Self::new(DEFAULT_TITLE)
    }
}

impl PackageChapter {
    pub fn new(title: impl Into<String>, body: impl Into<String>, order: i64) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            order,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_type_from_mime() {
        assert_eq!(ImageType::from_mime("image/jpeg"), Some(ImageType::Jpeg));
        assert_eq!(ImageType::from_mime("IMAGE/JPG"), Some(ImageType::Jpeg));
        assert_eq!(ImageType::from_mime("image/png; charset=binary"), Some(ImageType::Png));
        assert_eq!(ImageType::from_mime("image/svg+xml"), None);
        assert_eq!(ImageType::from_mime("application/pdf"), None);
        assert_eq!(ImageType::Jpeg.extension(), "jpg");
        assert_eq!(ImageType::Webp.mime_type(), "image/webp");
    }

    #[test]
    fn test_image_type_sniff() {
        assert_eq!(ImageType::sniff(&[0xFF, 0xD8, 0xFF, 0xE0]), Some(ImageType::Jpeg));
        assert_eq!(ImageType::sniff(b"\x89PNG\r\n\x1a\n"), Some(ImageType::Png));
        assert_eq!(ImageType::sniff(b"GIF89a"), Some(ImageType::Gif));
        assert_eq!(ImageType::sniff(b"RIFF\0\0\0\0WEBPVP8 "), Some(ImageType::Webp));
        assert_eq!(ImageType::sniff(b"hello"), None);
    }

    #[test]
    fn test_sorted_chapters_is_stable() {
        let mut input = PackageInput::new("Book");
        input.chapters = vec![
            PackageChapter::new("second-tie", "", 1),
            PackageChapter::new("first", "", 0),
            PackageChapter::new("third-tie", "", 1),
        ];
        let titles: Vec<_> = input.sorted_chapters().iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, ["first", "second-tie", "third-tie"]);
    }

    #[test]
    fn test_cover_debug_hides_bytes() {
        let input = PackageInput::new("Book").with_cover(vec![0; 2048], "image/png");
        let debug = format!("{:?}", input.cover_image);
        assert!(debug.contains("[2048 bytes]"));
    }
}
