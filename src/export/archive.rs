//! In-memory file set and its zip serialization.
//!
//! The builder produces an [`Archive`]: an ordered list of entries, each
//! tagged stored or deflated. [`serialize`] turns it into the final EPUB
//! byte stream.

use std::io::{Cursor, Seek, Write};

use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::error::{Error, Result};

/// Media type of every package this crate produces.
pub const EPUB_MIME: &str = "application/epub+zip";

/// Name of the entry that must open the container.
pub const MIMETYPE_PATH: &str = "mimetype";

const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

/// How an entry is written into the zip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Stored,
    Deflated,
}

/// One file of the package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub path: String,
    pub data: Vec<u8>,
    pub compression: Compression,
}

/// Ordered file manifest of a package.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Archive {
    entries: Vec<ArchiveEntry>,
}

impl Archive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, path: impl Into<String>, data: impl Into<Vec<u8>>, compression: Compression) {
        self.entries.push(ArchiveEntry {
            path: path.into(),
            data: data.into(),
            compression,
        });
    }

    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.path.as_str())
    }

    pub fn get(&self, path: &str) -> Option<&ArchiveEntry> {
        self.entries.iter().find(|e| e.path == path)
    }

    /// Entry content as UTF-8 text, for the generated XML documents.
    pub fn text(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(|e| std::str::from_utf8(&e.data).ok())
    }
}

/// A finished EPUB blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
}

impl Package {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Write an archive as a zip stream to any [`Write`] + [`Seek`] destination.
///
/// The first entry must be a stored `mimetype`; all other entries follow
/// their own compression tag, deflated at `level` (0-9, default 6).
pub fn write_archive<W: Write + Seek>(archive: &Archive, writer: W, level: Option<u32>) -> Result<()> {
    match archive.entries.first() {
        Some(first) if first.path == MIMETYPE_PATH && first.compression == Compression::Stored => {}
        _ => {
            return Err(Error::Serialization(
                "the first entry must be an uncompressed mimetype".into(),
            ));
        }
    }

    let level = level.unwrap_or(DEFAULT_COMPRESSION_LEVEL).min(9);
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let deflated = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(level as i64));

    let mut zip = ZipWriter::new(writer);
    for entry in &archive.entries {
        let options = match entry.compression {
            Compression::Stored => stored,
            Compression::Deflated => deflated,
        };
        zip.start_file(entry.path.as_str(), options)?;
        zip.write_all(&entry.data)?;
    }
    zip.finish()?;
    Ok(())
}

/// Serialize an archive into an in-memory [`Package`].
pub fn serialize(archive: &Archive, level: Option<u32>) -> Result<Package> {
    let mut cursor = Cursor::new(Vec::new());
    write_archive(archive, &mut cursor, level)?;
    Ok(Package {
        bytes: cursor.into_inner(),
        content_type: EPUB_MIME,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn minimal() -> Archive {
        let mut archive = Archive::new();
        archive.push(MIMETYPE_PATH, EPUB_MIME, Compression::Stored);
        archive.push("OEBPS/a.txt", "hello hello hello hello", Compression::Deflated);
        archive
    }

    #[test]
    fn test_serialize_roundtrip() {
        let package = serialize(&minimal(), None).unwrap();
        assert_eq!(package.content_type, EPUB_MIME);
        assert_eq!(package.len(), package.bytes.len());

        let mut zip = zip::ZipArchive::new(Cursor::new(package.bytes)).unwrap();
        assert_eq!(zip.len(), 2);

        let mut first = zip.by_index(0).unwrap();
        assert_eq!(first.name(), MIMETYPE_PATH);
        assert_eq!(first.compression(), CompressionMethod::Stored);
        let mut text = String::new();
        first.read_to_string(&mut text).unwrap();
        assert_eq!(text, EPUB_MIME);
        drop(first);

        let second = zip.by_index(1).unwrap();
        assert_eq!(second.compression(), CompressionMethod::Deflated);
    }

    #[test]
    fn test_mimetype_must_lead() {
        let mut archive = Archive::new();
        archive.push("OEBPS/a.txt", "x", Compression::Deflated);
        archive.push(MIMETYPE_PATH, EPUB_MIME, Compression::Stored);
        assert!(matches!(serialize(&archive, None), Err(Error::Serialization(_))));

        let mut archive = Archive::new();
        archive.push(MIMETYPE_PATH, EPUB_MIME, Compression::Deflated);
        assert!(matches!(serialize(&archive, None), Err(Error::Serialization(_))));

        assert!(matches!(serialize(&Archive::new(), None), Err(Error::Serialization(_))));
    }

    #[test]
    fn test_duplicate_entry_is_serialization_error() {
        let mut archive = minimal();
        archive.push("OEBPS/a.txt", "again", Compression::Deflated);
        assert!(matches!(serialize(&archive, None), Err(Error::Serialization(_))));
    }

    #[test]
    fn test_archive_lookup() {
        let archive = minimal();
        assert_eq!(archive.len(), 2);
        assert_eq!(archive.text("OEBPS/a.txt"), Some("hello hello hello hello"));
        assert!(archive.get("missing").is_none());
        assert_eq!(archive.paths().collect::<Vec<_>>(), [MIMETYPE_PATH, "OEBPS/a.txt"]);
    }
}
