//! Export module for writing books to output formats.
//!
//! Provides the `Exporter` trait, the EPUB implementation, and format
//! dispatch for requests that name a format by string.
//!
//! # Example
//!
//! ```no_run
//! use bindery::PackageInput;
//! use bindery::export::{EpubExporter, Exporter};
//! use std::fs::File;
//!
//! let input = PackageInput::new("Notes").with_chapter("One", "Hello");
//! let mut file = File::create("notes.epub")?;
//! EpubExporter::new().export(&input, &mut file)?;
//! # Ok::<(), bindery::Error>(())
//! ```

use std::fmt;
use std::io::{Seek, Write};
use std::str::FromStr;

use serde::Deserialize;
use tracing::info;

use crate::book::PackageInput;
use crate::error::{Error, Result};

pub mod archive;
mod epub;

pub use archive::{Archive, ArchiveEntry, Compression, EPUB_MIME, Package, serialize, write_archive};
pub use epub::{EpubConfig, EpubExporter};

/// Trait for exporting books to specific formats.
///
/// Exporters hold their configuration and write to any `Write + Seek`
/// destination: a `File`, or a `Cursor<Vec<u8>>` for in-memory output.
pub trait Exporter {
    fn export<W: Write + Seek>(&self, input: &PackageInput, writer: &mut W) -> Result<()>;
}

/// Output formats a caller can ask for.
///
/// Deserializes through [`FromStr`], so settings documents accept the same
/// names and aliases as the CLI and HTTP routes, in any case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum ExportFormat {
    #[default]
    Epub,
    Azw3,
    Pdf,
    Markdown,
}

impl ExportFormat {
    pub fn name(self) -> &'static str {
        match self {
            ExportFormat::Epub => "epub",
            ExportFormat::Azw3 => "azw3",
            ExportFormat::Pdf => "pdf",
            ExportFormat::Markdown => "markdown",
        }
    }

    /// Whether this crate produces the format itself.
    pub fn is_supported(self) -> bool {
        matches!(self, ExportFormat::Epub)
    }

    /// The error reported for a format this crate does not produce.
    pub fn unsupported_error(self) -> Option<Error> {
        let message = match self {
            ExportFormat::Epub => return None,
            ExportFormat::Azw3 => {
                "AZW3 (Kindle) export requires external conversion tooling such as \
                 Calibre's ebook-convert and is not produced here; please export EPUB instead"
            }
            ExportFormat::Pdf => "PDF export is handled by the print view, not the EPUB packager",
            ExportFormat::Markdown => {
                "Markdown export is handled by the text exporter, not the EPUB packager"
            }
        };
        Some(Error::UnsupportedFormat {
            format: self.name().to_string(),
            message: message.to_string(),
        })
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "epub" => Ok(ExportFormat::Epub),
            "azw3" | "kindle" => Ok(ExportFormat::Azw3),
            "pdf" => Ok(ExportFormat::Pdf),
            "markdown" | "md" => Ok(ExportFormat::Markdown),
            other => Err(Error::UnsupportedFormat {
                format: other.to_string(),
                message: "unknown export format".to_string(),
            }),
        }
    }
}

impl TryFrom<String> for ExportFormat {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

/// Package `input` in the requested format.
///
/// Unsupported formats fail before any packaging work is done.
pub fn export_book(input: &PackageInput, format: ExportFormat, config: EpubConfig) -> Result<Package> {
    if let Some(err) = format.unsupported_error() {
        return Err(err);
    }
    let package = EpubExporter::new().with_config(config).package(input)?;
    info!(
        title = %input.title,
        format = %format,
        bytes = package.len(),
        "exported book"
    );
    Ok(package)
}
