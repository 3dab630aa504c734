//! # bindery
//!
//! EPUB packaging core for a browser-based ebook authoring tool.
//!
//! ## Features
//!
//! - Accept the loosely-typed book records the authoring UI produces
//! - Build EPUB 3 packages with EPUB 2 NCX and guide fallbacks
//! - Mimetype-first, stored-mimetype zip serialization
//! - Sanitized download names for HTTP and local delivery
//!
//! ## Quick Start
//!
//! ```
//! use bindery::{ExportFormat, Packager};
//!
//! let json = r#"{
//!     "metadata": { "title": "My Book", "author": "Me" },
//!     "chapters": [
//!         { "title": "Two", "content": "<p>Later</p>", "order": 2 },
//!         { "title": "One", "content": "First line\nSecond line", "order": 1 }
//!     ]
//! }"#;
//!
//! let download = Packager::new().export_json(json, ExportFormat::Epub)?;
//! assert_eq!(download.filename, "my_book.epub");
//! # Ok::<(), bindery::Error>(())
//! ```
//!
//! ## Building a package directly
//!
//! ```
//! use bindery::PackageInput;
//! use bindery::export::EpubExporter;
//!
//! let input = PackageInput::new("Notes")
//!     .with_creator("Author Name")
//!     .with_language("en")
//!     .with_chapter("Chapter 1", "<p>Hello</p>");
//!
//! let archive = EpubExporter::new().build(&input)?;
//! assert!(archive.get("OEBPS/chapter1.xhtml").is_some());
//! # Ok::<(), bindery::Error>(())
//! ```

pub mod book;
pub mod delivery;
pub mod error;
pub mod export;
pub mod normalize;
pub mod packager;
pub mod provider;
pub mod settings;
pub(crate) mod util;

#[cfg(feature = "server")]
pub mod server;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use book::{CoverImage, ImageType, PackageChapter, PackageInput};
pub use delivery::{Download, sanitize_filename};
pub use error::{Error, Result};
pub use export::{EpubConfig, EpubExporter, ExportFormat, Exporter, Package, export_book};
pub use normalize::{BookRecord, CoverSource, Normalizer};
pub use packager::Packager;
pub use settings::{DefaultMetadata, ExportSettings, UserSettings};
