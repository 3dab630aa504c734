//! Handing a finished package to the user.
//!
//! Both delivery paths (an HTTP attachment and a local file save) name the
//! file with [`sanitize_filename`] so the name is safe in a
//! `Content-Disposition` header and on every filesystem.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::Result;
use crate::export::Package;

/// Extension of every delivered file.
pub const EPUB_EXTENSION: &str = "epub";

/// Reduce a title to `[a-z0-9_]`: each run of other characters becomes one
/// `_`, separators at the ends are dropped, and an empty result becomes `book`.
pub fn sanitize_filename(title: &str) -> String {
    let mut name = String::with_capacity(title.len());
    let mut pending_separator = false;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_separator && !name.is_empty() {
                name.push('_');
            }
            pending_separator = false;
            name.push(c.to_ascii_lowercase());
        } else {
            pending_separator = true;
        }
    }
    if name.is_empty() {
        name.push_str("book");
    }
    name
}

/// A package ready to hand over, with its suggested filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

impl Download {
    pub fn new(title: &str, package: Package) -> Self {
        Self {
            filename: format!("{}.{}", sanitize_filename(title), EPUB_EXTENSION),
            content_type: package.content_type,
            bytes: package.bytes,
        }
    }

    /// `attachment; filename="<name>.epub"`
    pub fn content_disposition(&self) -> String {
        format!("attachment; filename=\"{}\"", self.filename)
    }

    /// Response headers for an HTTP delivery.
    pub fn headers(&self) -> [(&'static str, String); 3] {
        [
            ("content-type", self.content_type.to_string()),
            ("content-disposition", self.content_disposition()),
            ("content-length", self.bytes.len().to_string()),
        ]
    }

    /// Save into `dir` under the suggested filename.
    pub fn save_to<P: AsRef<Path>>(&self, dir: P) -> Result<PathBuf> {
        let path = dir.as_ref().join(&self.filename);
        self.save_as(&path)?;
        Ok(path)
    }

    /// Save to an explicit path.
    pub fn save_as<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, &self.bytes)?;
        info!(path = %path.display(), bytes = self.bytes.len(), "saved package");
        Ok(())
    }
}
