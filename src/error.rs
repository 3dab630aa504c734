//! Error types for bindery operations.

use thiserror::Error;

/// Errors that can occur while normalizing, packaging, or serializing a book.
///
/// Every error is local to a single export call; nothing is persisted, so
/// retrying with corrected input is always safe.
#[derive(Error, Debug)]
pub enum Error {
    /// The input has nothing to package (no title and no chapters), or could
    /// not be parsed at all.
    #[error("Invalid book: {0}")]
    Validation(String),

    /// The normalized input cannot become an EPUB (no chapters, or a cover
    /// image that is not a recognized raster type).
    #[error("Packaging failed: {0}")]
    Packaging(String),

    /// The requested output format has no implementation.
    #[error("Unsupported format {format}: {message}")]
    UnsupportedFormat { format: String, message: String },

    /// Writing the zip stream failed.
    #[error("Serialization failed: {0}")]
    Serialization(String),
}

impl Error {
    /// Stable tag for the error kind, used in HTTP error bodies and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation_error",
            Error::Packaging(_) => "packaging_error",
            Error::UnsupportedFormat { .. } => "unsupported_format",
            Error::Serialization(_) => "serialization_error",
        }
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(e: zip::result::ZipError) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Validation(format!("malformed book record: {e}"))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tags() {
        assert_eq!(Error::Validation("x".into()).kind(), "validation_error");
        assert_eq!(Error::Packaging("x".into()).kind(), "packaging_error");
        assert_eq!(Error::Serialization("x".into()).kind(), "serialization_error");
        let unsupported = Error::UnsupportedFormat {
            format: "azw3".into(),
            message: "nope".into(),
        };
        assert_eq!(unsupported.kind(), "unsupported_format");
        assert_eq!(unsupported.to_string(), "Unsupported format azw3: nope");
    }

    #[test]
    fn test_json_errors_are_validation() {
        let err: Error = serde_json::from_str::<serde_json::Value>("{").unwrap_err().into();
        assert!(matches!(err, Error::Validation(_)));
    }
}
