//! `data:` URL decoding for cover images.
//!
//! Covers picked in the browser arrive as `data:image/png;base64,....`
//! strings (FileReader output). Percent-encoded payloads are accepted too.

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use percent_encoding::percent_decode;
use thiserror::Error;

use crate::book::{CoverImage, ImageType};

/// Standard alphabet, padding optional.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Why a cover string could not be decoded.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DataUrlError {
    #[error("not a data URL")]
    NotDataUrl,

    #[error("data URL has no ',' separator")]
    MissingSeparator,

    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// A cover image as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoverSource {
    /// `data:<mime>[;base64],<payload>`
    DataUrl(String),
    /// Raw file bytes with a separately reported mime type. An empty mime
    /// type is sniffed from the bytes.
    Bytes { bytes: Vec<u8>, mime_type: String },
}

impl CoverSource {
    pub fn into_image(self) -> Result<CoverImage, DataUrlError> {
        match self {
            CoverSource::DataUrl(url) => parse_data_url(&url),
            CoverSource::Bytes { bytes, mime_type } => {
                let mime_type = if mime_type.trim().is_empty() {
                    ImageType::sniff(&bytes)
                        .map(ImageType::mime_type)
                        .unwrap_or("application/octet-stream")
                        .to_string()
                } else {
                    mime_type
                };
                Ok(CoverImage { bytes, mime_type })
            }
        }
    }
}

/// Decode a `data:` URL into bytes and its mime type (parameters dropped).
pub fn parse_data_url(url: &str) -> Result<CoverImage, DataUrlError> {
    let url = url.trim();
    let rest = url
        .get(..5)
        .filter(|scheme| scheme.eq_ignore_ascii_case("data:"))
        .map(|_| &url[5..])
        .ok_or(DataUrlError::NotDataUrl)?;
    let (header, payload) = rest.split_once(',').ok_or(DataUrlError::MissingSeparator)?;

    let mut params = header.split(';');
    let mime_type = params.next().unwrap_or("").trim().to_ascii_lowercase();
    let is_base64 = params.any(|p| p.trim().eq_ignore_ascii_case("base64"));

    let raw: Vec<u8> = percent_decode(payload.as_bytes()).collect();
    let bytes = if is_base64 {
        let compact: Vec<u8> = raw.into_iter().filter(|b| !b.is_ascii_whitespace()).collect();
        LENIENT_BASE64.decode(compact)?
    } else {
        raw
    };

    let mime_type = if mime_type.is_empty() {
        "text/plain".to_string()
    } else {
        mime_type
    };
    Ok(CoverImage { bytes, mime_type })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base64_data_url() {
        let image = parse_data_url("data:image/png;base64,iVBORw0KGgo=").unwrap();
        assert_eq!(image.mime_type, "image/png");
        assert_eq!(image.bytes, b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn test_unpadded_and_wrapped_base64() {
        let image = parse_data_url("DATA:image/JPEG;base64,/9j/\n4A").unwrap();
        assert_eq!(image.mime_type, "image/jpeg");
        assert_eq!(image.bytes, [0xFF, 0xD8, 0xFF, 0xE0]);
    }

    #[test]
    fn test_percent_encoded_payload() {
        let image = parse_data_url("data:image/gif,GIF89a%00%01").unwrap();
        assert_eq!(image.mime_type, "image/gif");
        assert_eq!(image.bytes, b"GIF89a\x00\x01");
    }

    #[test]
    fn test_rejects_non_data_urls() {
        assert_eq!(
            parse_data_url("https://example.com/cover.png"),
            Err(DataUrlError::NotDataUrl)
        );
        assert_eq!(
            parse_data_url("data:image/png;base64"),
            Err(DataUrlError::MissingSeparator)
        );
        assert!(matches!(
            parse_data_url("data:image/png;base64,@@@"),
            Err(DataUrlError::Base64(_))
        ));
    }

    #[test]
    fn test_bytes_source_sniffs_missing_mime() {
        let image = CoverSource::Bytes {
            bytes: b"GIF89a".to_vec(),
            mime_type: String::new(),
        }
        .into_image()
        .unwrap();
        assert_eq!(image.mime_type, "image/gif");

        let image = CoverSource::Bytes {
            bytes: b"???".to_vec(),
            mime_type: " ".into(),
        }
        .into_image()
        .unwrap();
        assert_eq!(image.mime_type, "application/octet-stream");
    }
}
