//! crates/nutri_chat_core/src/image.rs
//!
//! Inline image attachments. An uploaded nutrition label is held as a base64
//! `data:` URL, the same representation a browser file reader produces, and is
//! sent as-is in the chat payload.

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt;

const DATA_URL_PREFIX: &str = "data:";
const BASE64_MARKER: &str = ";base64,";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImageError {
    #[error("not a base64 data URL")]
    NotDataUrl,
    #[error("unsupported media type '{0}', expected an image")]
    UnsupportedMime(String),
    #[error("image payload is not valid base64: {0}")]
    InvalidPayload(String),
    #[error("image payload is empty")]
    Empty,
}

/// A validated `data:image/*;base64,...` URL.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ImageData {
    data_url: String,
    mime_end: usize,
}

impl ImageData {
    /// Parses and validates a data URL.
    pub fn parse(data_url: &str) -> Result<Self, ImageError> {
        let rest = data_url
            .strip_prefix(DATA_URL_PREFIX)
            .ok_or(ImageError::NotDataUrl)?;
        let marker = rest.find(BASE64_MARKER).ok_or(ImageError::NotDataUrl)?;
        let mime = &rest[..marker];
        if !mime.starts_with("image/") {
            return Err(ImageError::UnsupportedMime(mime.to_string()));
        }

        let payload = &rest[marker + BASE64_MARKER.len()..];
        if payload.is_empty() {
            return Err(ImageError::Empty);
        }
        BASE64_STANDARD
            .decode(payload)
            .map_err(|e| ImageError::InvalidPayload(e.to_string()))?;

        Ok(Self {
            data_url: data_url.to_string(),
            mime_end: DATA_URL_PREFIX.len() + marker,
        })
    }

    /// Encodes raw file bytes the way a browser `readAsDataURL` would.
    pub fn from_bytes(mime_type: &str, bytes: &[u8]) -> Result<Self, ImageError> {
        if !mime_type.starts_with("image/") {
            return Err(ImageError::UnsupportedMime(mime_type.to_string()));
        }
        if bytes.is_empty() {
            return Err(ImageError::Empty);
        }
        let data_url = format!(
            "{}{}{}{}",
            DATA_URL_PREFIX,
            mime_type,
            BASE64_MARKER,
            BASE64_STANDARD.encode(bytes)
        );
        Ok(Self {
            mime_end: DATA_URL_PREFIX.len() + mime_type.len(),
            data_url,
        })
    }

    pub fn mime_type(&self) -> &str {
        &self.data_url[DATA_URL_PREFIX.len()..self.mime_end]
    }

    pub fn as_data_url(&self) -> &str {
        &self.data_url
    }

    /// Decodes the payload back into raw bytes.
    pub fn decode(&self) -> Result<Vec<u8>, ImageError> {
        let payload = &self.data_url[self.mime_end + BASE64_MARKER.len()..];
        BASE64_STANDARD
            .decode(payload)
            .map_err(|e| ImageError::InvalidPayload(e.to_string()))
    }
}

// Data URLs can be megabytes long; keep debug output readable.
impl fmt::Debug for ImageData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageData")
            .field("mime_type", &self.mime_type())
            .field("len", &self.data_url.len())
            .finish()
    }
}

impl TryFrom<String> for ImageData {
    type Error = ImageError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ImageData> for String {
    fn from(image: ImageData) -> Self {
        image.data_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_bytes_as_data_url() {
        let image = ImageData::from_bytes("image/png", b"\x89PNG").unwrap();

        assert_eq!(image.as_data_url(), "data:image/png;base64,iVBORw==");
        assert_eq!(image.mime_type(), "image/png");
        assert_eq!(image.decode().unwrap(), b"\x89PNG");
    }

    #[test]
    fn parses_browser_data_url() {
        let image = ImageData::parse("data:image/jpeg;base64,/9j/4AAQ").unwrap();

        assert_eq!(image.mime_type(), "image/jpeg");
    }

    #[test]
    fn rejects_non_images_and_bad_payloads() {
        assert_eq!(
            ImageData::parse("data:text/plain;base64,aGk="),
            Err(ImageError::UnsupportedMime("text/plain".into()))
        );
        assert_eq!(
            ImageData::parse("https://example.com/label.png"),
            Err(ImageError::NotDataUrl)
        );
        assert_eq!(ImageData::parse("data:image/png;base64,"), Err(ImageError::Empty));
        assert!(matches!(
            ImageData::parse("data:image/png;base64,***"),
            Err(ImageError::InvalidPayload(_))
        ));
        assert!(ImageData::from_bytes("application/pdf", b"%PDF").is_err());
    }

    #[test]
    fn serializes_as_plain_string() {
        let image = ImageData::from_bytes("image/png", b"abc").unwrap();
        let json = serde_json::to_string(&image).unwrap();

        assert_eq!(json, "\"data:image/png;base64,YWJj\"");
        let back: ImageData = serde_json::from_str(&json).unwrap();
        assert_eq!(back, image);
    }
}
