//! # Room Photos
//!
//! Customers upload a photo of the wall for each TV. Photos are
//! content-addressed: the id is the BLAKE3 digest of the bytes, so uploading
//! the same file twice yields the same id and stores it once.

use crate::primitives::MAX_PHOTO_BYTES;
use crate::{MarketError, PhotoId};
use serde::{Deserialize, Serialize};

/// Accepted image encodings, detected from magic bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Jpeg,
    Png,
    Webp,
}

impl ImageFormat {
    /// Sniff the format from the file header.
    #[must_use]
    pub fn detect(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [0xFF, 0xD8, 0xFF, ..] => Some(Self::Jpeg),
            [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => Some(Self::Png),
            [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some(Self::Webp),
            _ => None,
        }
    }

    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
        }
    }

    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Webp => "webp",
        }
    }
}

/// A validated photo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Photo {
    pub id: PhotoId,
    pub format: ImageFormat,
    pub bytes: Vec<u8>,
}

impl Photo {
    /// Validate raw upload bytes and compute the content id.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, MarketError> {
        if bytes.is_empty() {
            return Err(MarketError::invalid("Photo is empty"));
        }
        if bytes.len() > MAX_PHOTO_BYTES {
            return Err(MarketError::invalid(format!(
                "Photo is {} bytes; the limit is {} bytes",
                bytes.len(),
                MAX_PHOTO_BYTES
            )));
        }
        let format = ImageFormat::detect(&bytes)
            .ok_or_else(|| MarketError::invalid("Photo must be a JPEG, PNG or WebP image"))?;
        let id = PhotoId(blake3::hash(&bytes).to_hex().to_string());
        Ok(Self { id, format, bytes })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Whether a string looks like a photo id (64 lower-case hex digits).
#[must_use]
pub fn is_photo_id(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13];

    #[test]
    fn detects_formats() {
        assert_eq!(ImageFormat::detect(&[0xFF, 0xD8, 0xFF, 0xE0]), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::detect(PNG), Some(ImageFormat::Png));
        assert_eq!(
            ImageFormat::detect(b"RIFF\x10\x00\x00\x00WEBPVP8 "),
            Some(ImageFormat::Webp)
        );
        assert_eq!(ImageFormat::detect(b"GIF89a"), None);
        assert_eq!(ImageFormat::detect(&[]), None);
    }

    #[test]
    fn content_addressed() {
        let a = Photo::from_bytes(PNG.to_vec()).expect("png");
        let b = Photo::from_bytes(PNG.to_vec()).expect("png");
        assert_eq!(a.id, b.id);
        assert!(is_photo_id(a.id.as_str()));
    }

    #[test]
    fn rejects_non_images_and_oversize() {
        assert!(Photo::from_bytes(b"hello".to_vec()).is_err());
        assert!(Photo::from_bytes(Vec::new()).is_err());
        let mut huge = vec![0xFF, 0xD8, 0xFF];
        huge.resize(MAX_PHOTO_BYTES + 1, 0);
        assert!(Photo::from_bytes(huge).is_err());
    }
}
