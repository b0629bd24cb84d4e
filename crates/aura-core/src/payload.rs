//! Encoded image payloads are the unit passed between capture, the remote
//! clients and the renderers.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{DynamicImage, ImageFormat};
use std::path::Path;
use thiserror::Error;

/// Media type assumed when a data URL does not declare one.
pub const DEFAULT_MEDIA_TYPE: &str = "image/jpeg";

#[derive(Error, Debug)]
pub enum PayloadError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("unsupported media type: {0} (expected PNG, JPEG, WebP, GIF or BMP)")]
    UnsupportedMediaType(String),
    #[error("invalid base64 payload: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
    #[error("image decode failed: {0}")]
    Decode(#[from] image::ImageError),
    #[error("empty image payload")]
    Empty,
}

/// A base64-encoded image with its media type. Immutable once built.
#[derive(Clone, PartialEq, Eq)]
pub struct ImagePayload {
    media_type: String,
    data: String,
}

impl std::fmt::Debug for ImagePayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImagePayload")
            .field("media_type", &self.media_type)
            .field("encoded_len", &self.data.len())
            .finish()
    }
}

impl ImagePayload {
    /// Wrap already-encoded base64 data.
    pub fn from_base64(media_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            media_type: media_type.into(),
            data: data.into(),
        }
    }

    /// Encode raw image bytes, sniffing the media type from the content.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PayloadError> {
        if bytes.is_empty() {
            return Err(PayloadError::Empty);
        }
        let media_type = sniff_media_type(bytes)?;
        Ok(Self {
            media_type: media_type.to_string(),
            data: STANDARD.encode(bytes),
        })
    }

    /// Read an image file from disk. Non-image files are rejected.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PayloadError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| PayloadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let payload = Self::from_bytes(&bytes)?;
        tracing::debug!(
            path = %path.display(),
            media_type = %payload.media_type,
            bytes = bytes.len(),
            "loaded image file"
        );
        Ok(payload)
    }

    /// Encode a decoded image in the given format.
    pub fn encode(image: &DynamicImage, format: ImageFormat) -> Result<Self, PayloadError> {
        let mut buf = std::io::Cursor::new(Vec::new());
        image.write_to(&mut buf, format)?;
        Ok(Self {
            media_type: format.to_mime_type().to_string(),
            data: STANDARD.encode(buf.into_inner()),
        })
    }

    /// Parse a `data:<media>;base64,<data>` URL. A bare base64 string is
    /// accepted too and gets [`DEFAULT_MEDIA_TYPE`].
    pub fn from_data_url(url: &str) -> Self {
        if let Some(rest) = url.strip_prefix("data:") {
            if let Some((header, data)) = rest.split_once(',') {
                let media_type = header
                    .strip_suffix(";base64")
                    .filter(|m| m.starts_with("image/") && m.len() > "image/".len())
                    .unwrap_or(DEFAULT_MEDIA_TYPE);
                return Self::from_base64(media_type, data);
            }
        }
        Self::from_base64(DEFAULT_MEDIA_TYPE, url)
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.data)
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    /// Base64 body without any data-URL header.
    pub fn base64(&self) -> &str {
        &self.data
    }

    pub fn decode_bytes(&self) -> Result<Vec<u8>, PayloadError> {
        Ok(STANDARD.decode(self.data.as_bytes())?)
    }

    pub fn decode_image(&self) -> Result<DynamicImage, PayloadError> {
        let bytes = self.decode_bytes()?;
        Ok(image::load_from_memory(&bytes)?)
    }

    /// Write the image to `path` as PNG, re-encoding when the payload is in
    /// another format.
    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<(), PayloadError> {
        let path = path.as_ref();
        let bytes = self.decode_bytes()?;
        let io_err = |source| PayloadError::Io {
            path: path.display().to_string(),
            source,
        };
        if self.media_type == "image/png" {
            std::fs::write(path, &bytes).map_err(io_err)?;
        } else {
            let image = image::load_from_memory(&bytes)?;
            image.save_with_format(path, ImageFormat::Png)?;
        }
        Ok(())
    }
}

fn sniff_media_type(bytes: &[u8]) -> Result<&'static str, PayloadError> {
    let format = image::guess_format(bytes)
        .map_err(|_| PayloadError::UnsupportedMediaType("unrecognized content".into()))?;
    match format {
        ImageFormat::Png
        | ImageFormat::Jpeg
        | ImageFormat::WebP
        | ImageFormat::Gif
        | ImageFormat::Bmp => Ok(format.to_mime_type()),
        other => Err(PayloadError::UnsupportedMediaType(format!("{other:?}"))),
    }
}

/// File name for a saved projection: `aura-<mode>-<unix millis>.png`.
pub fn download_filename(mode: crate::Mode, timestamp_millis: i64) -> String {
    format!("aura-{}-{timestamp_millis}.png", mode.slug())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Mode;
    use image::RgbImage;

    fn png_bytes() -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, image::Rgb([10, 20, 30])));
        let mut buf = std::io::Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_from_bytes_sniffs_png() {
        let payload = ImagePayload::from_bytes(&png_bytes()).unwrap();
        assert_eq!(payload.media_type(), "image/png");
        assert_eq!(payload.decode_bytes().unwrap(), png_bytes());
    }

    #[test]
    fn test_rejects_non_image() {
        let err = ImagePayload::from_bytes(b"just some text, not a picture").unwrap_err();
        assert!(matches!(err, PayloadError::UnsupportedMediaType(_)));
    }

    #[test]
    fn test_rejects_empty() {
        assert!(matches!(ImagePayload::from_bytes(&[]), Err(PayloadError::Empty)));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("face.png");
        std::fs::write(&path, png_bytes()).unwrap();
        let payload = ImagePayload::from_file(&path).unwrap();
        assert_eq!(payload.media_type(), "image/png");

        let txt = dir.path().join("notes.txt");
        std::fs::write(&txt, "hello").unwrap();
        assert!(ImagePayload::from_file(&txt).is_err());
        assert!(matches!(
            ImagePayload::from_file(dir.path().join("missing.png")),
            Err(PayloadError::Io { .. })
        ));
    }

    #[test]
    fn test_data_url_header_stripped() {
        let p = ImagePayload::from_data_url("data:image/webp;base64,QUJD");
        assert_eq!(p.media_type(), "image/webp");
        assert_eq!(p.base64(), "QUJD");
        assert_eq!(p.to_data_url(), "data:image/webp;base64,QUJD");
    }

    #[test]
    fn test_data_url_defaults_to_jpeg() {
        let p = ImagePayload::from_data_url("QUJD");
        assert_eq!(p.media_type(), DEFAULT_MEDIA_TYPE);
        assert_eq!(p.base64(), "QUJD");

        let p = ImagePayload::from_data_url("data:application/octet-stream;base64,QUJD");
        assert_eq!(p.media_type(), DEFAULT_MEDIA_TYPE);
    }

    #[test]
    fn test_save_png_reencodes_jpeg() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, image::Rgb([200, 100, 50])));
        let payload = ImagePayload::encode(&img, ImageFormat::Jpeg).unwrap();
        assert_eq!(payload.media_type(), "image/jpeg");

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("projection.png");
        payload.save_png(&out).unwrap();
        let written = std::fs::read(&out).unwrap();
        assert_eq!(image::guess_format(&written).unwrap(), ImageFormat::Png);
    }

    #[test]
    fn test_download_filename() {
        assert_eq!(
            download_filename(Mode::GoldenRatio, 1_760_000_000_000),
            "aura-golden_ratio-1760000000000.png"
        );
        assert_eq!(download_filename(Mode::Symmetry, 5), "aura-symmetry-5.png");
    }

    #[test]
    fn test_debug_hides_data() {
        let p = ImagePayload::from_base64("image/png", "QUJD");
        let dbg = format!("{p:?}");
        assert!(!dbg.contains("QUJD"));
    }
}
