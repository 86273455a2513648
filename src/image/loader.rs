use crate::utils::error::DetectError;
use crate::Result;
use base64::Engine;
use image::{GenericImageView, ImageFormat, RgbImage};

pub const MAX_IMAGE_BYTES: usize = 50 * 1024 * 1024;

pub struct ImageLoader;

impl ImageLoader {
    /// Decode a data URL (`data:image/jpeg;base64,...`) into an RGB buffer.
    ///
    /// Everything up to the first comma is metadata and is dropped. A string
    /// without a comma is taken to be bare base64.
    pub fn from_data_url(data_url: &str, max_bytes: usize) -> Result<RgbImage> {
        let payload = Self::strip_data_url_prefix(data_url).trim();

        if payload.is_empty() {
            return Err(DetectError::InvalidInput("Empty image payload".to_string()));
        }

        let image_bytes = base64::engine::general_purpose::STANDARD.decode(payload)?;

        Self::from_bytes(&image_bytes, max_bytes)
    }

    pub fn from_bytes(bytes: &[u8], max_bytes: usize) -> Result<RgbImage> {
        if bytes.len() > max_bytes {
            return Err(DetectError::FileTooLarge(bytes.len(), max_bytes));
        }

        if let Some(format) = Self::detect_format(bytes) {
            if !Self::is_supported_format(format) {
                return Err(DetectError::InvalidInput(format!(
                    "Unsupported image format: {:?}",
                    format
                )));
            }
        }

        let image = image::load_from_memory(bytes)?;
        let (width, height) = image.dimensions();
        tracing::debug!("Decoded {}x{} image ({} bytes)", width, height, bytes.len());

        if width == 0 || height == 0 {
            return Err(DetectError::InvalidInput("Image has no pixels".to_string()));
        }

        Ok(image.to_rgb8())
    }

    fn strip_data_url_prefix(data_url: &str) -> &str {
        match data_url.split_once(',') {
            Some((_, payload)) => payload,
            None => data_url,
        }
    }

    pub fn detect_format(bytes: &[u8]) -> Option<ImageFormat> {
        image::guess_format(bytes).ok()
    }

    pub fn is_supported_format(format: ImageFormat) -> bool {
        matches!(
            format,
            ImageFormat::Png
                | ImageFormat::Jpeg
                | ImageFormat::Bmp
                | ImageFormat::Gif
                | ImageFormat::WebP
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};
    use std::io::Cursor;

    fn png_base64(width: u32, height: u32) -> String {
        let img: RgbImage = ImageBuffer::from_pixel(width, height, Rgb([200, 30, 30]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png).unwrap();
        base64::engine::general_purpose::STANDARD.encode(bytes)
    }

    #[test]
    fn test_decodes_data_url() {
        let url = format!("data:image/png;base64,{}", png_base64(8, 4));
        let image = ImageLoader::from_data_url(&url, MAX_IMAGE_BYTES).unwrap();
        assert_eq!(image.dimensions(), (8, 4));
        assert_eq!(image.get_pixel(0, 0), &Rgb([200, 30, 30]));
    }

    #[test]
    fn test_accepts_bare_base64() {
        let image = ImageLoader::from_data_url(&png_base64(3, 3), MAX_IMAGE_BYTES).unwrap();
        assert_eq!(image.dimensions(), (3, 3));
    }

    #[test]
    fn test_rejects_non_base64() {
        let url = "data:image/png;base64,@@not-base64@@";
        let err = ImageLoader::from_data_url(url, MAX_IMAGE_BYTES).unwrap_err();
        assert!(matches!(err, DetectError::Base64(_)));
    }

    #[test]
    fn test_rejects_valid_base64_that_is_not_an_image() {
        let payload = base64::engine::general_purpose::STANDARD.encode(b"plain text, not pixels");
        let url = format!("data:image/png;base64,{}", payload);
        let err = ImageLoader::from_data_url(&url, MAX_IMAGE_BYTES).unwrap_err();
        assert!(matches!(err, DetectError::ImageDecode(_)));
    }

    #[test]
    fn test_rejects_empty_payload() {
        let err =
            ImageLoader::from_data_url("data:image/png;base64,", MAX_IMAGE_BYTES).unwrap_err();
        assert!(matches!(err, DetectError::InvalidInput(_)));
    }

    #[test]
    fn test_enforces_size_limit() {
        let url = format!("data:image/png;base64,{}", png_base64(16, 16));
        let err = ImageLoader::from_data_url(&url, 10).unwrap_err();
        assert!(matches!(err, DetectError::FileTooLarge(_, 10)));
    }
}
