//! Emoji image normalization.
//!
//! Every accepted source image is decoded, squashed to a fixed 128×128
//! square (aspect ratio is deliberately discarded, custom emoji are square)
//! and re-encoded as PNG. Pure CPU work with no shared state.

use std::fmt;
use std::io::Cursor;

use image::ImageFormat;
use image::imageops::FilterType;

use crate::error::ImageError;

/// Edge length of a normalized emoji in pixels.
pub const EMOJI_SIZE: u32 = 128;

/// Raster formats accepted as emoji sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Jpeg,
    Png,
    /// Only the first frame is used.
    Gif,
}

impl SourceFormat {
    fn image_format(self) -> ImageFormat {
        match self {
            Self::Jpeg => ImageFormat::Jpeg,
            Self::Png => ImageFormat::Png,
            Self::Gif => ImageFormat::Gif,
        }
    }

    pub fn mime_type(self) -> &'static str {
        self.image_format().to_mime_type()
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime_type())
    }
}

/// Detect the source format from magic bytes. File names are never consulted.
pub fn sniff_format(bytes: &[u8]) -> Result<SourceFormat, ImageError> {
    match image::guess_format(bytes) {
        Ok(ImageFormat::Jpeg) => Ok(SourceFormat::Jpeg),
        Ok(ImageFormat::Png) => Ok(SourceFormat::Png),
        Ok(ImageFormat::Gif) => Ok(SourceFormat::Gif),
        Ok(other) => Err(ImageError::UnsupportedFormat(
            other.to_mime_type().to_string(),
        )),
        Err(_) => Err(ImageError::UnsupportedFormat("unknown".to_string())),
    }
}

/// A 128×128 PNG ready for registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedImage {
    bytes: Vec<u8>,
}

impl NormalizedImage {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Decode `bytes` as `format`, resize to exactly [`EMOJI_SIZE`] square with
/// a Lanczos3 kernel and encode as PNG.
pub fn normalize(bytes: &[u8], format: SourceFormat) -> Result<NormalizedImage, ImageError> {
    let img = image::load_from_memory_with_format(bytes, format.image_format()).map_err(|e| {
        ImageError::Decode {
            format: format.to_string(),
            reason: e.to_string(),
        }
    })?;

    let resized = img.resize_exact(EMOJI_SIZE, EMOJI_SIZE, FilterType::Lanczos3);

    let mut output = Cursor::new(Vec::new());
    resized
        .write_to(&mut output, ImageFormat::Png)
        .map_err(|e| ImageError::Encode(e.to_string()))?;

    Ok(NormalizedImage {
        bytes: output.into_inner(),
    })
}

#[cfg(test)]
mod tests {
    use image::{DynamicImage, GenericImageView, Rgb, RgbImage, Rgba, RgbaImage};

    use super::*;

    fn encode(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, format).unwrap();
        out.into_inner()
    }

    fn assert_is_emoji_png(normalized: &NormalizedImage) {
        assert_eq!(
            image::guess_format(normalized.as_bytes()).unwrap(),
            ImageFormat::Png
        );
        let decoded = image::load_from_memory(normalized.as_bytes()).unwrap();
        assert_eq!(decoded.dimensions(), (EMOJI_SIZE, EMOJI_SIZE));
    }

    #[test]
    fn tall_jpeg_is_squashed_to_square_png() {
        let src = DynamicImage::ImageRgb8(RgbImage::from_pixel(10, 1000, Rgb([200, 10, 10])));
        let bytes = encode(src, ImageFormat::Jpeg);

        let format = sniff_format(&bytes).unwrap();
        assert_eq!(format, SourceFormat::Jpeg);

        let normalized = normalize(&bytes, format).unwrap();
        assert_is_emoji_png(&normalized);
    }

    #[test]
    fn single_pixel_png_is_upscaled() {
        let src = DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 1, Rgba([0, 255, 0, 128])));
        let bytes = encode(src, ImageFormat::Png);

        let format = sniff_format(&bytes).unwrap();
        assert_eq!(format, SourceFormat::Png);

        let normalized = normalize(&bytes, format).unwrap();
        assert_is_emoji_png(&normalized);
        let decoded = image::load_from_memory(normalized.as_bytes()).unwrap();
        assert!(decoded.color().has_alpha(), "transparency must survive");
    }

    #[test]
    fn large_gif_uses_first_frame() {
        let src = DynamicImage::ImageRgba8(RgbaImage::from_pixel(500, 500, Rgba([10, 20, 200, 255])));
        let bytes = encode(src, ImageFormat::Gif);

        let format = sniff_format(&bytes).unwrap();
        assert_eq!(format, SourceFormat::Gif);

        let normalized = normalize(&bytes, format).unwrap();
        assert_is_emoji_png(&normalized);
    }

    #[test]
    fn sniffing_ignores_anything_but_content() {
        let bmp = b"BM\x3a\x00\x00\x00\x00\x00\x00\x00\x36\x00\x00\x00";
        match sniff_format(bmp) {
            Err(ImageError::UnsupportedFormat(mime)) => assert_eq!(mime, "image/bmp"),
            other => panic!("expected UnsupportedFormat, got {other:?}"),
        }

        match sniff_format(b"<!DOCTYPE html><html>login</html>") {
            Err(ImageError::UnsupportedFormat(mime)) => assert_eq!(mime, "unknown"),
            other => panic!("expected UnsupportedFormat, got {other:?}"),
        }
    }

    #[test]
    fn truncated_image_fails_to_decode() {
        let src = DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 64, Rgb([1, 2, 3])));
        let mut bytes = encode(src, ImageFormat::Png);
        bytes.truncate(40);

        let format = sniff_format(&bytes).unwrap();
        assert!(matches!(
            normalize(&bytes, format),
            Err(ImageError::Decode { .. })
        ));
    }
}
