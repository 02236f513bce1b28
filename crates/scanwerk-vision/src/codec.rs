// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image codec helpers for the service boundary — decoding raw uploads and
// encoding previews/overlays as base64 data URLs.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::{DynamicImage, ImageFormat};
use scanwerk_core::error::{Result, ScanwerkError};

/// JPEG quality used for all preview/overlay encodings.
const JPEG_QUALITY: u8 = 85;

/// Decode raw upload bytes (JPEG, PNG, ...) into a working image.
///
/// Undecodable bytes are an input-validation error: they must be rejected
/// before the vision pipeline runs, never silently defaulted.
pub fn decode_image(data: &[u8]) -> Result<DynamicImage> {
    image::load_from_memory(data)
        .map_err(|err| ScanwerkError::ImageError(format!("failed to decode image: {err}")))
}

/// Encode as a JPEG data URL (`data:image/jpeg;base64,...`).
pub fn to_jpeg_data_url(image: &DynamicImage) -> Result<String> {
    let mut buffer = Vec::new();
    let rgb = image.to_rgb8();
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, JPEG_QUALITY);
    rgb.write_with_encoder(encoder)
        .map_err(|err| ScanwerkError::ImageError(format!("JPEG encoding failed: {err}")))?;
    Ok(format!("data:image/jpeg;base64,{}", STANDARD.encode(&buffer)))
}

/// Encode as a PNG data URL (`data:image/png;base64,...`).
pub fn to_png_data_url(image: &DynamicImage) -> Result<String> {
    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);
    image
        .write_to(&mut cursor, ImageFormat::Png)
        .map_err(|err| ScanwerkError::ImageError(format!("PNG encoding failed: {err}")))?;
    Ok(format!("data:image/png;base64,{}", STANDARD.encode(&buffer)))
}

/// Resize to the given width, preserving aspect ratio. Images already
/// narrower pass through unchanged.
pub fn resize_to_width(image: &DynamicImage, width: u32) -> DynamicImage {
    if image.width() <= width {
        return image.clone();
    }
    let height = ((width as f32 / image.width() as f32) * image.height() as f32)
        .round()
        .max(1.0) as u32;
    image.resize_exact(width, height, image::imageops::FilterType::Lanczos3)
}

// -- Tests --------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    fn sample() -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_pixel(64, 48, Luma([120u8])))
    }

    #[test]
    fn decode_roundtrips_png_bytes() {
        let mut bytes = Vec::new();
        sample()
            .write_to(&mut std::io::Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();

        let decoded = decode_image(&bytes).unwrap();
        assert_eq!(decoded.width(), 64);
        assert_eq!(decoded.height(), 48);
    }

    #[test]
    fn decode_rejects_garbage() {
        let result = decode_image(b"definitely not an image");
        assert!(matches!(result, Err(ScanwerkError::ImageError(_))));
    }

    #[test]
    fn jpeg_data_url_prefix() {
        let url = to_jpeg_data_url(&sample()).unwrap();
        assert!(url.starts_with("data:image/jpeg;base64,"));
        assert!(url.len() > "data:image/jpeg;base64,".len());
    }

    #[test]
    fn png_data_url_prefix() {
        let url = to_png_data_url(&sample()).unwrap();
        assert!(url.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn resize_preserves_aspect() {
        let image = DynamicImage::ImageLuma8(GrayImage::from_pixel(800, 400, Luma([0u8])));
        let resized = resize_to_width(&image, 200);
        assert_eq!(resized.width(), 200);
        assert_eq!(resized.height(), 100);
    }

    #[test]
    fn resize_skips_narrow_images() {
        let resized = resize_to_width(&sample(), 200);
        assert_eq!(resized.width(), 64);
    }
}
