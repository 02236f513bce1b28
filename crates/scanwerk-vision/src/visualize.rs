// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Operator debug overlays — glare and edge visualizations. Pure rendering:
// nothing here influences pipeline decisions.

use image::{DynamicImage, GrayImage, Rgb, RgbImage};
use imageproc::contours::find_contours;
use imageproc::distance_transform::Norm;
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::morphology::{close, dilate};
use scanwerk_core::error::Result;
use scanwerk_core::types::DebugOverlays;
use tracing::instrument;

/// Intensity at or above which a pixel counts as glare.
const GLARE_THRESHOLD: u8 = 245;
/// Alpha of the red glare highlight.
const GLARE_ALPHA: f32 = 0.4;

/// Binary mask of glare regions: bright pixels, dilated and closed so that
/// nearby saturated spots merge into contiguous blobs.
pub fn glare_mask(image: &DynamicImage, threshold: u8) -> GrayImage {
    let gray = image.to_luma8();
    let mask = GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        if gray.get_pixel(x, y).0[0] >= threshold {
            image::Luma([255u8])
        } else {
            image::Luma([0u8])
        }
    });

    let dilated = dilate(&mask, Norm::LInf, 4);
    close(&dilated, Norm::LInf, 4)
}

/// Render the glare overlay: red alpha-blend over glare regions plus yellow
/// contour outlines. Returns the overlay and the measured glare ratio.
#[instrument(skip(image), fields(width = image.width(), height = image.height()))]
pub fn glare_overlay(image: &DynamicImage) -> (RgbImage, f64) {
    let mask = glare_mask(image, GLARE_THRESHOLD);

    let total = (mask.width() as u64 * mask.height() as u64).max(1);
    let glare_pixels = mask.pixels().filter(|p| p.0[0] > 0).count() as u64;
    let glare_ratio = glare_pixels as f64 / total as f64;

    let mut result = image.to_rgb8();
    for (x, y, pixel) in result.enumerate_pixels_mut() {
        if mask.get_pixel(x, y).0[0] > 0 {
            let Rgb([r, g, b]) = *pixel;
            *pixel = Rgb([
                blend(r, 255, GLARE_ALPHA),
                blend(g, 0, GLARE_ALPHA),
                blend(b, 0, GLARE_ALPHA),
            ]);
        }
    }

    // Outline the blobs for visibility.
    for contour in find_contours::<i32>(&mask) {
        for point in &contour.points {
            let (x, y) = (point.x as u32, point.y as u32);
            if x < result.width() && y < result.height() {
                result.put_pixel(x, y, Rgb([255u8, 255, 0]));
            }
        }
    }

    (result, glare_ratio)
}

/// Render the edge overlay: Canny edges of the blurred grayscale, dilated
/// for visibility and painted green onto the original.
#[instrument(skip(image), fields(width = image.width(), height = image.height()))]
pub fn edge_overlay(image: &DynamicImage) -> RgbImage {
    let gray = image.to_luma8();
    let blurred = gaussian_blur_f32(&gray, 1.4);
    let edges = canny(&blurred, 50.0, 150.0);
    let visible = dilate(&edges, Norm::LInf, 1);

    let mut result = image.to_rgb8();
    for (x, y, pixel) in result.enumerate_pixels_mut() {
        if visible.get_pixel(x, y).0[0] > 0 {
            *pixel = Rgb([0u8, 255, 0]);
        }
    }
    result
}

/// Assemble the requested overlays as data URLs.
pub fn generate_debug_overlays(
    image: &DynamicImage,
    include_glare: bool,
    include_edges: bool,
) -> Result<DebugOverlays> {
    let (glare, glare_ratio) = if include_glare {
        let (overlay, ratio) = glare_overlay(image);
        let url = crate::codec::to_jpeg_data_url(&DynamicImage::ImageRgb8(overlay))?;
        (Some(url), ratio)
    } else {
        (None, 0.0)
    };

    let edges = if include_edges {
        let overlay = edge_overlay(image);
        Some(crate::codec::to_jpeg_data_url(&DynamicImage::ImageRgb8(overlay))?)
    } else {
        None
    };

    Ok(DebugOverlays {
        glare_overlay: glare,
        glare_ratio,
        edge_overlay: edges,
    })
}

fn blend(base: u8, overlay: u8, alpha: f32) -> u8 {
    (base as f32 * (1.0 - alpha) + overlay as f32 * alpha).round() as u8
}

// -- Tests --------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn frame_with_glare_spot() -> DynamicImage {
        let mut img = GrayImage::from_pixel(120, 120, Luma([90u8]));
        for y in 40..60 {
            for x in 40..60 {
                img.put_pixel(x, y, Luma([250u8]));
            }
        }
        DynamicImage::ImageLuma8(img)
    }

    #[test]
    fn glare_mask_catches_saturated_region() {
        let mask = glare_mask(&frame_with_glare_spot(), GLARE_THRESHOLD);
        assert!(mask.get_pixel(50, 50).0[0] > 0);
        assert_eq!(mask.get_pixel(10, 10).0[0], 0);
    }

    #[test]
    fn glare_overlay_reports_ratio_and_tints() {
        let (overlay, ratio) = glare_overlay(&frame_with_glare_spot());
        // The 20x20 spot grows under dilation but stays a small fraction.
        assert!(ratio > 0.02 && ratio < 0.25, "ratio {ratio}");
        // Inside the spot the red channel dominates after the blend.
        let Rgb([r, _, b]) = *overlay.get_pixel(50, 50);
        assert!(r > b);
    }

    #[test]
    fn glare_overlay_on_clean_frame_is_untouched() {
        let clean = DynamicImage::ImageLuma8(GrayImage::from_pixel(80, 80, Luma([90u8])));
        let (_, ratio) = glare_overlay(&clean);
        assert_eq!(ratio, 0.0);
    }

    #[test]
    fn edge_overlay_paints_green_at_boundaries() {
        let image = frame_with_glare_spot();
        let overlay = edge_overlay(&image);
        // Somewhere along the spot boundary a pixel is pure green.
        let found_green = (38..62).any(|x| {
            (38..62).any(|y| *overlay.get_pixel(x, y) == Rgb([0u8, 255, 0]))
        });
        assert!(found_green);
    }

    #[test]
    fn overlays_are_data_urls() {
        let overlays =
            generate_debug_overlays(&frame_with_glare_spot(), true, true).unwrap();
        assert!(overlays.glare_overlay.unwrap().starts_with("data:image/jpeg;base64,"));
        assert!(overlays.edge_overlay.unwrap().starts_with("data:image/jpeg;base64,"));
        assert!(overlays.glare_ratio > 0.0);
    }

    #[test]
    fn overlays_can_be_skipped() {
        let overlays =
            generate_debug_overlays(&frame_with_glare_spot(), false, false).unwrap();
        assert!(overlays.glare_overlay.is_none());
        assert!(overlays.edge_overlay.is_none());
    }
}
