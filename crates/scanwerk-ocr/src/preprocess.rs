// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// OCR preprocessing — image enhancement ahead of text recognition.
//
// Two modes: "basic" applies grayscale plus tiled adaptive contrast
// enhancement; "enhanced" upscales, denoises, sharpens, and binarizes for
// difficult captures. Preprocessing must never be the reason recognition
// fails entirely: the enhanced path falls back to plain grayscale instead
// of propagating a failure.

use image::{GrayImage, Luma};
use image::imageops::{self, FilterType};
use imageproc::filter::{filter3x3, median_filter};
use scanwerk_core::types::OcrMode;
use tracing::{debug, instrument, warn};

/// Contrast clip limit for the adaptive equalization, relative to a flat
/// histogram bin.
const CLAHE_CLIP_LIMIT: f32 = 2.0;
/// Tile grid for adaptive equalization.
const CLAHE_TILES: u32 = 8;

/// Unsharp-style sharpening kernel.
const SHARPEN_KERNEL: [f32; 9] = [-1.0, -1.0, -1.0, -1.0, 9.0, -1.0, -1.0, -1.0, -1.0];

/// Local-mean window radius and offset for the binarization step.
const BINARIZE_BLOCK_RADIUS: u32 = 5;
const BINARIZE_C: i32 = 2;

/// Upscaled dimensions past this are refused and fall back to grayscale.
const MAX_ENHANCED_DIM: u32 = 8000;

/// Preprocess an image for text recognition.
#[instrument(skip(image), fields(width = image.width(), height = image.height(), ?mode))]
pub fn preprocess(image: &image::DynamicImage, mode: OcrMode) -> GrayImage {
    let gray = image.to_luma8();

    match mode {
        OcrMode::Basic => clahe(&gray, CLAHE_CLIP_LIMIT, CLAHE_TILES),
        OcrMode::Enhanced => match enhance(&gray) {
            Some(enhanced) => enhanced,
            None => {
                warn!("enhanced preprocessing refused the image; using plain grayscale");
                gray
            }
        },
    }
}

/// The enhanced pipeline: 2x bicubic upscale (small text benefits most),
/// median denoise, sharpen, adaptive binarization. Returns `None` when the
/// upscale would exceed the dimension cap.
fn enhance(gray: &GrayImage) -> Option<GrayImage> {
    let (w, h) = gray.dimensions();
    let (up_w, up_h) = (w.checked_mul(2)?, h.checked_mul(2)?);
    if up_w > MAX_ENHANCED_DIM || up_h > MAX_ENHANCED_DIM || up_w == 0 || up_h == 0 {
        return None;
    }

    let upscaled = imageops::resize(gray, up_w, up_h, FilterType::CatmullRom);
    let denoised = median_filter(&upscaled, 1, 1);
    let sharpened: GrayImage = filter3x3::<Luma<u8>, f32, u8>(&denoised, &SHARPEN_KERNEL);
    debug!(up_w, up_h, "enhanced preprocessing applied");

    Some(adaptive_binarize(&sharpened, BINARIZE_BLOCK_RADIUS, BINARIZE_C))
}

/// Tiled adaptive histogram equalization with a clip limit (CLAHE-style).
///
/// The image is divided into a `tiles` x `tiles` grid; each tile gets its
/// own clipped, equalized intensity mapping, and every pixel blends the
/// mappings of its four surrounding tiles bilinearly. Boosts faint local
/// contrast without letting noise blow up in flat regions.
pub fn clahe(gray: &GrayImage, clip_limit: f32, tiles: u32) -> GrayImage {
    let (w, h) = gray.dimensions();
    if w == 0 || h == 0 {
        return gray.clone();
    }

    let tiles = tiles.max(1);
    let tile_w = w.div_ceil(tiles).max(1);
    let tile_h = h.div_ceil(tiles).max(1);
    let grid_x = w.div_ceil(tile_w);
    let grid_y = h.div_ceil(tile_h);

    // Build one clipped-equalization lookup table per tile.
    let mut maps: Vec<[u8; 256]> = Vec::with_capacity((grid_x * grid_y) as usize);
    for ty in 0..grid_y {
        for tx in 0..grid_x {
            let x0 = tx * tile_w;
            let y0 = ty * tile_h;
            let x1 = (x0 + tile_w).min(w);
            let y1 = (y0 + tile_h).min(h);

            let mut histogram = [0u32; 256];
            for y in y0..y1 {
                for x in x0..x1 {
                    histogram[gray.get_pixel(x, y).0[0] as usize] += 1;
                }
            }

            let count = (x1 - x0) * (y1 - y0);
            maps.push(clipped_equalization_map(&histogram, count, clip_limit));
        }
    }

    // Blend the four surrounding tile mappings per pixel.
    let map_at = |tx: i64, ty: i64| -> &[u8; 256] {
        let tx = tx.clamp(0, grid_x as i64 - 1) as u32;
        let ty = ty.clamp(0, grid_y as i64 - 1) as u32;
        &maps[(ty * grid_x + tx) as usize]
    };

    GrayImage::from_fn(w, h, |x, y| {
        let value = gray.get_pixel(x, y).0[0] as usize;

        // Position relative to tile centres.
        let fx = (x as f32 - tile_w as f32 / 2.0) / tile_w as f32;
        let fy = (y as f32 - tile_h as f32 / 2.0) / tile_h as f32;
        let tx0 = fx.floor() as i64;
        let ty0 = fy.floor() as i64;
        let wx = fx - tx0 as f32;
        let wy = fy - ty0 as f32;

        let v00 = map_at(tx0, ty0)[value] as f32;
        let v10 = map_at(tx0 + 1, ty0)[value] as f32;
        let v01 = map_at(tx0, ty0 + 1)[value] as f32;
        let v11 = map_at(tx0 + 1, ty0 + 1)[value] as f32;

        let top = v00 * (1.0 - wx) + v10 * wx;
        let bottom = v01 * (1.0 - wx) + v11 * wx;
        let blended = top * (1.0 - wy) + bottom * wy;

        Luma([blended.round().clamp(0.0, 255.0) as u8])
    })
}

/// Equalization lookup for one tile: the histogram is clipped at
/// `clip_limit` times the flat-histogram bin height, the excess spread
/// evenly, and the cumulative distribution rescaled to [0, 255].
fn clipped_equalization_map(histogram: &[u32; 256], count: u32, clip_limit: f32) -> [u8; 256] {
    let mut map = [0u8; 256];
    if count == 0 {
        for (v, entry) in map.iter_mut().enumerate() {
            *entry = v as u8;
        }
        return map;
    }

    let clip = ((clip_limit * count as f32 / 256.0).max(1.0)) as u32;
    let mut clipped = [0u32; 256];
    let mut excess = 0u32;
    for (i, &bin) in histogram.iter().enumerate() {
        if bin > clip {
            clipped[i] = clip;
            excess += bin - clip;
        } else {
            clipped[i] = bin;
        }
    }

    // Redistribute the clipped mass so the total is preserved, spreading
    // the integer remainder over the leading bins.
    let bonus = excess / 256;
    let mut remainder = excess % 256;
    for bin in clipped.iter_mut() {
        *bin += bonus;
        if remainder > 0 {
            *bin += 1;
            remainder -= 1;
        }
    }

    let mut cumulative = 0u64;
    for (i, &bin) in clipped.iter().enumerate() {
        cumulative += bin as u64;
        map[i] = ((cumulative * 255) / count as u64).min(255) as u8;
    }
    map
}

/// Adaptive thresholding via a local mean over an integral image: pixels
/// darker than their neighbourhood mean (minus a constant) become black,
/// the rest white.
pub fn adaptive_binarize(gray: &GrayImage, block_radius: u32, c: i32) -> GrayImage {
    let (width, height) = gray.dimensions();
    let integral = compute_integral_image(gray);

    let mut output = GrayImage::new(width, height);
    for y in 0..height {
        for x in 0..width {
            let local_mean = region_mean(&integral, width, height, x, y, block_radius);
            let threshold = (local_mean as i32 - c).clamp(0, 255) as u8;
            let pixel_val = gray.get_pixel(x, y).0[0];
            let binary = if pixel_val < threshold { 0u8 } else { 255u8 };
            output.put_pixel(x, y, Luma([binary]));
        }
    }
    output
}

/// Summed-area table with a zero-padded border:
/// `integral[y * (width+1) + x]` holds the sum over [0, 0)..(x, y).
fn compute_integral_image(gray: &GrayImage) -> Vec<u64> {
    let (w, h) = gray.dimensions();
    let stride = (w + 1) as usize;
    let mut table = vec![0u64; stride * (h + 1) as usize];

    for y in 0..h {
        let mut row_sum: u64 = 0;
        for x in 0..w {
            row_sum += gray.get_pixel(x, y).0[0] as u64;
            let idx = (y + 1) as usize * stride + (x + 1) as usize;
            let above = y as usize * stride + (x + 1) as usize;
            table[idx] = row_sum + table[above];
        }
    }

    table
}

/// Mean pixel value in a square window centred on (cx, cy), clamped to the
/// image bounds, via the precomputed integral image.
fn region_mean(
    integral: &[u64],
    img_width: u32,
    img_height: u32,
    cx: u32,
    cy: u32,
    radius: u32,
) -> f64 {
    let stride = (img_width + 1) as usize;

    let x1 = cx.saturating_sub(radius) as usize;
    let y1 = cy.saturating_sub(radius) as usize;
    let x2 = ((cx + radius + 1) as usize).min(img_width as usize);
    let y2 = ((cy + radius + 1) as usize).min(img_height as usize);

    let area = ((x2 - x1) * (y2 - y1)) as f64;
    if area == 0.0 {
        return 128.0;
    }

    let sum = integral[y2 * stride + x2] as f64
        - integral[y1 * stride + x2] as f64
        - integral[y2 * stride + x1] as f64
        + integral[y1 * stride + x1] as f64;

    sum / area
}

// -- Tests --------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use image::DynamicImage;

    fn low_contrast_texture(w: u32, h: u32) -> GrayImage {
        // Pseudo-noise squeezed into [100, 140]: faint detail everywhere.
        GrayImage::from_fn(w, h, |x, y| Luma([(100 + (x * 7 + y * 13) % 41) as u8]))
    }

    fn std_dev(img: &GrayImage) -> f64 {
        let n = (img.width() as u64 * img.height() as u64).max(1) as f64;
        let mean = img.pixels().map(|p| p.0[0] as f64).sum::<f64>() / n;
        let var = img
            .pixels()
            .map(|p| (p.0[0] as f64 - mean).powi(2))
            .sum::<f64>()
            / n;
        var.sqrt()
    }

    #[test]
    fn basic_mode_preserves_dimensions() {
        let image = DynamicImage::ImageLuma8(low_contrast_texture(80, 60));
        let out = preprocess(&image, OcrMode::Basic);
        assert_eq!(out.dimensions(), (80, 60));
    }

    #[test]
    fn basic_mode_stretches_local_contrast() {
        let input = low_contrast_texture(128, 128);
        let before = std_dev(&input);
        let out = preprocess(&DynamicImage::ImageLuma8(input), OcrMode::Basic);
        assert!(
            std_dev(&out) > before,
            "contrast should increase ({before} -> {})",
            std_dev(&out)
        );
    }

    #[test]
    fn enhanced_mode_doubles_dimensions_and_binarizes() {
        let image = DynamicImage::ImageLuma8(low_contrast_texture(60, 40));
        let out = preprocess(&image, OcrMode::Enhanced);
        assert_eq!(out.dimensions(), (120, 80));
        assert!(out.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    }

    #[test]
    fn enhanced_mode_falls_back_on_oversize_input() {
        let image = DynamicImage::ImageLuma8(GrayImage::from_pixel(4001, 8, Luma([128u8])));
        let out = preprocess(&image, OcrMode::Enhanced);
        // Fallback is plain grayscale at the original dimensions.
        assert_eq!(out.dimensions(), (4001, 8));
        assert_eq!(out.get_pixel(0, 0).0[0], 128);
    }

    #[test]
    fn adaptive_binarize_splits_text_from_background() {
        // Dark "strokes" on a light page.
        let mut img = GrayImage::from_pixel(40, 40, Luma([220u8]));
        for x in 10..30 {
            img.put_pixel(x, 20, Luma([40u8]));
        }
        let out = adaptive_binarize(&img, 5, 2);
        assert_eq!(out.get_pixel(20, 20).0[0], 0);
        assert_eq!(out.get_pixel(5, 5).0[0], 255);
    }

    #[test]
    fn clahe_identity_on_empty_histogram_tiles() {
        // A tiny uniform image must come through without artifacts.
        let img = GrayImage::from_pixel(4, 4, Luma([200u8]));
        let out = clahe(&img, 2.0, 8);
        assert_eq!(out.dimensions(), (4, 4));
    }
}
