// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Capture-quality assessment — blur, brightness, and glare metrics rolled
// into a usability score with actionable tips.

use image::DynamicImage;
use imageproc::filter::laplacian_filter;
use scanwerk_core::types::QualityReport;
use tracing::{debug, instrument};

/// Laplacian variance below this reads as blurry.
const BLUR_THRESHOLD: f64 = 100.0;
/// Mean intensity bounds for acceptable exposure, 0–255.
const BRIGHTNESS_LOW: f64 = 70.0;
const BRIGHTNESS_HIGH: f64 = 230.0;
/// A pixel at or above this intensity counts toward glare.
const GLARE_INTENSITY: u8 = 245;
/// More than this fraction of saturated pixels flags glare.
const GLARE_RATIO: f64 = 0.05;
/// Boundary confidence below this suggests the document is cut off.
const BOUNDARY_CONFIDENCE_FLOOR: f32 = 0.6;

/// Assess capture quality of a raw intake frame.
///
/// Each metric is evaluated in a fixed order and independently deducts
/// points from a 100 baseline; deductions are additive, and the final
/// score is clamped to [0, 100]. Every triggered issue appends its tag
/// and (where one exists) a user-facing tip.
#[instrument(skip(image), fields(width = image.width(), height = image.height()))]
pub fn assess(image: &DynamicImage, boundary_confidence: f32) -> QualityReport {
    let gray = image.to_luma8();

    // Blur: variance of the Laplacian response.
    let blur_score = laplacian_variance_of(&gray);

    // Brightness: mean intensity.
    let total_pixels = (gray.width() as u64 * gray.height() as u64).max(1);
    let sum: u64 = gray.pixels().map(|p| p.0[0] as u64).sum();
    let brightness_mean = sum as f64 / total_pixels as f64;

    // Glare: fraction of near-saturated pixels.
    let glare_pixels = gray
        .pixels()
        .filter(|p| p.0[0] >= GLARE_INTENSITY)
        .count() as u64;
    let glare_ratio = glare_pixels as f64 / total_pixels as f64;

    let mut score: i32 = 100;
    let mut issues = Vec::new();
    let mut tips = Vec::new();

    if blur_score < BLUR_THRESHOLD {
        score -= 30;
        issues.push("blurry".to_string());
        tips.push("Hold the camera steady and tap to focus.".to_string());
    }
    if brightness_mean < BRIGHTNESS_LOW {
        score -= 20;
        issues.push("too_dark".to_string());
        tips.push("Turn on the flash or move to better light.".to_string());
    }
    if brightness_mean > BRIGHTNESS_HIGH {
        score -= 10;
        issues.push("too_bright".to_string());
    }
    if glare_ratio > GLARE_RATIO {
        score -= 20;
        issues.push("glare".to_string());
        tips.push("Avoid direct reflection on the paper.".to_string());
    }
    if boundary_confidence < BOUNDARY_CONFIDENCE_FLOOR {
        score -= 20;
        issues.push("cropping_issue".to_string());
        tips.push(
            "Make sure all four corners of the document are visible on a dark background."
                .to_string(),
        );
    }

    debug!(score, blur_score, brightness_mean, glare_ratio, "quality assessed");

    QualityReport {
        score: score.clamp(0, 100) as u8,
        issues,
        tips,
        blur_score,
        brightness_mean,
        glare_ratio,
        boundary_confidence,
    }
}

/// Variance of the Laplacian response over the whole frame. Flat, defocused
/// images produce a narrow response distribution and a low variance.
fn laplacian_variance_of(gray: &image::GrayImage) -> f64 {
    let response = laplacian_filter(gray);
    let n = (response.width() as u64 * response.height() as u64).max(1) as f64;

    let mut sum = 0.0f64;
    for p in response.pixels() {
        sum += p.0[0] as f64;
    }
    let mean = sum / n;

    let mut var = 0.0f64;
    for p in response.pixels() {
        let d = p.0[0] as f64 - mean;
        var += d * d;
    }
    var / n
}

// -- Tests --------------------------------------------------------------------
