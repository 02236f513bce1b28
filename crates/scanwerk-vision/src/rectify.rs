// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Perspective rectification — warps a detected (or manually supplied)
// document quadrilateral into a flat, top-down crop.

use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};
use scanwerk_core::error::{Result, ScanwerkError};
use scanwerk_core::geometry::{Point2D, Quadrilateral};
use scanwerk_core::types::BoundaryResult;
use tracing::{debug, info, instrument, warn};

/// Result of one rectification attempt.
///
/// The rectified image is either a perspective-corrected crop or, when no
/// usable corners exist (or the transform degenerates), a pass-through copy
/// of the input — `warp_succeeded` distinguishes the two.
pub struct ScanOutcome {
    pub rectified: DynamicImage,
    pub warp_succeeded: bool,
    pub boundary: BoundaryResult,
}

/// Rectify a photographed document.
///
/// A caller-supplied `corners_override` takes precedence over the
/// detector's output (manual UI correction is ground truth); otherwise the
/// detected corners are used when the boundary was found. With no usable
/// corners the original image passes through unchanged.
#[instrument(skip_all, fields(found = boundary.found, has_override = corners_override.is_some()))]
pub fn rectify(
    image: &DynamicImage,
    boundary: BoundaryResult,
    corners_override: Option<Quadrilateral>,
) -> ScanOutcome {
    let corners = corners_override.or(if boundary.found {
        boundary.corners
    } else {
        None
    });

    let Some(quad) = corners else {
        debug!("no usable corners; passing original through");
        return ScanOutcome {
            rectified: image.clone(),
            warp_succeeded: false,
            boundary,
        };
    };

    // Destination rectangle sized by the longest opposing edges, preserving
    // the aspect of the physical page.
    let out_w = quad.top_edge().max(quad.bottom_edge()).round().max(1.0) as u32;
    let out_h = quad.left_edge().max(quad.right_edge()).round().max(1.0) as u32;

    let src = quad.to_tuples();
    let dest: [(f32, f32); 4] = [
        (0.0, 0.0),
        (out_w as f32, 0.0),
        (out_w as f32, out_h as f32),
        (0.0, out_h as f32),
    ];

    let Some(projection) = Projection::from_control_points(src, dest) else {
        warn!("degenerate corner set; projective transform unavailable");
        return ScanOutcome {
            rectified: image.clone(),
            warp_succeeded: false,
            boundary,
        };
    };

    let rgba_input = image.to_rgba8();
    let default_pixel = Rgba([255u8, 255, 255, 255]);
    let mut output = RgbaImage::new(out_w, out_h);
    warp_into(
        &rgba_input,
        &projection,
        Interpolation::Bilinear,
        default_pixel,
        &mut output,
    );

    info!(out_w, out_h, "perspective rectification applied");

    ScanOutcome {
        rectified: DynamicImage::ImageRgba8(output),
        warp_succeeded: true,
        boundary,
    }
}

/// Validate a caller-supplied corner payload.
///
/// Accepts a JSON array of exactly four objects with numeric `x` and `y`
/// fields. Anything else is rejected outright — a malformed override must
/// surface as a validation error, never silently fall back to detection.
pub fn parse_corners(value: &serde_json::Value) -> Result<Quadrilateral> {
    let list = value
        .as_array()
        .ok_or_else(|| ScanwerkError::InvalidCorners("expected a JSON array".into()))?;

    if list.len() != 4 {
        return Err(ScanwerkError::InvalidCorners(format!(
            "expected exactly 4 points, got {}",
            list.len()
        )));
    }

    let mut points = [Point2D::new(0.0, 0.0); 4];
    for (i, entry) in list.iter().enumerate() {
        let x = entry
            .get("x")
            .and_then(|v| v.as_f64())
            .ok_or_else(|| ScanwerkError::InvalidCorners(format!("point {i} missing numeric 'x'")))?;
        let y = entry
            .get("y")
            .and_then(|v| v.as_f64())
            .ok_or_else(|| ScanwerkError::InvalidCorners(format!("point {i} missing numeric 'y'")))?;
        if !x.is_finite() || !y.is_finite() {
            return Err(ScanwerkError::InvalidCorners(format!(
                "point {i} has a non-finite coordinate"
            )));
        }
        points[i] = Point2D::new(x as f32, y as f32);
    }

    Ok(Quadrilateral::from_points(points))
}

// -- Tests --------------------------------------------------------------------
