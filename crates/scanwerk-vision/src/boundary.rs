// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document boundary detection — finds the quadrilateral outline of a
// photographed page via edge detection and contour analysis.

use image::{DynamicImage, GrayImage};
use imageproc::contours::find_contours;
use imageproc::distance_transform::Norm;
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::geometry::{approximate_polygon_dp, arc_length};
use imageproc::morphology::{close, dilate};
use imageproc::point::Point;
use scanwerk_core::geometry::{Point2D, Quadrilateral, shoelace_area};
use scanwerk_core::types::BoundaryResult;
use tracing::{debug, info, instrument};

/// Fixed processing height. All contour geometry runs at this resolution
/// and is rescaled back, bounding cost independently of input size.
const PROCESS_HEIGHT: u32 = 500;

/// How many of the largest contours are considered as candidates.
const MAX_CANDIDATES: usize = 10;

/// Polygon simplification tolerances, as fractions of contour perimeter.
const EPSILON_FRACTIONS: [f64; 4] = [0.02, 0.03, 0.04, 0.05];

/// A candidate quadrilateral must cover at least this fraction of the
/// processed frame.
const MIN_AREA_RATIO: f32 = 0.10;

/// Detection output, with the edge mask retained when debugging.
pub struct Detection {
    pub result: BoundaryResult,
    /// Edge mask at processing resolution, captured on request for
    /// operator inspection.
    pub edges: Option<GrayImage>,
}

/// Detect the document boundary, discarding intermediates.
pub fn detect_boundary(image: &DynamicImage) -> BoundaryResult {
    detect(image, false).result
}

/// Detect the document boundary in a photographed frame.
///
/// ## Pipeline
///
/// 1. Downscale to a fixed processing height (aspect preserved; skipped
///    when the image is already smaller)
/// 2. Grayscale → Gaussian blur
/// 3. Canny with thresholds derived from the median intensity
/// 4. Morphological close + dilate to bridge broken edge segments
/// 5. Contour extraction, ten largest kept
/// 6. Per contour, polygon approximation at increasing tolerances until a
///    convex four-vertex polygon covering ≥10% of the frame appears
/// 7. Largest accepted candidate wins; corners are rescaled to original
///    coordinates and canonically ordered
///
/// A blank or contourless frame yields `found = false` with confidence
/// 0.0 — never an error.
#[instrument(skip(image), fields(width = image.width(), height = image.height(), debug))]
pub fn detect(image: &DynamicImage, debug: bool) -> Detection {
    let mut notes = Vec::new();

    let (orig_w, orig_h) = (image.width(), image.height());
    let image_area = orig_w as f32 * orig_h as f32;
    notes.push(format!("Image size: {orig_w}x{orig_h}"));

    // Step 1: Downscale for processing.
    let (working, ratio) = if orig_h > PROCESS_HEIGHT {
        let ratio = orig_h as f32 / PROCESS_HEIGHT as f32;
        let process_w = (orig_w as f32 / ratio).round().max(1.0) as u32;
        let resized = image.resize_exact(
            process_w,
            PROCESS_HEIGHT,
            image::imageops::FilterType::Lanczos3,
        );
        notes.push(format!("Downscaled to {process_w}x{PROCESS_HEIGHT}"));
        (resized, ratio)
    } else {
        notes.push("Image below processing height; no downscale".into());
        (image.clone(), 1.0)
    };

    let (process_w, process_h) = (working.width(), working.height());
    let process_area = process_w as f32 * process_h as f32;

    // Step 2: Grayscale + blur.
    let gray = working.to_luma8();
    notes.push("Converted to grayscale".into());
    let blurred = gaussian_blur_f32(&gray, 1.4);
    notes.push("Applied Gaussian blur".into());

    // Step 3: Canny with median-adaptive thresholds, so detection holds up
    // across lighting conditions without hand-tuned constants.
    let median = median_intensity(&blurred);
    let lower = (0.66 * median as f32).clamp(0.0, 255.0);
    let upper = (1.33 * median as f32).clamp(0.0, 255.0).max(lower + 1.0);
    let edged = canny(&blurred, lower, upper);
    notes.push(format!(
        "Canny edge detection (thresholds: {:.0}-{:.0})",
        lower, upper
    ));

    let edges_out = debug.then(|| edged.clone());

    // Step 4: Close gaps so broken page edges form closed contours.
    let closed = close(&edged, Norm::LInf, 2);
    let dilated = dilate(&closed, Norm::LInf, 2);
    notes.push("Applied morphological close + dilate".into());

    // Step 5: Contours, largest first.
    let contours = find_contours::<i32>(&dilated);
    notes.push(format!("Found {} contours", contours.len()));

    let mut ranked: Vec<(f64, &[Point<i32>])> = contours
        .iter()
        .map(|c| (contour_area(&c.points), c.points.as_slice()))
        .collect();
    ranked.sort_by(|a, b| b.0.total_cmp(&a.0));
    ranked.truncate(MAX_CANDIDATES);

    // Step 6: Find the best quadrilateral across candidates and tolerances.
    let mut best_quad: Option<[Point2D; 4]> = None;
    let mut best_area = 0.0f32;

    for (i, &(_, points)) in ranked.iter().enumerate() {
        if points.len() < 4 {
            continue;
        }
        let perimeter = arc_length(points, true);

        for eps_frac in EPSILON_FRACTIONS {
            let approx = approximate_polygon_dp(points, eps_frac * perimeter, true);
            if approx.len() != 4 {
                continue;
            }

            let quad = [
                Point2D::new(approx[0].x as f32, approx[0].y as f32),
                Point2D::new(approx[1].x as f32, approx[1].y as f32),
                Point2D::new(approx[2].x as f32, approx[2].y as f32),
                Point2D::new(approx[3].x as f32, approx[3].y as f32),
            ];
            let area = shoelace_area(&quad);
            let area_ratio = area / process_area;

            if area_ratio < MIN_AREA_RATIO {
                notes.push(format!(
                    "Rejected contour {i} at eps={eps_frac}: covers {:.0}% of frame",
                    area_ratio * 100.0
                ));
                continue;
            }
            if !is_convex(&quad) {
                notes.push(format!("Rejected contour {i} at eps={eps_frac}: not convex"));
                continue;
            }

            if area > best_area {
                best_area = area;
                best_quad = Some(quad);
                notes.push(format!(
                    "Quad candidate (contour {i}, eps={eps_frac}, {:.0}% of frame)",
                    area_ratio * 100.0
                ));
            }
            // An accepted four-vertex approximation settles this contour.
            break;
        }
    }

    let Some(quad) = best_quad else {
        notes.push("No valid quadrilateral found".into());
        debug!("boundary detection found no quadrilateral");
        return Detection {
            result: BoundaryResult::not_found(notes),
            edges: edges_out,
        };
    };

    // Step 7: Rescale to original coordinates and canonicalize.
    let ordered = Quadrilateral::from_points(quad).scaled(ratio);

    let mut confidence = (ordered.area() / image_area * 1.5).min(1.0);

    // Severely unequal opposing edges signal a poor quadrilateral.
    let width_ratio = Quadrilateral::edge_ratio(ordered.top_edge(), ordered.bottom_edge());
    let height_ratio = Quadrilateral::edge_ratio(ordered.left_edge(), ordered.right_edge());
    if width_ratio < 0.5 || height_ratio < 0.5 {
        confidence *= 0.7;
        notes.push(format!(
            "Confidence reduced for perspective skew (width ratio {width_ratio:.2}, height ratio {height_ratio:.2})"
        ));
    }
    notes.push(format!("Final confidence: {confidence:.2}"));

    info!(confidence, "document boundary detected");

    Detection {
        result: BoundaryResult {
            found: true,
            corners: Some(ordered),
            confidence,
            notes,
        },
        edges: edges_out,
    }
}

/// Median intensity of a grayscale image, via its histogram.
fn median_intensity(gray: &GrayImage) -> u8 {
    let mut histogram = [0u64; 256];
    for pixel in gray.pixels() {
        histogram[pixel.0[0] as usize] += 1;
    }

    let total = gray.width() as u64 * gray.height() as u64;
    if total == 0 {
        return 128;
    }

    let half = total / 2;
    let mut seen = 0u64;
    for (value, &count) in histogram.iter().enumerate() {
        seen += count;
        if seen > half {
            return value as u8;
        }
    }
    255
}

/// Signed area of a raw contour, for ranking candidates by size.
fn contour_area(points: &[Point<i32>]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut area = 0.0f64;
    for i in 0..n {
        let j = (i + 1) % n;
        area += points[i].x as f64 * points[j].y as f64;
        area -= points[j].x as f64 * points[i].y as f64;
    }
    area.abs() / 2.0
}

/// A quadrilateral is convex when every cross product of consecutive edges
/// has the same sign (zeros tolerated for collinear vertices).
fn is_convex(quad: &[Point2D; 4]) -> bool {
    let mut sign = 0i8;
    for i in 0..4 {
        let a = quad[i];
        let b = quad[(i + 1) % 4];
        let c = quad[(i + 2) % 4];
        let cross = (b.x - a.x) * (c.y - b.y) - (b.y - a.y) * (c.x - b.x);
        if cross.abs() < f32::EPSILON {
            continue;
        }
        let s = if cross > 0.0 { 1 } else { -1 };
        if sign == 0 {
            sign = s;
        } else if sign != s {
            return false;
        }
    }
    true
}

// -- Tests --------------------------------------------------------------------
