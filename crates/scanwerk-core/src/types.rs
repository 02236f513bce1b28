// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Scanwerk document-intake engine.
//
// Every type here is value-like: created fresh per intake request, owned by
// the request's report, never shared mutably between requests.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::geometry::Quadrilateral;

/// Outcome of boundary detection on a single frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundaryResult {
    /// Whether a usable document quadrilateral was found.
    pub found: bool,
    /// Detected corners in canonical order. `Some` iff `found`.
    pub corners: Option<Quadrilateral>,
    /// Detection confidence in [0, 1].
    pub confidence: f32,
    /// Append-only trail of pipeline decisions, for diagnostics only —
    /// never parsed downstream.
    pub notes: Vec<String>,
}

impl BoundaryResult {
    /// The not-found outcome with the decision trail that led to it.
    pub fn not_found(notes: Vec<String>) -> Self {
        Self {
            found: false,
            corners: None,
            confidence: 0.0,
            notes,
        }
    }
}

/// Capture-quality report for an intake frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityReport {
    /// Aggregate usability score in [0, 100].
    pub score: u8,
    /// Issue tags, in fixed evaluation order.
    pub issues: Vec<String>,
    /// User-facing guidance matching the triggered issues.
    pub tips: Vec<String>,
    /// Laplacian-variance sharpness metric (lower is blurrier).
    pub blur_score: f64,
    /// Mean grayscale intensity, 0–255.
    pub brightness_mean: f64,
    /// Fraction of near-saturated pixels.
    pub glare_ratio: f64,
    /// Boundary-detection confidence folded into the score.
    pub boundary_confidence: f32,
}

/// Preprocessing/search depth for an OCR run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrMode {
    /// Grayscale + local contrast enhancement, single segmentation config.
    Basic,
    /// Upscale/denoise/sharpen/binarize, multiple segmentation configs.
    Enhanced,
}

impl std::fmt::Display for OcrMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Basic => f.write_str("basic"),
            Self::Enhanced => f.write_str("enhanced"),
        }
    }
}

/// Result of one named OCR attempt (a preprocessing mode applied to a
/// particular image).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrVariantResult {
    /// Variant name, e.g. `rectified_enhanced`.
    pub name: String,
    /// Space-joined recognized text. Empty when nothing was recognized.
    pub text: String,
    /// Mean token confidence, normalized to [0, 1].
    pub confidence: f32,
    /// Wall-clock duration of the whole attempt.
    pub timing_ms: u64,
    /// Whether the external engine was found at all. `false` is an expected
    /// operating condition (fresh environments), not an error.
    pub engine_found: bool,
    /// Executable the attempt ran, when one was found.
    pub engine_path: Option<String>,
    /// Preprocessing mode the attempt used.
    pub mode: OcrMode,
    /// Diagnostic message when the attempt degraded (engine missing or every
    /// segmentation config failed).
    pub error: Option<String>,
    /// Page-segmentation mode that produced the winning text.
    pub psm_used: Option<u8>,
}

impl OcrVariantResult {
    /// Total order used everywhere a "best" OCR result is selected:
    /// strictly longer text wins, ties broken by higher confidence.
    pub fn better_than(&self, other: &Self) -> bool {
        compare_ocr_outputs((&self.text, self.confidence), (&other.text, other.confidence))
            == std::cmp::Ordering::Greater
    }
}

/// The comparator behind every "best OCR output" selection: longer text
/// first, confidence as the tie-break. Kept as a standalone function so the
/// rule is testable in isolation.
pub fn compare_ocr_outputs(a: (&str, f32), b: (&str, f32)) -> std::cmp::Ordering {
    a.0.len()
        .cmp(&b.0.len())
        .then(a.1.total_cmp(&b.1))
}

/// Where (and whether) the external text-recognition engine was found.
///
/// Recomputed on every OCR invocation — the executable may appear or
/// disappear between requests, and discovery is a read-only probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineLocation {
    /// Resolved executable path, or `None` when every step failed.
    pub path: Option<PathBuf>,
    /// One entry per discovery step, success or failure, for operator
    /// diagnostics.
    pub discovery_log: Vec<String>,
}

impl EngineLocation {
    pub fn found(&self) -> bool {
        self.path.is_some()
    }
}

/// A base64 data-URL preview image crossing the service boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preview {
    /// `data:image/jpeg;base64,...` payload.
    pub data_url: String,
    /// Source image width before preview resizing.
    pub width: u32,
    /// Source image height before preview resizing.
    pub height: u32,
    /// Whether this preview shows a perspective-corrected crop rather than
    /// the raw capture.
    pub is_scanned: bool,
}

/// Optional operator-debug overlay renderings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugOverlays {
    /// Glare highlight overlay as a data URL.
    pub glare_overlay: Option<String>,
    /// Glare ratio measured from the overlay mask.
    pub glare_ratio: f64,
    /// Edge-detection overlay as a data URL.
    pub edge_overlay: Option<String>,
}

/// Everything one intake call produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntakeReport {
    pub boundary: BoundaryResult,
    /// Whether the preview/OCR input is a perspective-corrected crop.
    pub warp_succeeded: bool,
    pub quality: QualityReport,
    /// The primary OCR result (requested mode, rectified image).
    pub ocr: OcrVariantResult,
    /// Ablation variants, when requested. Reported even when all of them
    /// score poorly.
    pub variants: Vec<OcrVariantResult>,
    /// Name of the best ablation variant, when variants were run.
    pub best_variant: Option<String>,
    /// Preview of the rectified document.
    pub preview: Option<Preview>,
    /// Preview of the original capture (original dimensions, for
    /// client-side corner-overlay rendering).
    pub original_preview: Option<Preview>,
    pub overlays: Option<DebugOverlays>,
}
