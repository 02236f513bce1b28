// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// scanwerk-vision — Classical computer vision for the Scanwerk intake engine.
//
// Provides boundary detection (edge → contour → polygon approximation),
// perspective rectification, capture-quality scoring, operator debug
// overlays, and the image codec helpers used at the service boundary.

pub mod boundary;
pub mod codec;
pub mod quality;
pub mod rectify;
pub mod visualize;

// Re-export the primary entry points so callers can use
// `scanwerk_vision::detect_boundary` etc.
pub use boundary::{Detection, detect, detect_boundary};
pub use quality::assess;
pub use rectify::{ScanOutcome, parse_corners, rectify};
