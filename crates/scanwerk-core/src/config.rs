// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-request intake options.

use serde::{Deserialize, Serialize};

use crate::types::OcrMode;

/// Options controlling a single intake call.
///
/// There is deliberately no persistent configuration and no caching layer:
/// every call re-detects the boundary, re-locates the OCR engine, and
/// re-runs recognition, because both the document and the environment can
/// change between requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntakeOptions {
    /// OCR preprocessing/search depth.
    pub ocr_mode: OcrMode,
    /// Caller-supplied corner override: a JSON array of exactly four
    /// `{"x": .., "y": ..}` objects. Takes precedence over the detector.
    pub manual_corners: Option<serde_json::Value>,
    /// Run the ablation comparison (rectified/original × enhanced/basic)
    /// in addition to the primary OCR pass.
    pub ablation: bool,
    /// Include base64 previews of the rectified and original images.
    pub return_preview: bool,
    /// Include glare/edge debug overlays.
    pub debug_overlays: bool,
}

impl Default for IntakeOptions {
    fn default() -> Self {
        Self {
            ocr_mode: OcrMode::Basic,
            manual_corners: None,
            ablation: false,
            return_preview: true,
            debug_overlays: false,
        }
    }
}
