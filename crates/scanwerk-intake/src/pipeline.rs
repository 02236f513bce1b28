// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The intake pipeline — one synchronous, self-contained pass per request.
//
// Nothing is cached between calls: the boundary is re-detected, the engine
// re-located, and OCR re-run every time, because both the document and the
// environment can change between requests. Concurrent requests share no
// mutable state.

use scanwerk_core::config::IntakeOptions;
use scanwerk_core::error::Result;
use scanwerk_core::types::{IntakeReport, Preview};
use scanwerk_ocr::EngineLocator;
use scanwerk_vision::{boundary, codec, quality, rectify, visualize};
use tracing::{info, instrument};

/// Preview images are downscaled to this width.
const PREVIEW_WIDTH: u32 = 800;

/// Runs intake requests. Holds the engine-discovery capability so callers
/// (and tests) can substitute how the external engine is found; everything
/// else is recomputed per call.
pub struct IntakePipeline {
    locator: EngineLocator,
}

impl IntakePipeline {
    /// A pipeline probing the real environment for the OCR engine.
    pub fn new() -> Self {
        Self {
            locator: EngineLocator::system(),
        }
    }

    /// A pipeline with an injected engine locator.
    pub fn with_locator(locator: EngineLocator) -> Self {
        Self { locator }
    }

    /// Process one uploaded document image into a complete intake report.
    ///
    /// Only malformed input errors out: undecodable bytes and malformed
    /// manual-corner payloads. Everything downstream degrades instead — a
    /// frame with no detectable boundary, a missing OCR engine, or an
    /// entirely unreadable page still produces an `Ok` report carrying
    /// zero confidence and empty text for the caller to judge.
    #[instrument(skip_all, fields(bytes = data.len()))]
    pub fn process(&self, data: &[u8], options: &IntakeOptions) -> Result<IntakeReport> {
        // Input validation happens before any vision work.
        let original = codec::decode_image(data)?;
        let manual = options
            .manual_corners
            .as_ref()
            .map(rectify::parse_corners)
            .transpose()?;

        // 1. Boundary detection.
        let detected = boundary::detect_boundary(&original);

        // 2. Rectification. Manual corners are caller-supplied ground truth
        //    and take precedence over the detector.
        let outcome = rectify::rectify(&original, detected, manual);

        // 3. Quality on the raw frame, folding in detection confidence.
        let quality = quality::assess(&original, outcome.boundary.confidence);

        // 4. OCR on the rectified crop.
        let ocr = scanwerk_ocr::run(&outcome.rectified, options.ocr_mode, &self.locator);

        // 5. Optional ablation across preprocessing variants.
        let (variants, best_variant) = if options.ablation {
            scanwerk_ocr::run_variants(&original, &outcome.rectified, &self.locator)
        } else {
            (Vec::new(), None)
        };

        // 6. Optional previews and overlays for the client.
        let (preview, original_preview) = if options.return_preview {
            let rectified_small = codec::resize_to_width(&outcome.rectified, PREVIEW_WIDTH);
            let preview = Preview {
                data_url: codec::to_jpeg_data_url(&rectified_small)?,
                width: outcome.rectified.width(),
                height: outcome.rectified.height(),
                is_scanned: outcome.warp_succeeded,
            };
            let original_small = codec::resize_to_width(&original, PREVIEW_WIDTH);
            let original_preview = Preview {
                data_url: codec::to_jpeg_data_url(&original_small)?,
                width: original.width(),
                height: original.height(),
                is_scanned: false,
            };
            (Some(preview), Some(original_preview))
        } else {
            (None, None)
        };

        let overlays = if options.debug_overlays {
            Some(visualize::generate_debug_overlays(&original, true, true)?)
        } else {
            None
        };

        info!(
            boundary_found = outcome.boundary.found,
            warp_succeeded = outcome.warp_succeeded,
            quality_score = quality.score,
            ocr_engine_found = ocr.engine_found,
            text_len = ocr.text.len(),
            "intake complete"
        );

        Ok(IntakeReport {
            boundary: outcome.boundary,
            warp_succeeded: outcome.warp_succeeded,
            quality,
            ocr,
            variants,
            best_variant,
            preview,
            original_preview,
            overlays,
        })
    }
}

impl Default for IntakePipeline {
    fn default() -> Self {
        Self::new()
    }
}
