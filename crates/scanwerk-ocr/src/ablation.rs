// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// OCR runs and ablation — invokes the engine over an ordered sequence of
// page-segmentation configs, keeps the best output, and compares named
// preprocessing variants against each other.

use std::time::Instant;

use image::DynamicImage;
use scanwerk_core::types::{OcrMode, OcrVariantResult, compare_ocr_outputs};
use tracing::{debug, info, instrument, warn};

use crate::engine::run_config;
use crate::locate::EngineLocator;
use crate::preprocess::preprocess;

/// Page-segmentation configs tried per mode. Basic assumes a uniform text
/// block; enhanced trades latency for robustness on difficult layouts.
const BASIC_PSM_SEQUENCE: &[u8] = &[6];
const ENHANCED_PSM_SEQUENCE: &[u8] = &[6, 4, 11, 3];

/// A config result this good ends the search early.
const GOOD_ENOUGH_TEXT_LEN: usize = 20;
const GOOD_ENOUGH_CONFIDENCE: f32 = 50.0;

/// Run OCR with the requested preprocessing mode.
pub fn run(image: &DynamicImage, mode: OcrMode, locator: &EngineLocator) -> OcrVariantResult {
    run_named("primary", image, mode, locator)
}

/// Run OCR as a named variant.
///
/// Engine discovery happens fresh on every call. A missing engine produces
/// the dedicated not-found outcome (empty text, zero confidence,
/// `engine_found = false`) — a normal, user-actionable state. Individual
/// config attempts that fail are skipped; the request only degrades to an
/// empty result when every attempt fails.
#[instrument(skip(image, locator), fields(variant = name, %mode))]
pub fn run_named(
    name: &str,
    image: &DynamicImage,
    mode: OcrMode,
    locator: &EngineLocator,
) -> OcrVariantResult {
    let start = Instant::now();

    let location = locator.locate();
    let Some(engine_path) = location.path else {
        warn!("recognition engine not found");
        return OcrVariantResult {
            name: name.to_string(),
            text: String::new(),
            confidence: 0.0,
            timing_ms: start.elapsed().as_millis() as u64,
            engine_found: false,
            engine_path: None,
            mode,
            error: Some(
                "Recognition engine not found. Install Tesseract and set TESSERACT_CMD."
                    .to_string(),
            ),
            psm_used: None,
        };
    };

    let processed = preprocess(image, mode);

    let sequence = match mode {
        OcrMode::Basic => BASIC_PSM_SEQUENCE,
        OcrMode::Enhanced => ENHANCED_PSM_SEQUENCE,
    };

    let mut best: Option<(String, f32, u8)> = None;
    let mut failures = Vec::new();

    for &psm in sequence {
        match run_config(&processed, &engine_path, psm) {
            Ok((text, conf)) => {
                let replace = match &best {
                    None => true,
                    Some((best_text, best_conf, _)) => {
                        compare_ocr_outputs((&text, conf), (best_text, *best_conf))
                            == std::cmp::Ordering::Greater
                    }
                };
                let good_enough =
                    text.len() > GOOD_ENOUGH_TEXT_LEN && conf > GOOD_ENOUGH_CONFIDENCE;
                if replace {
                    best = Some((text, conf, psm));
                }
                if good_enough {
                    debug!(psm, "early exit: result clears the good-enough bar");
                    break;
                }
            }
            Err(err) => {
                warn!(psm, %err, "config attempt failed; skipping");
                failures.push(format!("psm {psm}: {err}"));
            }
        }
    }

    let timing_ms = start.elapsed().as_millis() as u64;
    match best {
        Some((text, conf, psm)) => {
            info!(
                text_len = text.len(),
                confidence = conf,
                psm,
                timing_ms,
                "OCR run complete"
            );
            OcrVariantResult {
                name: name.to_string(),
                text,
                confidence: (conf / 100.0).clamp(0.0, 1.0),
                timing_ms,
                engine_found: true,
                engine_path: Some(engine_path.display().to_string()),
                mode,
                error: None,
                psm_used: Some(psm),
            }
        }
        None => OcrVariantResult {
            name: name.to_string(),
            text: String::new(),
            confidence: 0.0,
            timing_ms,
            engine_found: true,
            engine_path: Some(engine_path.display().to_string()),
            mode,
            error: Some(format!("every config attempt failed: {}", failures.join("; "))),
            psm_used: None,
        },
    }
}

/// Run the ablation comparison: OCR over a fixed set of named
/// (image, mode) combinations, measuring what rectification buys.
///
/// The best variant is chosen by the shared longer-text-then-confidence
/// order and always reported by name, even when every variant scores
/// poorly.
#[instrument(skip_all)]
pub fn run_variants(
    original: &DynamicImage,
    rectified: &DynamicImage,
    locator: &EngineLocator,
) -> (Vec<OcrVariantResult>, Option<String>) {
    let combos: [(&str, &DynamicImage, OcrMode); 3] = [
        ("rectified_enhanced", rectified, OcrMode::Enhanced),
        ("rectified_basic", rectified, OcrMode::Basic),
        ("original_enhanced", original, OcrMode::Enhanced),
    ];

    let mut variants = Vec::with_capacity(combos.len());
    for (name, image, mode) in combos {
        variants.push(run_named(name, image, mode, locator));
    }

    let best = select_best(&variants).map(|v| v.name.clone());
    info!(?best, "ablation complete");
    (variants, best)
}

/// The best variant under the shared comparator. Earlier variants win ties.
pub fn select_best(variants: &[OcrVariantResult]) -> Option<&OcrVariantResult> {
    variants.iter().reduce(|best, candidate| {
        if candidate.better_than(best) {
            candidate
        } else {
            best
        }
    })
}

// -- Tests --------------------------------------------------------------------
