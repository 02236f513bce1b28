// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// End-to-end intake pipeline tests against synthetic captures and a
// controlled (engine-free) environment.

use std::path::{Path, PathBuf};
use std::sync::Once;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use scanwerk_core::config::IntakeOptions;
use scanwerk_core::error::ScanwerkError;
use scanwerk_core::types::OcrMode;
use scanwerk_intake::IntakePipeline;
use scanwerk_ocr::{EngineLocator, EnvironmentProbe};
use serde_json::json;

static LOG_INIT: Once = Once::new();

fn init_logging() {
    LOG_INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "warn".into()),
            )
            .try_init();
    });
}

/// An environment with no OCR engine installed anywhere.
struct BareEnvironment;

impl EnvironmentProbe for BareEnvironment {
    fn env_var(&self, _name: &str) -> Option<String> {
        None
    }
    fn file_exists(&self, _path: &Path) -> bool {
        false
    }
    fn path_entries(&self) -> Vec<PathBuf> {
        Vec::new()
    }
}

fn pipeline() -> IntakePipeline {
    init_logging();
    IntakePipeline::with_locator(EngineLocator::with_probe(Box::new(BareEnvironment)))
}

/// A bright page on a dark background, encoded as PNG upload bytes.
fn synthetic_capture() -> Vec<u8> {
    let mut img = RgbImage::from_pixel(400, 500, Rgb([25u8, 25, 25]));
    for y in 50..440 {
        for x in 40..360 {
            img.put_pixel(x, y, Rgb([235u8, 235, 235]));
        }
    }
    encode_png(DynamicImage::ImageRgb8(img))
}

fn blank_capture() -> Vec<u8> {
    let img = RgbImage::from_pixel(300, 400, Rgb([128u8, 128, 128]));
    encode_png(DynamicImage::ImageRgb8(img))
}

fn encode_png(image: DynamicImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut std::io::Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

#[test]
fn full_pipeline_on_clean_capture() {
    let report = pipeline()
        .process(&synthetic_capture(), &IntakeOptions::default())
        .expect("well-formed input must not error");

    assert!(report.boundary.found);
    assert!(report.boundary.confidence >= 0.8);
    assert!(report.warp_succeeded);

    // OCR degrades to the not-found outcome in an engine-free environment;
    // the request as a whole still succeeds.
    assert!(!report.ocr.engine_found);
    assert!(report.ocr.text.is_empty());
    assert_eq!(report.ocr.confidence, 0.0);

    // Previews are on by default.
    let preview = report.preview.expect("preview requested by default");
    assert!(preview.data_url.starts_with("data:image/jpeg;base64,"));
    assert!(preview.is_scanned);
    let original = report.original_preview.unwrap();
    assert_eq!((original.width, original.height), (400, 500));
    assert!(!original.is_scanned);
}

#[test]
fn blank_capture_degrades_without_error() {
    let report = pipeline()
        .process(&blank_capture(), &IntakeOptions::default())
        .expect("a featureless frame is still a successful request");

    assert!(!report.boundary.found);
    assert_eq!(report.boundary.confidence, 0.0);
    assert!(!report.warp_succeeded);
    // The low boundary confidence surfaces as a cropping issue.
    assert!(report.quality.issues.contains(&"cropping_issue".to_string()));
}

#[test]
fn undecodable_upload_is_rejected() {
    let result = pipeline().process(b"not an image at all", &IntakeOptions::default());
    assert!(matches!(result, Err(ScanwerkError::ImageError(_))));
}

#[test]
fn manual_corners_override_detection() {
    let options = IntakeOptions {
        manual_corners: Some(json!([
            {"x": 100.0, "y": 100.0},
            {"x": 300.0, "y": 100.0},
            {"x": 300.0, "y": 400.0},
            {"x": 100.0, "y": 400.0},
        ])),
        ..IntakeOptions::default()
    };

    // Even on a blank frame (nothing detectable), manual corners drive a
    // successful warp sized by the supplied quadrilateral.
    let report = pipeline().process(&blank_capture(), &options).unwrap();
    assert!(report.warp_succeeded);
    let preview = report.preview.unwrap();
    assert_eq!((preview.width, preview.height), (200, 300));
}

#[test]
fn malformed_manual_corners_are_a_validation_error() {
    let options = IntakeOptions {
        manual_corners: Some(json!([{"x": 1, "y": 2}])),
        ..IntakeOptions::default()
    };
    let result = pipeline().process(&synthetic_capture(), &options);
    assert!(matches!(result, Err(ScanwerkError::InvalidCorners(_))));
}

#[test]
fn ablation_reports_all_variants_and_a_best_name() {
    let options = IntakeOptions {
        ablation: true,
        ocr_mode: OcrMode::Basic,
        ..IntakeOptions::default()
    };
    let report = pipeline().process(&synthetic_capture(), &options).unwrap();

    assert_eq!(report.variants.len(), 3);
    assert!(report.best_variant.is_some());
    // Without an engine every variant is the not-found outcome, and none
    // of them is dropped.
    assert!(report.variants.iter().all(|v| !v.engine_found));
}

#[test]
fn debug_overlays_are_generated_on_request() {
    let options = IntakeOptions {
        debug_overlays: true,
        return_preview: false,
        ..IntakeOptions::default()
    };
    let report = pipeline().process(&synthetic_capture(), &options).unwrap();

    assert!(report.preview.is_none());
    let overlays = report.overlays.expect("overlays requested");
    assert!(overlays.glare_overlay.is_some());
    assert!(overlays.edge_overlay.is_some());
}

#[test]
fn report_serializes_to_json() {
    let report = pipeline()
        .process(&synthetic_capture(), &IntakeOptions::default())
        .unwrap();

    let value = serde_json::to_value(&report).unwrap();
    assert_eq!(value["boundary"]["found"], json!(true));
    assert_eq!(value["ocr"]["engine_found"], json!(false));
    assert!(value["quality"]["score"].is_u64());
}
