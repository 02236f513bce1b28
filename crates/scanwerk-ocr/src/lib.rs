// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// scanwerk-ocr — Text recognition for the Scanwerk intake engine.
//
// Discovers an external recognition engine through an ordered fallback
// search, preprocesses images for recognition, invokes the engine under
// multiple page-segmentation configurations, and selects the best result.
// Engine unavailability is an ordinary, reportable state — common on fresh
// installs — never an error.

pub mod ablation;
pub mod engine;
pub mod locate;
pub mod preprocess;

pub use ablation::{run, run_variants};
pub use locate::{EngineLocator, EnvironmentProbe, SystemProbe};
pub use preprocess::preprocess;
