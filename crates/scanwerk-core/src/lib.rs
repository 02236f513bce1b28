// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanwerk — Core types and error definitions shared across all crates.

pub mod config;
pub mod error;
pub mod geometry;
pub mod types;

pub use config::IntakeOptions;
pub use error::ScanwerkError;
pub use geometry::{Point2D, Quadrilateral};
pub use types::*;
