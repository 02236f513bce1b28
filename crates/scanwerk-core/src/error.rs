// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Scanwerk.

use thiserror::Error;

/// Top-level error type for all Scanwerk operations.
///
/// Only malformed *input* becomes an error at the pipeline boundary:
/// undecodable image bytes and malformed manual-corner payloads. An OCR
/// engine that cannot be found, a boundary that cannot be detected, or a
/// warp that degenerates are all ordinary result values, not errors.
#[derive(Debug, Error)]
pub enum ScanwerkError {
    // -- Input validation --
    #[error("image processing failed: {0}")]
    ImageError(String),

    #[error("invalid corner payload: {0}")]
    InvalidCorners(String),

    // -- OCR plumbing --
    #[error("OCR failed: {0}")]
    OcrError(String),

    // -- I/O and serialization --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ScanwerkError>;
