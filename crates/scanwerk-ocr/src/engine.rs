// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// External engine invocation — runs the discovered Tesseract executable on
// a preprocessed image and parses its TSV token output.

use std::path::Path;
use std::process::Command;

use image::GrayImage;
use scanwerk_core::error::{Result, ScanwerkError};
use tracing::{debug, instrument};

/// Recognition model selector passed to every invocation (LSTM engine).
const OEM: &str = "1";

/// TSV token rows carry twelve tab-separated fields; the last two are the
/// token confidence and text.
const TSV_FIELD_COUNT: usize = 12;
const TSV_CONF_INDEX: usize = 10;
const TSV_TEXT_INDEX: usize = 11;

/// Run the engine once with a specific page-segmentation mode.
///
/// The image is written to a temporary PNG, the engine invoked as
/// `<engine> <input> stdout tsv --oem 1 --psm <n>`, and its TSV output
/// reduced to `(space-joined text, mean token confidence)`. Confidence is
/// on the engine's 0–100 scale; rows reporting −1 (non-text regions) are
/// excluded from both text and the average.
#[instrument(skip(image), fields(engine = %engine_path.display(), psm))]
pub fn run_config(image: &GrayImage, engine_path: &Path, psm: u8) -> Result<(String, f32)> {
    let workdir = tempfile::tempdir()?;
    let input_path = workdir.path().join("page.png");
    image
        .save(&input_path)
        .map_err(|err| ScanwerkError::OcrError(format!("failed to write engine input: {err}")))?;

    let output = Command::new(engine_path)
        .arg(&input_path)
        .arg("stdout")
        .arg("--oem")
        .arg(OEM)
        .arg("--psm")
        .arg(psm.to_string())
        .arg("tsv")
        .output()
        .map_err(|err| {
            ScanwerkError::OcrError(format!(
                "failed to launch {}: {err}",
                engine_path.display()
            ))
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ScanwerkError::OcrError(format!(
            "engine exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }

    let (text, confidence) = parse_tsv(&String::from_utf8_lossy(&output.stdout));
    debug!(
        psm,
        text_len = text.len(),
        confidence,
        "engine run complete"
    );
    Ok((text, confidence))
}

/// Reduce the engine's TSV output to recognized text and mean confidence.
///
/// The header row is skipped; only rows with a valid (≥ 0) confidence and
/// non-empty token text contribute. An output with no such rows yields an
/// empty string and zero confidence.
pub fn parse_tsv(tsv: &str) -> (String, f32) {
    let mut tokens = Vec::new();
    let mut confidences = Vec::new();

    for line in tsv.lines().skip(1) {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < TSV_FIELD_COUNT {
            continue;
        }
        let Ok(conf) = fields[TSV_CONF_INDEX].parse::<f32>() else {
            continue;
        };
        let text = fields[TSV_TEXT_INDEX].trim();
        if conf < 0.0 || text.is_empty() {
            continue;
        }
        tokens.push(text);
        confidences.push(conf);
    }

    let full_text = tokens.join(" ");
    let avg_conf = if confidences.is_empty() {
        0.0
    } else {
        confidences.iter().sum::<f32>() / confidences.len() as f32
    };

    (full_text, avg_conf)
}

// -- Tests --------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    fn row(conf: &str, text: &str) -> String {
        format!("5\t1\t1\t1\t1\t1\t10\t10\t40\t12\t{conf}\t{text}")
    }

    #[test]
    fn parses_tokens_and_averages_confidence() {
        let tsv = format!(
            "{HEADER}\n{}\n{}\n{}",
            row("96.5", "Invoice"),
            row("88.5", "No."),
            row("70.0", "1234")
        );
        let (text, conf) = parse_tsv(&tsv);
        assert_eq!(text, "Invoice No. 1234");
        assert!((conf - 85.0).abs() < 1e-3);
    }

    #[test]
    fn skips_non_text_rows() {
        // Structural rows report -1 confidence and empty text.
        let tsv = format!(
            "{HEADER}\n{}\n{}\n{}",
            row("-1", ""),
            row("92.0", "hello"),
            row("-1", "")
        );
        let (text, conf) = parse_tsv(&tsv);
        assert_eq!(text, "hello");
        assert!((conf - 92.0).abs() < 1e-3);
    }

    #[test]
    fn skips_whitespace_only_tokens() {
        let tsv = format!("{HEADER}\n{}\n{}", row("95.0", "   "), row("80.0", "word"));
        let (text, conf) = parse_tsv(&tsv);
        assert_eq!(text, "word");
        assert!((conf - 80.0).abs() < 1e-3);
    }

    #[test]
    fn empty_output_yields_empty_result() {
        let (text, conf) = parse_tsv(HEADER);
        assert!(text.is_empty());
        assert_eq!(conf, 0.0);
        let (text, conf) = parse_tsv("");
        assert!(text.is_empty());
        assert_eq!(conf, 0.0);
    }

    #[test]
    fn malformed_rows_are_ignored() {
        let tsv = format!("{HEADER}\nnot a tsv row\n{}", row("75.0", "ok"));
        let (text, conf) = parse_tsv(&tsv);
        assert_eq!(text, "ok");
        assert!((conf - 75.0).abs() < 1e-3);
    }

    #[test]
    fn missing_engine_is_a_launch_error() {
        let img = GrayImage::from_pixel(8, 8, image::Luma([255u8]));
        let result = run_config(&img, Path::new("/nonexistent/engine-binary"), 6);
        assert!(matches!(result, Err(ScanwerkError::OcrError(_))));
    }
}
