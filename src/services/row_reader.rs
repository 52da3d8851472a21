//! Whole-line fallback OCR for tickets too noisy to segment into cells.

use image::DynamicImage;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{Result, ScanError};
use crate::models::config::SegmentationConfig;
use crate::models::game::GameConstraint;
use crate::models::ticket::{TicketRow, REGULAR_COUNT, UNREADABLE};
use crate::services::ocr::parser::{is_number_line, normalize_to_int, split_tokens};
use crate::services::ocr::{ImageNormalizer, RecognitionOptions, RecognizedText, TextRecognizer};
use crate::services::segmenter::group_rows;

/// Reads ticket rows from recognized text lines rather than cells
pub struct RowReader {
    recognizer: Arc<dyn TextRecognizer>,
    normalizer: ImageNormalizer,
    config: SegmentationConfig,
}

impl RowReader {
    pub fn new(
        recognizer: Arc<dyn TextRecognizer>,
        normalizer: ImageNormalizer,
        config: SegmentationConfig,
    ) -> Self {
        Self {
            recognizer,
            normalizer,
            config,
        }
    }

    /// Recognize lines of numbers in `image` and turn them into rows.
    ///
    /// Values outside `constraint` are kept as unreadable.
    pub async fn read_rows(
        &self,
        image: &DynamicImage,
        constraint: GameConstraint,
    ) -> Result<Vec<TicketRow>> {
        let normalized = {
            let normalizer = self.normalizer.clone();
            let source = image.clone();
            tokio::task::spawn_blocking(move || normalizer.normalize(&source))
                .await
                .map_err(|e| ScanError::Recognition(format!("normalization task failed: {}", e)))?
        };

        let lines = self
            .recognizer
            .recognize(&normalized, &RecognitionOptions::lines(self.config.min_text_height))
            .await?;

        let rows = lines_to_rows(lines, self.config.row_tolerance, constraint);
        info!(rows = rows.len(), "full-row OCR finished");
        Ok(rows)
    }
}

/// Group number-like lines into rows and parse their tokens
pub fn lines_to_rows(
    lines: Vec<RecognizedText>,
    tolerance: f64,
    constraint: GameConstraint,
) -> Vec<TicketRow> {
    let candidates: Vec<RecognizedText> = lines
        .into_iter()
        .filter(|line| is_number_line(&line.text))
        .collect();

    group_rows(candidates, tolerance)
        .into_iter()
        .filter_map(|row| {
            let merged = row
                .iter()
                .map(|t| t.text.as_str())
                .collect::<Vec<_>>()
                .join(" ");

            let values: Vec<i32> = split_tokens(&merged)
                .into_iter()
                .filter_map(|token| normalize_to_int(token, false))
                .collect();

            if values.is_empty() {
                debug!(text = %merged, "dropping row without numbers");
                return None;
            }

            let numbers: Vec<i32> = values
                .iter()
                .take(REGULAR_COUNT)
                .map(|&v| validated(v, false, constraint))
                .collect();
            let special = values
                .get(REGULAR_COUNT)
                .map(|&v| validated(v, true, constraint));

            Some(TicketRow::from_parts(&numbers, special))
        })
        .collect()
}

fn validated(value: i32, is_special: bool, constraint: GameConstraint) -> i32 {
    if constraint.accepts(value, is_special) {
        value
    } else {
        UNREADABLE
    }
}
