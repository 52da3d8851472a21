//! Grid detection: digit-only text boxes grouped into rows and cropped into cells.

use image::DynamicImage;
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{Result, ScanError};
use crate::models::config::SegmentationConfig;
use crate::models::grid::{LotteryGrid, NormalizedRect, NumberPosition};
use crate::models::roi::Roi;
use crate::models::ticket::REGULAR_COUNT;
use crate::services::ocr::parser::parse_grid_candidate;
use crate::services::ocr::{ImageNormalizer, RecognitionOptions, RecognizedText, TextRecognizer};

/// Group text boxes into rows, top to bottom, each row left to right.
///
/// Boxes are sorted by vertical center (horizontal center, then text, break
/// ties) so the result does not depend on input order. A box joins the open
/// row when its vertical center is within `tolerance` of that row's first
/// box; otherwise it opens a new row.
pub fn group_rows(mut items: Vec<RecognizedText>, tolerance: f64) -> Vec<Vec<RecognizedText>> {
    items.sort_by(|a, b| {
        a.bounding_box
            .center_y()
            .total_cmp(&b.bounding_box.center_y())
            .then_with(|| a.bounding_box.center_x().total_cmp(&b.bounding_box.center_x()))
            .then_with(|| a.text.cmp(&b.text))
    });

    let mut rows: Vec<Vec<RecognizedText>> = Vec::new();
    for item in items {
        let joins_last = rows.last().is_some_and(|row| {
            (item.bounding_box.center_y() - row[0].bounding_box.center_y()).abs() < tolerance
        });

        if joins_last {
            if let Some(row) = rows.last_mut() {
                row.push(item);
            }
        } else {
            rows.push(vec![item]);
        }
    }

    for row in &mut rows {
        row.sort_by(|a, b| {
            a.bounding_box
                .center_x()
                .total_cmp(&b.bounding_box.center_x())
                .then_with(|| a.text.cmp(&b.text))
        });
    }

    rows
}

/// Builds a [`LotteryGrid`] from a ticket image
pub struct CellSegmenter {
    recognizer: Arc<dyn TextRecognizer>,
    normalizer: ImageNormalizer,
    config: SegmentationConfig,
}

impl CellSegmenter {
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

    /// Detect the number grid in `image`.
    ///
    /// Fails with [`ScanError::Segmentation`] when fewer than `min_rows`
    /// rows of digit-only text are found.
    pub async fn segment(&self, image: &DynamicImage) -> Result<LotteryGrid> {
        let normalized = {
            let normalizer = self.normalizer.clone();
            let source = image.clone();
            tokio::task::spawn_blocking(move || normalizer.normalize(&source))
                .await
                .map_err(|e| ScanError::Segmentation(format!("normalization task failed: {}", e)))?
        };

        let options = RecognitionOptions::lines(self.config.min_text_height);
        let recognized = self
            .recognizer
            .recognize(&normalized, &options)
            .await
            .map_err(|e| ScanError::Segmentation(format!("text recognition failed: {}", e)))?;

        let candidates: Vec<RecognizedText> = recognized
            .into_iter()
            .filter(|t| parse_grid_candidate(&t.text).is_some())
            .collect();

        let rows = group_rows(candidates, self.config.row_tolerance);
        debug!(rows = rows.len(), "grouped digit candidates into rows");

        if rows.len() < self.config.min_rows {
            return Err(ScanError::Segmentation(format!(
                "found {} rows of numbers, need at least {}",
                rows.len(),
                self.config.min_rows
            )));
        }

        let grid = self.build_grid(image, &rows);
        info!(
            rows = grid.row_count,
            cells = grid.len(),
            "segmented ticket grid"
        );
        Ok(grid)
    }

    /// Assign grid coordinates and crop each cell out of the source image
    pub fn build_grid(&self, image: &DynamicImage, rows: &[Vec<RecognizedText>]) -> LotteryGrid {
        let slots: Vec<(usize, usize, NormalizedRect)> = rows
            .iter()
            .enumerate()
            .flat_map(|(row_index, row)| {
                // Column 5 is the special number; anything further right is dropped
                row.iter()
                    .take(REGULAR_COUNT + 1)
                    .enumerate()
                    .map(move |(column, text)| (row_index, column, text.bounding_box))
            })
            .collect();

        let padding = self.config.cell_padding;
        let (width, height) = (image.width(), image.height());

        let positions: BTreeSet<NumberPosition> = slots
            .par_iter()
            .map(|&(row, column, bounding_box)| {
                let roi = Roi::from_normalized(&bounding_box.expand(padding), width, height);
                let crop = roi.crop(image);
                NumberPosition::new(row, column, column >= REGULAR_COUNT, crop, bounding_box)
            })
            .collect::<Vec<_>>()
            .into_iter()
            .collect();

        LotteryGrid::new(positions)
    }
}
