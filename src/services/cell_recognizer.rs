//! Single-cell number recognition and the concurrent per-cell fan-out.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::models::config::RecognitionConfig;
use crate::models::game::GameConstraint;
use crate::models::grid::{CellReading, LotteryGrid, NumberPosition, ScanResult};
use crate::services::ocr::parser::normalize_to_int;
use crate::services::ocr::{ImageNormalizer, RecognitionOptions, TextRecognizer};

/// Reads one number from a cell crop, retrying over image variants and
/// alternate OCR candidates until a value fits the game's range.
pub struct CellRecognizer {
    recognizer: Arc<dyn TextRecognizer>,
    normalizer: ImageNormalizer,
    config: RecognitionConfig,
}

impl CellRecognizer {
    pub fn new(
        recognizer: Arc<dyn TextRecognizer>,
        normalizer: ImageNormalizer,
        config: RecognitionConfig,
    ) -> Self {
        Self {
            recognizer,
            normalizer,
            config,
        }
    }

    /// Recognize the number in `position` under `constraint`
    pub async fn recognize(
        &self,
        position: &NumberPosition,
        constraint: GameConstraint,
    ) -> CellReading {
        let variants = {
            let normalizer = self.normalizer.clone();
            let cell = Arc::clone(&position.image);
            match tokio::task::spawn_blocking(move || normalizer.digit_variants(&cell)).await {
                Ok(variants) => variants,
                Err(e) => {
                    warn!(row = position.row, column = position.column, "variant task failed: {}", e);
                    return CellReading::Unreadable;
                }
            }
        };

        let options = RecognitionOptions::digits(self.config.min_text_height);

        for (variant_index, variant) in variants.iter().enumerate() {
            let observations = match self.recognizer.recognize(variant, &options).await {
                Ok(observations) => observations,
                Err(e) => {
                    debug!(
                        row = position.row,
                        column = position.column,
                        variant = variant_index,
                        "recognition failed: {}",
                        e
                    );
                    continue;
                }
            };

            let Some(top) = observations.first() else {
                continue;
            };

            for candidate in top.candidates(self.config.max_alternates) {
                if let Some(value) = accept(candidate, position.is_special, constraint) {
                    debug!(
                        row = position.row,
                        column = position.column,
                        variant = variant_index,
                        value,
                        "cell accepted"
                    );
                    return CellReading::Accepted(value);
                }
            }
        }

        debug!(row = position.row, column = position.column, "cell unreadable");
        CellReading::Unreadable
    }

    /// Recognize every cell of `grid` concurrently and wait for all of them.
    ///
    /// Each task writes its reading into a shared map under a lock; the
    /// result holds exactly one entry per position.
    pub async fn scan_grid(self: &Arc<Self>, grid: &LotteryGrid, constraint: GameConstraint) -> ScanResult {
        let readings: Arc<Mutex<HashMap<NumberPosition, CellReading>>> =
            Arc::new(Mutex::new(HashMap::with_capacity(grid.len())));

        let mut tasks = JoinSet::new();
        for position in grid.positions.iter().cloned() {
            let recognizer = Arc::clone(self);
            let readings = Arc::clone(&readings);
            tasks.spawn(async move {
                let reading = recognizer.recognize(&position, constraint).await;
                readings.lock().insert(position, reading);
            });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                warn!("cell recognition task failed: {}", e);
            }
        }

        let readings = std::mem::take(&mut *readings.lock());
        ScanResult::from(readings)
    }
}

/// Validate one OCR candidate against the cell's range
fn accept(candidate: &str, is_special: bool, constraint: GameConstraint) -> Option<i32> {
    let value = normalize_to_int(candidate, is_special)?;
    constraint.accepts(value, is_special).then_some(value)
}
