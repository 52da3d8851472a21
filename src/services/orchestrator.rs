//! Tier sequencing: local recognition first, then the cloud vision service
//! without and, when a row count is known, with a row-count hint.

use chrono::{DateTime, Local};
use image::DynamicImage;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{Result, ScanError};
use crate::models::config::{LocalStrategy, ScannerConfig};
use crate::models::game::GameConstraint;
use crate::models::grid::LotteryGrid;
use crate::models::roi::CropStrategy;
use crate::models::ticket::{CanonicalTicket, TicketRow, REGULAR_COUNT};
use crate::services::cell_recognizer::CellRecognizer;
use crate::services::cloud_vision::VisionExtractor;
use crate::services::game_catalog::GameCatalog;
use crate::services::ocr::{ImageNormalizer, TextRecognizer};
use crate::services::reconstructor::reconstruct;
use crate::services::row_reader::RowReader;
use crate::services::segmenter::CellSegmenter;

/// Cancellation flag for one scan; clones observe the same flag.
///
/// Each scan takes its own signal, so stopping one never affects the next.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once stopped
    pub fn check(&self) -> Result<()> {
        if self.is_stopped() {
            Err(ScanError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Tier that produced a set of rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScanSource {
    Grid,
    Rows,
    Cloud,
    CloudHinted,
}

impl ScanSource {
    /// Tag written after `Ticket:` in the canonical string
    pub fn tag(&self) -> &'static str {
        match self {
            ScanSource::Grid => "grid",
            ScanSource::Rows => "rows",
            ScanSource::Cloud => "cloud",
            ScanSource::CloudHinted => "cloud-hinted",
        }
    }
}

impl fmt::Display for ScanSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Rows from the tier that won, plus where they came from
#[derive(Debug, Clone, Serialize)]
pub struct ScanOutcome {
    pub rows: Vec<TicketRow>,
    pub source: ScanSource,
    /// Game the local tier settled on; cloud tiers leave this unset
    pub game: Option<GameConstraint>,
    pub scanned_at: DateTime<Local>,
}

impl ScanOutcome {
    pub fn new(rows: Vec<TicketRow>, source: ScanSource, game: Option<GameConstraint>) -> Self {
        Self {
            rows,
            source,
            game,
            scanned_at: Local::now(),
        }
    }

    pub fn to_canonical(&self) -> CanonicalTicket {
        CanonicalTicket::new(self.rows.clone(), self.source.tag())
    }
}

/// Local yield is good enough with five regular numbers or one special
pub fn is_sufficient(rows: &[TicketRow]) -> bool {
    let regular: usize = rows.iter().map(TicketRow::recovered_regular).sum();
    let specials = rows.iter().filter(|r| r.has_special()).count();
    regular >= REGULAR_COUNT || specials >= 1
}

fn observed_values(rows: &[TicketRow]) -> (Vec<i32>, Vec<i32>) {
    let numbers = rows.iter().flat_map(|r| r.numbers).collect();
    let specials = rows.iter().map(|r| r.special).collect();
    (numbers, specials)
}

enum LocalYield {
    Sufficient(ScanOutcome),
    Insufficient,
}

pub struct ExtractionOrchestrator {
    segmenter: CellSegmenter,
    cells: Arc<CellRecognizer>,
    row_reader: RowReader,
    vision: Arc<dyn VisionExtractor>,
    catalog: GameCatalog,
    strategy: LocalStrategy,
    crop: CropStrategy,
}

impl ExtractionOrchestrator {
    pub fn new(
        recognizer: Arc<dyn TextRecognizer>,
        vision: Arc<dyn VisionExtractor>,
        config: &ScannerConfig,
    ) -> Self {
        let normalizer = ImageNormalizer::new(config.preprocessing.clone());
        let catalog = GameCatalog::with_priority(config.games.priority.as_slice())
            .with_default_game(&config.games.default_game);

        Self {
            segmenter: CellSegmenter::new(
                Arc::clone(&recognizer),
                normalizer.clone(),
                config.segmentation.clone(),
            ),
            cells: Arc::new(CellRecognizer::new(
                Arc::clone(&recognizer),
                normalizer.clone(),
                config.recognition.clone(),
            )),
            row_reader: RowReader::new(recognizer, normalizer, config.segmentation.clone()),
            vision,
            catalog,
            strategy: config.local_strategy,
            crop: config.crop,
        }
    }

    /// Run the tier chain on `image`.
    ///
    /// `row_hint` enables the hinted cloud tier. When every tier fails the
    /// error of the last one attempted is returned. `stop` cancels this
    /// scan only.
    pub async fn extract(
        &self,
        image: &DynamicImage,
        row_hint: Option<usize>,
        stop: &StopSignal,
    ) -> Result<ScanOutcome> {
        let image = self.crop.apply(image);
        self.run(&image, row_hint, stop).await
    }

    /// Ask the vision service how many rows the ticket has.
    ///
    /// Failures are logged and yield `None`.
    pub async fn infer_row_count(&self, image: &DynamicImage, stop: &StopSignal) -> Option<usize> {
        let image = self.crop.apply(image);
        self.count_rows(&image, stop).await
    }

    /// Infer the row count first, then run the tier chain with it as the hint
    pub async fn extract_with_row_count(
        &self,
        image: &DynamicImage,
        stop: &StopSignal,
    ) -> Result<ScanOutcome> {
        let image = self.crop.apply(image);
        let hint = self.count_rows(&image, stop).await;
        stop.check()?;
        self.run(&image, hint, stop).await
    }

    async fn count_rows(&self, image: &DynamicImage, stop: &StopSignal) -> Option<usize> {
        if stop.is_stopped() {
            return None;
        }

        match self.vision.count_rows(image).await {
            Ok(0) => {
                warn!("vision service counted zero rows, ignoring");
                None
            }
            Ok(count) => {
                info!(count, "inferred row count");
                Some(count)
            }
            Err(e) => {
                warn!("row count inference failed: {}", e);
                None
            }
        }
    }

    async fn run(
        &self,
        image: &DynamicImage,
        row_hint: Option<usize>,
        stop: &StopSignal,
    ) -> Result<ScanOutcome> {
        stop.check()?;

        let local = match self.strategy {
            LocalStrategy::Grid => self.grid_tier(image, stop).await,
            LocalStrategy::FullRow => self.row_tier(image, stop).await,
        };

        match local {
            Ok(LocalYield::Sufficient(outcome)) => return Ok(outcome),
            Ok(LocalYield::Insufficient) => {
                info!(strategy = ?self.strategy, "local yield insufficient, falling back to cloud")
            }
            Err(ScanError::Cancelled) => return Err(ScanError::Cancelled),
            Err(e) => warn!(strategy = ?self.strategy, "local tier failed: {}", e),
        }

        self.cloud_tiers(image, row_hint, stop).await
    }

    async fn grid_tier(&self, image: &DynamicImage, stop: &StopSignal) -> Result<LocalYield> {
        let assumed = self.catalog.default_game();
        let grid = self.segmenter.segment(image).await?;

        stop.check()?;
        let rows = self.scan_grid(&grid, assumed).await;
        if !is_sufficient(&rows) {
            return Ok(LocalYield::Insufficient);
        }

        let (numbers, specials) = observed_values(&rows);
        let inferred = self.catalog.infer_game(&numbers, &specials);
        if inferred == assumed {
            return Ok(LocalYield::Sufficient(ScanOutcome::new(
                rows,
                ScanSource::Grid,
                Some(assumed),
            )));
        }

        info!(
            from = assumed.game_id,
            to = inferred.game_id,
            "game differs from assumed, re-scanning grid"
        );
        stop.check()?;
        let rows = self.scan_grid(&grid, inferred).await;
        Ok(LocalYield::Sufficient(ScanOutcome::new(
            rows,
            ScanSource::Grid,
            Some(inferred),
        )))
    }

    async fn scan_grid(&self, grid: &LotteryGrid, constraint: GameConstraint) -> Vec<TicketRow> {
        let scan = self.cells.scan_grid(grid, constraint).await;
        let rows = reconstruct(grid, &scan);
        info!(
            game = constraint.game_id,
            cells = scan.len(),
            rows = rows.len(),
            "grid scan finished"
        );
        rows
    }

    async fn row_tier(&self, image: &DynamicImage, stop: &StopSignal) -> Result<LocalYield> {
        let assumed = self.catalog.default_game();

        stop.check()?;
        let rows = self.row_reader.read_rows(image, assumed).await?;
        if !is_sufficient(&rows) {
            return Ok(LocalYield::Insufficient);
        }

        let (numbers, specials) = observed_values(&rows);
        let inferred = self.catalog.infer_game(&numbers, &specials);
        if inferred == assumed {
            return Ok(LocalYield::Sufficient(ScanOutcome::new(
                rows,
                ScanSource::Rows,
                Some(assumed),
            )));
        }

        info!(
            from = assumed.game_id,
            to = inferred.game_id,
            "game differs from assumed, re-reading rows"
        );
        stop.check()?;
        let rows = self.row_reader.read_rows(image, inferred).await?;
        Ok(LocalYield::Sufficient(ScanOutcome::new(
            rows,
            ScanSource::Rows,
            Some(inferred),
        )))
    }

    async fn cloud_tiers(
        &self,
        image: &DynamicImage,
        row_hint: Option<usize>,
        stop: &StopSignal,
    ) -> Result<ScanOutcome> {
        stop.check()?;
        info!("cloud tier without row hint");
        let unhinted = self.vision.extract(image, None).await;

        let (expected, unhinted) = match (row_hint, unhinted) {
            (None, result) => {
                return result.map(|rows| ScanOutcome::new(rows, ScanSource::Cloud, None));
            }
            (Some(expected), Ok(rows)) if rows.len() == expected => {
                return Ok(ScanOutcome::new(rows, ScanSource::Cloud, None));
            }
            (Some(expected), Ok(rows)) => {
                info!(expected, got = rows.len(), "row count mismatch, retrying with hint");
                (expected, Ok(rows))
            }
            (Some(expected), Err(e)) => {
                warn!("cloud tier without hint failed: {}", e);
                (expected, Err(e))
            }
        };

        stop.check()?;
        info!(expected, "cloud tier with row hint");
        match self.vision.extract(image, Some(expected)).await {
            Ok(rows) => Ok(ScanOutcome::new(rows, ScanSource::CloudHinted, None)),
            Err(e) => {
                warn!("cloud tier with hint failed: {}", e);
                // A mismatched answer beats none at all
                match unhinted {
                    Ok(rows) => Ok(ScanOutcome::new(rows, ScanSource::Cloud, None)),
                    Err(_) => Err(e),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::grid::NormalizedRect;
    use crate::services::ocr::{RecognitionOptions, RecognizedText};
    use async_trait::async_trait;
    use image::{Rgb, RgbImage};
    use std::sync::atomic::AtomicUsize;

    /// Lines for layout requests, a fixed string for every digit request
    struct FakeOcr {
        layout: Vec<RecognizedText>,
        cell_text: String,
        line_calls: AtomicUsize,
        digit_calls: AtomicUsize,
    }

    impl FakeOcr {
        fn new(layout: Vec<RecognizedText>, cell_text: &str) -> Arc<Self> {
            Arc::new(Self {
                layout,
                cell_text: cell_text.to_string(),
                line_calls: AtomicUsize::new(0),
                digit_calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl TextRecognizer for FakeOcr {
        async fn recognize(
            &self,
            _image: &DynamicImage,
            options: &RecognitionOptions,
        ) -> Result<Vec<RecognizedText>> {
            if options.vocabulary_hint.is_some() {
                self.digit_calls.fetch_add(1, Ordering::SeqCst);
                Ok(vec![RecognizedText::new(self.cell_text.clone(), NormalizedRect::default())])
            } else {
                self.line_calls.fetch_add(1, Ordering::SeqCst);
                Ok(self.layout.clone())
            }
        }
    }

    #[derive(Clone, Copy)]
    enum Reply {
        Rows(usize),
        Offline,
        Refused,
    }

    impl Reply {
        fn produce(self) -> Result<Vec<TicketRow>> {
            match self {
                Reply::Rows(n) => Ok(vec![TicketRow::from_parts(&[1, 2, 3, 4, 5], Some(6)); n]),
                Reply::Offline => Err(ScanError::Network("offline".to_string())),
                Reply::Refused => Err(ScanError::Refusal("no".to_string())),
            }
        }
    }

    struct FakeVision {
        unhinted: Reply,
        hinted: Reply,
        count: Option<usize>,
        unhinted_calls: AtomicUsize,
        hinted_calls: AtomicUsize,
        count_calls: AtomicUsize,
    }

    impl FakeVision {
        fn new(unhinted: Reply, hinted: Reply, count: Option<usize>) -> Arc<Self> {
            Arc::new(Self {
                unhinted,
                hinted,
                count,
                unhinted_calls: AtomicUsize::new(0),
                hinted_calls: AtomicUsize::new(0),
                count_calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> (usize, usize) {
            (
                self.unhinted_calls.load(Ordering::SeqCst),
                self.hinted_calls.load(Ordering::SeqCst),
            )
        }
    }

    #[async_trait]
    impl VisionExtractor for FakeVision {
        async fn extract(
            &self,
            _image: &DynamicImage,
            expected_rows: Option<usize>,
        ) -> Result<Vec<TicketRow>> {
            match expected_rows {
                None => {
                    self.unhinted_calls.fetch_add(1, Ordering::SeqCst);
                    self.unhinted.produce()
                }
                Some(_) => {
                    self.hinted_calls.fetch_add(1, Ordering::SeqCst);
                    self.hinted.produce()
                }
            }
        }

        async fn count_rows(&self, _image: &DynamicImage) -> Result<usize> {
            self.count_calls.fetch_add(1, Ordering::SeqCst);
            self.count
                .ok_or_else(|| ScanError::Parse("no count".to_string()))
        }
    }

    fn ticket_image() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(200, 100, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 200])
        }))
    }

    /// Two rows of six digit boxes
    fn grid_layout() -> Vec<RecognizedText> {
        let mut boxes = Vec::new();
        for y in [0.3, 0.6] {
            for col in 0..6 {
                let x = 0.1 + col as f64 * 0.1;
                boxes.push(RecognizedText::new(
                    format!("{}", col + 10),
                    NormalizedRect::new(x - 0.01, y - 0.01, 0.02, 0.02),
                ));
            }
        }
        boxes
    }

    fn orchestrator(
        ocr: Arc<FakeOcr>,
        vision: Arc<FakeVision>,
        config: &ScannerConfig,
    ) -> ExtractionOrchestrator {
        ExtractionOrchestrator::new(ocr, vision, config)
    }

    #[test]
    fn test_yield_thresholds() {
        let four = TicketRow::from_parts(&[1, 2, 3, 4, -1], None);
        assert!(!is_sufficient(&[four]));
        assert!(is_sufficient(&[four, TicketRow::from_parts(&[9], None)]));
        assert!(is_sufficient(&[TicketRow::from_parts(&[-1, -1], Some(3))]));
        assert!(!is_sufficient(&[TicketRow::from_parts(&[-1; 5], Some(-1))]));
        assert!(!is_sufficient(&[]));
    }

    #[test]
    fn test_stop_signal_shared_between_clones() {
        let signal = StopSignal::new();
        let handle = signal.clone();
        assert!(signal.check().is_ok());

        handle.stop();
        assert!(matches!(signal.check(), Err(ScanError::Cancelled)));

        signal.reset();
        assert!(!handle.is_stopped());
    }

    #[test]
    fn test_outcome_canonical_tag() {
        let outcome = ScanOutcome::new(
            vec![TicketRow::from_parts(&[1, 2, 3, 4, 5], Some(6))],
            ScanSource::CloudHinted,
            None,
        );
        assert_eq!(
            outcome.to_canonical().to_string(),
            "Lottery: 1 2 3 4 5 6 Ticket:cloud-hinted"
        );
    }

    #[tokio::test]
    async fn test_zero_yield_calls_cloud_once_without_hint() {
        let ocr = FakeOcr::new(grid_layout(), "??");
        let vision = FakeVision::new(Reply::Rows(2), Reply::Rows(2), Some(2));

        let outcome = orchestrator(ocr.clone(), vision.clone(), &ScannerConfig::default())
            .extract(&ticket_image(), None, &StopSignal::new())
            .await
            .unwrap();

        assert_eq!(outcome.source, ScanSource::Cloud);
        assert_eq!(outcome.rows.len(), 2);
        assert_eq!(vision.calls(), (1, 0));
        assert_eq!(vision.count_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_segmentation_failure_falls_through_to_cloud() {
        let ocr = FakeOcr::new(Vec::new(), "12");
        let vision = FakeVision::new(Reply::Rows(1), Reply::Offline, None);

        let outcome = orchestrator(ocr.clone(), vision.clone(), &ScannerConfig::default())
            .extract(&ticket_image(), None, &StopSignal::new())
            .await
            .unwrap();

        assert_eq!(outcome.source, ScanSource::Cloud);
        assert_eq!(ocr.digit_calls.load(Ordering::SeqCst), 0);
        assert_eq!(vision.calls(), (1, 0));
    }

    #[tokio::test]
    async fn test_rescan_when_inferred_game_differs() {
        // 26 fits Mega Millions regular cells but not its specials (max 25);
        // inference picks Powerball, whose specials go up to 26
        let ocr = FakeOcr::new(grid_layout(), "26");
        let vision = FakeVision::new(Reply::Offline, Reply::Offline, None);

        let outcome = orchestrator(ocr, vision.clone(), &ScannerConfig::default())
            .extract(&ticket_image(), None, &StopSignal::new())
            .await
            .unwrap();

        assert_eq!(outcome.source, ScanSource::Grid);
        assert_eq!(outcome.game.map(|g| g.game_id), Some("us_powerball"));
        assert_eq!(outcome.rows.len(), 2);
        for row in &outcome.rows {
            assert_eq!(row.numbers, [26; 5]);
            assert_eq!(row.special, 26);
        }
        assert_eq!(vision.calls(), (0, 0));
    }

    #[tokio::test]
    async fn test_no_rescan_when_game_matches() {
        // 70 only fits Mega Millions, the assumed game
        let ocr = FakeOcr::new(grid_layout(), "70");
        let vision = FakeVision::new(Reply::Offline, Reply::Offline, None);

        let outcome = orchestrator(ocr.clone(), vision, &ScannerConfig::default())
            .extract(&ticket_image(), None, &StopSignal::new())
            .await
            .unwrap();

        assert_eq!(outcome.game.map(|g| g.game_id), Some("us_mega_millions"));
        assert_eq!(outcome.rows[0].numbers, [70; 5]);
        assert_eq!(outcome.rows[0].special, -1);
        assert_eq!(ocr.line_calls.load(Ordering::SeqCst), 1);
        // 10 regular cells accepted first try, 2 specials rejected on all 3 variants
        assert_eq!(ocr.digit_calls.load(Ordering::SeqCst), 16);
    }

    #[tokio::test]
    async fn test_hint_mismatch_runs_hinted_tier() {
        let ocr = FakeOcr::new(grid_layout(), "??");
        let vision = FakeVision::new(Reply::Rows(2), Reply::Rows(3), None);

        let outcome = orchestrator(ocr, vision.clone(), &ScannerConfig::default())
            .extract(&ticket_image(), Some(3), &StopSignal::new())
            .await
            .unwrap();

        assert_eq!(outcome.source, ScanSource::CloudHinted);
        assert_eq!(outcome.rows.len(), 3);
        assert_eq!(vision.calls(), (1, 1));
    }

    #[tokio::test]
    async fn test_hint_match_skips_hinted_tier() {
        let ocr = FakeOcr::new(grid_layout(), "??");
        let vision = FakeVision::new(Reply::Rows(3), Reply::Rows(3), None);

        let outcome = orchestrator(ocr, vision.clone(), &ScannerConfig::default())
            .extract(&ticket_image(), Some(3), &StopSignal::new())
            .await
            .unwrap();

        assert_eq!(outcome.source, ScanSource::Cloud);
        assert_eq!(vision.calls(), (1, 0));
    }

    #[tokio::test]
    async fn test_exhaustion_returns_last_error() {
        let ocr = FakeOcr::new(Vec::new(), "??");
        let vision = FakeVision::new(Reply::Offline, Reply::Refused, None);

        let result = orchestrator(ocr, vision.clone(), &ScannerConfig::default())
            .extract(&ticket_image(), Some(2), &StopSignal::new())
            .await;

        assert!(matches!(result, Err(ScanError::Refusal(_))));
        assert_eq!(vision.calls(), (1, 1));
    }

    #[tokio::test]
    async fn test_exhaustion_without_hint_returns_cloud_error() {
        let ocr = FakeOcr::new(Vec::new(), "??");
        let vision = FakeVision::new(Reply::Offline, Reply::Refused, None);

        let result = orchestrator(ocr, vision.clone(), &ScannerConfig::default())
            .extract(&ticket_image(), None, &StopSignal::new())
            .await;

        assert!(matches!(result, Err(ScanError::Network(_))));
        assert_eq!(vision.calls(), (1, 0));
    }

    #[tokio::test]
    async fn test_failed_hinted_tier_keeps_mismatched_rows() {
        let ocr = FakeOcr::new(Vec::new(), "??");
        let vision = FakeVision::new(Reply::Rows(1), Reply::Offline, None);

        let outcome = orchestrator(ocr, vision.clone(), &ScannerConfig::default())
            .extract(&ticket_image(), Some(4), &StopSignal::new())
            .await
            .unwrap();

        assert_eq!(outcome.source, ScanSource::Cloud);
        assert_eq!(outcome.rows.len(), 1);
        assert_eq!(vision.calls(), (1, 1));
    }

    #[tokio::test]
    async fn test_cancelled_before_any_work() {
        let ocr = FakeOcr::new(grid_layout(), "12");
        let vision = FakeVision::new(Reply::Rows(1), Reply::Rows(1), Some(1));
        let orchestrator = orchestrator(ocr.clone(), vision.clone(), &ScannerConfig::default());

        let stop = StopSignal::new();
        stop.stop();
        let result = orchestrator.extract(&ticket_image(), Some(1), &stop).await;

        assert!(matches!(result, Err(ScanError::Cancelled)));
        assert_eq!(ocr.line_calls.load(Ordering::SeqCst), 0);
        assert_eq!(vision.calls(), (0, 0));

        assert_eq!(orchestrator.infer_row_count(&ticket_image(), &stop).await, None);
        assert_eq!(vision.count_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancellation_does_not_leak_into_next_scan() {
        let ocr = FakeOcr::new(Vec::new(), "??");
        let vision = FakeVision::new(Reply::Rows(2), Reply::Rows(2), None);
        let orchestrator = orchestrator(ocr, vision.clone(), &ScannerConfig::default());

        let cancelled = StopSignal::new();
        cancelled.stop();
        let first = orchestrator.extract(&ticket_image(), None, &cancelled).await;
        assert!(matches!(first, Err(ScanError::Cancelled)));

        let second = orchestrator
            .extract(&ticket_image(), None, &StopSignal::new())
            .await
            .unwrap();
        assert_eq!(second.source, ScanSource::Cloud);
        assert_eq!(second.rows.len(), 2);
        assert_eq!(vision.calls(), (1, 0));
        assert!(cancelled.is_stopped());
    }

    #[tokio::test]
    async fn test_extract_with_row_count_uses_inferred_hint() {
        let ocr = FakeOcr::new(grid_layout(), "??");
        let vision = FakeVision::new(Reply::Rows(1), Reply::Rows(2), Some(2));

        let outcome = orchestrator(ocr, vision.clone(), &ScannerConfig::default())
            .extract_with_row_count(&ticket_image(), &StopSignal::new())
            .await
            .unwrap();

        assert_eq!(vision.count_calls.load(Ordering::SeqCst), 1);
        assert_eq!(outcome.source, ScanSource::CloudHinted);
        assert_eq!(vision.calls(), (1, 1));
    }

    #[tokio::test]
    async fn test_infer_row_count_failure_is_none() {
        let ocr = FakeOcr::new(Vec::new(), "??");
        let vision = FakeVision::new(Reply::Offline, Reply::Offline, None);

        let orchestrator = orchestrator(ocr, vision, &ScannerConfig::default());
        assert_eq!(
            orchestrator.infer_row_count(&ticket_image(), &StopSignal::new()).await,
            None
        );
    }

    #[tokio::test]
    async fn test_full_row_strategy() {
        let layout = vec![
            RecognizedText::new("05 12 33 41 60 07", NormalizedRect::new(0.1, 0.29, 0.6, 0.02)),
            RecognizedText::new("01 02 03 04 05 06", NormalizedRect::new(0.1, 0.59, 0.6, 0.02)),
        ];
        let ocr = FakeOcr::new(layout, "??");
        let vision = FakeVision::new(Reply::Offline, Reply::Offline, None);
        let config = ScannerConfig {
            local_strategy: LocalStrategy::FullRow,
            ..ScannerConfig::default()
        };

        let outcome = orchestrator(ocr.clone(), vision.clone(), &config)
            .extract(&ticket_image(), None, &StopSignal::new())
            .await
            .unwrap();

        assert_eq!(outcome.source, ScanSource::Rows);
        assert_eq!(outcome.rows[0], TicketRow::from_parts(&[5, 12, 33, 41, 60], Some(7)));
        // Max 60 / 7 is first contained by Powerball, so the rows are re-read once
        assert_eq!(outcome.game.map(|g| g.game_id), Some("us_powerball"));
        assert_eq!(ocr.line_calls.load(Ordering::SeqCst), 2);
        assert_eq!(ocr.digit_calls.load(Ordering::SeqCst), 0);
        assert_eq!(vision.calls(), (0, 0));
    }
}
