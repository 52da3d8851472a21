use base64::Engine as _;
use image::DynamicImage;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::error::{Result, ScanError};
use crate::models::config::ScannerConfig;
use crate::services::cloud_vision::{CloudVisionClient, VisionExtractor};
use crate::services::connectivity::HttpConnectivity;
use crate::services::ocr::{HttpTextRecognizer, TextRecognizer};
use crate::services::orchestrator::{ExtractionOrchestrator, ScanOutcome, StopSignal};

/// Orchestrator plus the local OCR client it talks to.
///
/// Shared across scans behind an `Arc`; cancellation is per scan through the
/// [`StopSignal`] each call takes.
pub struct ScannerState {
    orchestrator: ExtractionOrchestrator,
    ocr: Option<Arc<HttpTextRecognizer>>,
}

impl ScannerState {
    /// Wire the HTTP OCR server and the cloud vision endpoint from `config`
    pub fn new(config: &ScannerConfig) -> Result<Self> {
        let ocr = Arc::new(HttpTextRecognizer::new(&config.ocr_server)?);
        let connectivity = Arc::new(HttpConnectivity::new(config.cloud.endpoint.clone())?);
        let vision = Arc::new(CloudVisionClient::new(config.cloud.clone(), connectivity)?);

        let recognizer: Arc<dyn TextRecognizer> = ocr.clone();
        Ok(Self {
            orchestrator: ExtractionOrchestrator::new(recognizer, vision, config),
            ocr: Some(ocr),
        })
    }

    /// Build around caller-supplied collaborators
    pub fn with_collaborators(
        recognizer: Arc<dyn TextRecognizer>,
        vision: Arc<dyn VisionExtractor>,
        config: &ScannerConfig,
    ) -> Self {
        Self {
            orchestrator: ExtractionOrchestrator::new(recognizer, vision, config),
            ocr: None,
        }
    }

    pub fn orchestrator(&self) -> &ExtractionOrchestrator {
        &self.orchestrator
    }
}

/// Initialize scanner state
pub fn init_scanner(config: &ScannerConfig) -> Result<Arc<ScannerState>> {
    Ok(Arc::new(ScannerState::new(config)?))
}

/// Decode base64 image to DynamicImage
pub fn decode_base64_image(base64_data: &str) -> Result<DynamicImage> {
    // Accept data URLs as well as bare payloads
    let payload = match base64_data.split_once(";base64,") {
        Some((_, data)) => data,
        None => base64_data,
    };

    let image_bytes = base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| ScanError::Format(format!("failed to decode base64: {}", e)))?;

    Ok(image::load_from_memory(&image_bytes)?)
}

/// Scan a decoded image and return the full outcome
pub async fn scan_outcome(
    state: &ScannerState,
    image: &DynamicImage,
    infer_rows: bool,
    stop: &StopSignal,
) -> Result<ScanOutcome> {
    let outcome = if infer_rows {
        state.orchestrator.extract_with_row_count(image, stop).await?
    } else {
        state.orchestrator.extract(image, None, stop).await?
    };

    info!(
        source = %outcome.source,
        rows = outcome.rows.len(),
        game = ?outcome.game.map(|g| g.game_id),
        "scan finished"
    );
    Ok(outcome)
}

/// Scan a decoded image into the canonical ticket string
pub async fn scan_ticket(
    state: &ScannerState,
    image: &DynamicImage,
    infer_rows: bool,
    stop: &StopSignal,
) -> Result<String> {
    let outcome = scan_outcome(state, image, infer_rows, stop).await?;
    Ok(outcome.to_canonical().to_string())
}

/// Scan a base64-encoded image (bare or data URL)
pub async fn scan_ticket_base64(
    state: &ScannerState,
    image_base64: &str,
    infer_rows: bool,
    stop: &StopSignal,
) -> Result<String> {
    let image = decode_base64_image(image_base64)?;
    scan_ticket(state, &image, infer_rows, stop).await
}

/// Scan an image file from disk
pub async fn scan_ticket_file(
    state: &ScannerState,
    path: &Path,
    infer_rows: bool,
    stop: &StopSignal,
) -> Result<String> {
    let image = image::open(path)?;
    scan_ticket(state, &image, infer_rows, stop).await
}

/// Check OCR server health; always false without an HTTP OCR client
pub async fn check_ocr_health(state: &ScannerState) -> bool {
    match &state.ocr {
        Some(ocr) => ocr.health_check().await.is_ok(),
        None => false,
    }
}
