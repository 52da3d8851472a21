use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::engine::{RecognitionOptions, RecognizedText, TextRecognizer};
use crate::error::{Result, ScanError};
use crate::models::config::OcrServerConfig;
use crate::models::grid::NormalizedRect;

/// Boxes overlapping more than this are treated as duplicate detections
const DUPLICATE_IOU: f64 = 0.3;

/// HTTP client for the local OCR server
#[derive(Clone)]
pub struct HttpTextRecognizer {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct OcrRequest<'a> {
    image_base64: String,
    min_text_height: f32,
    language_correction: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    vocabulary: Option<&'a str>,
}

/// Single text box with pixel corner points
#[derive(Deserialize, Clone, Debug)]
struct TextBox {
    #[serde(rename = "box")]
    bbox: Vec<Vec<f64>>, // 4 corner points [[x1,y1], [x2,y2], [x3,y3], [x4,y4]]
    text: String,
    #[serde(default)]
    score: f64,
    #[serde(default)]
    candidates: Vec<String>,
}

#[derive(Deserialize)]
struct OcrResponse {
    boxes: Vec<TextBox>,
}

impl HttpTextRecognizer {
    pub fn new(config: &OcrServerConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ScanError::Recognition(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Check if server is healthy
    pub async fn health_check(&self) -> Result<()> {
        let url = format!("{}/health", self.base_url);
        self.client
            .get(&url)
            .send()
            .await
            .map_err(|e| ScanError::Recognition(format!("health check failed: {}", e)))?;
        Ok(())
    }

    fn encode_image(image: &DynamicImage) -> Result<String> {
        let mut buffer = Vec::new();
        image.write_to(&mut std::io::Cursor::new(&mut buffer), image::ImageFormat::Png)?;
        Ok(general_purpose::STANDARD.encode(&buffer))
    }

    /// Drop lower-scoring boxes that overlap a kept box
    fn filter_overlapping(mut boxes: Vec<(TextBox, NormalizedRect)>) -> Vec<(TextBox, NormalizedRect)> {
        boxes.sort_by(|a, b| b.0.score.total_cmp(&a.0.score));

        let mut kept: Vec<(TextBox, NormalizedRect)> = Vec::with_capacity(boxes.len());
        for candidate in boxes {
            if kept.iter().all(|(_, rect)| rect.iou(&candidate.1) <= DUPLICATE_IOU) {
                kept.push(candidate);
            }
        }
        kept
    }
}

#[async_trait]
impl TextRecognizer for HttpTextRecognizer {
    async fn recognize(
        &self,
        image: &DynamicImage,
        options: &RecognitionOptions,
    ) -> Result<Vec<RecognizedText>> {
        let request = OcrRequest {
            image_base64: Self::encode_image(image)?,
            min_text_height: options.min_text_height,
            language_correction: options.language_correction,
            vocabulary: options.vocabulary_hint.as_deref(),
        };
        let url = format!("{}/ocr", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ScanError::Recognition(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ScanError::Recognition(format!("OCR server error: {}", error_text)));
        }

        let data: OcrResponse = response
            .json()
            .await
            .map_err(|e| ScanError::Recognition(format!("failed to parse response: {}", e)))?;

        let (width, height) = (image.width(), image.height());
        let boxes = data
            .boxes
            .into_iter()
            .map(|b| {
                let rect = NormalizedRect::from_pixel_points(&b.bbox, width, height);
                (b, rect)
            })
            .collect();

        let results: Vec<RecognizedText> = Self::filter_overlapping(boxes)
            .into_iter()
            .map(|(b, rect)| RecognizedText::new(b.text, rect).with_alternates(b.candidates))
            .collect();

        debug!(count = results.len(), "OCR server returned text boxes");
        Ok(results)
    }
}
