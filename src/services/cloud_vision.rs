//! Cloud vision fallback: sends the ticket image to an OpenAI-compatible
//! chat-completions endpoint and parses the JSON rows it answers with.
//!
//! The model is asked for `{"rows": [...]}` but in practice it also answers
//! with a bare array or a single row object, sometimes wrapped in a markdown
//! code fence. All of those shapes are accepted by [`parse_rows`].

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{Result, ScanError};
use crate::models::config::CloudVisionConfig;
use crate::models::ticket::{TicketRow, MAX_TICKET_NUMBER, UNREADABLE};
use crate::services::connectivity::Connectivity;

/// Times the image is shrunk by 25% once the quality ladder is exhausted
const MAX_SHRINK_STEPS: usize = 8;
const SHRINK_FACTOR: f64 = 0.75;
const FALLBACK_QUALITY: u8 = 85;

const COUNT_ROWS_PROMPT: &str = "This is a photo of a lottery ticket. \
Count the rows of played numbers on it. Each row has 5 main numbers and \
usually one extra special number. Reply with a single integer and nothing else.";

/// Image-to-rows extraction backed by a vision model
#[async_trait]
pub trait VisionExtractor: Send + Sync {
    /// Extract ticket rows; with `expected_rows` the model is told the exact count
    async fn extract(
        &self,
        image: &DynamicImage,
        expected_rows: Option<usize>,
    ) -> Result<Vec<TicketRow>>;

    /// Ask only for the number of rows on the ticket
    async fn count_rows(&self, image: &DynamicImage) -> Result<usize>;
}

pub struct CloudVisionClient {
    client: reqwest::Client,
    config: CloudVisionConfig,
    connectivity: Arc<dyn Connectivity>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

/// Response shapes, tried in declaration order
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RowsPayload {
    Bare(Vec<RawRow>),
    Wrapped { rows: Vec<RawRow> },
    Single(RawRow),
}

#[derive(Debug, Deserialize)]
struct RawRow {
    numbers: Vec<Value>,
    #[serde(default)]
    special: Option<Value>,
}

impl RawRow {
    fn into_row(self) -> TicketRow {
        let numbers: Vec<i32> = self.numbers.iter().map(coerce_number).collect();
        TicketRow::from_parts(&numbers, self.special.as_ref().map(coerce_number))
    }
}

impl CloudVisionClient {
    pub fn new(config: CloudVisionConfig, connectivity: Arc<dyn Connectivity>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ScanError::Network(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config,
            connectivity,
        })
    }

    fn api_key(&self) -> Result<String> {
        std::env::var(&self.config.api_key_env).map_err(|_| {
            ScanError::Config(format!(
                "environment variable {} is not set",
                self.config.api_key_env
            ))
        })
    }

    /// One round trip: connectivity check, image upload, message content back
    async fn complete(&self, image: &DynamicImage, prompt: &str, json_mode: bool) -> Result<String> {
        if !self.connectivity.is_reachable().await {
            return Err(ScanError::Network("no network connectivity".to_string()));
        }

        let api_key = self.api_key()?;

        let payload = {
            let source = image.clone();
            let config = self.config.clone();
            tokio::task::spawn_blocking(move || prepare_image(&source, &config))
                .await
                .map_err(|e| ScanError::Network(format!("image preparation task failed: {}", e)))??
        };
        let data_url = format!("data:image/jpeg;base64,{}", BASE64_STANDARD.encode(&payload));
        debug!(bytes = payload.len(), json_mode, "sending image to vision service");

        let body = request_body(&self.config, prompt, &data_url, json_mode);
        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let snippet: String = text.chars().take(200).collect();
            return Err(ScanError::Network(format!(
                "vision service returned {}: {}",
                status, snippet
            )));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| ScanError::Parse(format!("invalid chat response: {}", e)))?;

        message_content(chat)
    }
}

#[async_trait]
impl VisionExtractor for CloudVisionClient {
    async fn extract(
        &self,
        image: &DynamicImage,
        expected_rows: Option<usize>,
    ) -> Result<Vec<TicketRow>> {
        let prompt = extraction_prompt(expected_rows);
        let content = self.complete(image, &prompt, true).await?;
        let rows = parse_rows(&content)?;
        info!(rows = rows.len(), ?expected_rows, "vision service extracted rows");
        Ok(rows)
    }

    async fn count_rows(&self, image: &DynamicImage) -> Result<usize> {
        let content = self.complete(image, COUNT_ROWS_PROMPT, false).await?;
        parse_row_count(&content)
    }
}

/// Instruction for row extraction, optionally pinned to an exact row count
pub fn extraction_prompt(expected_rows: Option<usize>) -> String {
    let mut prompt = String::from(
        "This is a photo of a lottery ticket. Read every row of played numbers. \
Each row has 5 main numbers and one special number (for example the Powerball or Mega Ball). \
Respond with JSON only, no prose, in exactly this shape: \
{\"rows\": [{\"numbers\": [n1, n2, n3, n4, n5], \"special\": s}]}. \
Use integers. Use -1 for any number you cannot read. Use 0 for the special \
number when the row has none.",
    );

    if let Some(count) = expected_rows {
        prompt.push_str(&format!(
            " The ticket has exactly {} rows; return exactly {} row objects.",
            count, count
        ));
    }

    prompt
}

/// Chat-completions request body; `response_format` is only sent in JSON mode
fn request_body(config: &CloudVisionConfig, prompt: &str, data_url: &str, json_mode: bool) -> Value {
    let mut body = json!({
        "model": config.model,
        "messages": [{
            "role": "user",
            "content": [
                { "type": "text", "text": prompt },
                { "type": "image_url", "image_url": { "url": data_url } }
            ]
        }],
        "max_tokens": config.max_tokens,
    });

    if json_mode {
        body["response_format"] = json!({ "type": "json_object" });
    }

    body
}

/// First choice's content, or the refusal the service gave instead
fn message_content(response: ChatResponse) -> Result<String> {
    let message = response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message)
        .ok_or_else(|| ScanError::Parse("response has no choices".to_string()))?;

    if let Some(refusal) = message.refusal.filter(|r| !r.trim().is_empty()) {
        warn!(refusal = %refusal, "vision service refused");
        return Err(ScanError::Refusal(refusal));
    }

    message
        .content
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| ScanError::Parse("response has no content".to_string()))
}

/// Strip a surrounding markdown code fence, language tag included
pub fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    let body = match rest.split_once('\n') {
        Some((_tag, body)) => body,
        None => rest,
    };
    let body = body.trim_end();
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Decode the model's answer into ticket rows
pub fn parse_rows(content: &str) -> Result<Vec<TicketRow>> {
    let body = strip_code_fences(content);

    let payload: RowsPayload = match serde_json::from_str(body) {
        Ok(payload) => payload,
        Err(first_error) => {
            // Prose around the JSON: retry on the outermost bracketed span
            let start = body.find(['[', '{']);
            let end = body.rfind([']', '}']);
            match (start, end) {
                (Some(start), Some(end)) if start < end => serde_json::from_str(&body[start..=end])
                    .map_err(|e| ScanError::Parse(format!("no ticket rows in response: {}", e)))?,
                _ => {
                    return Err(ScanError::Parse(format!(
                        "no ticket rows in response: {}",
                        first_error
                    )))
                }
            }
        }
    };

    let rows = match payload {
        RowsPayload::Bare(rows) | RowsPayload::Wrapped { rows } => rows,
        RowsPayload::Single(row) => vec![row],
    };

    Ok(rows.into_iter().map(RawRow::into_row).collect())
}

/// Parse the row-count answer: a single integer
pub fn parse_row_count(content: &str) -> Result<usize> {
    let body = strip_code_fences(content);
    body.trim()
        .parse::<usize>()
        .map_err(|_| ScanError::Parse(format!("expected a row count, got {:?}", body)))
}

/// JSON number or numeric string to a wire value; anything else is unreadable
fn coerce_number(value: &Value) -> i32 {
    let parsed = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };

    match parsed {
        Some(v) if v == UNREADABLE as i64 || (0..=MAX_TICKET_NUMBER as i64).contains(&v) => v as i32,
        _ => UNREADABLE,
    }
}

/// Downscale and JPEG-encode `image` until it fits the payload budget.
///
/// The longest side is first capped at `max_dimension`. Each quality of the
/// ladder is tried in order; when none fits, the image shrinks by 25% and the
/// ladder starts over. After the last shrink the smallest encoding is returned.
pub fn prepare_image(image: &DynamicImage, config: &CloudVisionConfig) -> Result<Vec<u8>> {
    let ladder: &[u8] = if config.jpeg_qualities.is_empty() {
        &[FALLBACK_QUALITY]
    } else {
        &config.jpeg_qualities
    };

    let max_dimension = config.max_dimension.max(1);
    let mut current = if image.width().max(image.height()) > max_dimension {
        image.resize(max_dimension, max_dimension, FilterType::Triangle)
    } else {
        image.clone()
    };

    let mut smallest: Option<Vec<u8>> = None;
    for step in 0..=MAX_SHRINK_STEPS {
        for &quality in ladder {
            let encoded = encode_jpeg(&current, quality)?;
            if encoded.len() <= config.max_payload_bytes {
                debug!(
                    width = current.width(),
                    height = current.height(),
                    quality,
                    bytes = encoded.len(),
                    "image fits payload budget"
                );
                return Ok(encoded);
            }
            if smallest.as_ref().map_or(true, |s| encoded.len() < s.len()) {
                smallest = Some(encoded);
            }
        }

        if step == MAX_SHRINK_STEPS || (current.width() <= 1 && current.height() <= 1) {
            break;
        }
        let width = ((current.width() as f64 * SHRINK_FACTOR) as u32).max(1);
        let height = ((current.height() as f64 * SHRINK_FACTOR) as u32).max(1);
        current = current.resize_exact(width, height, FilterType::Triangle);
    }

    warn!(
        budget = config.max_payload_bytes,
        "image still above payload budget after shrinking, sending smallest encoding"
    );
    smallest.ok_or_else(|| ScanError::Parse("image could not be encoded".to_string()))
}

fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    let rgb = image.to_rgb8();
    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, quality).encode_image(&rgb)?;
    Ok(buffer)
}
