use serde::{Deserialize, Serialize};

use super::roi::CropStrategy;

/// Local OCR server connection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OcrServerConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for OcrServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:39835".to_string(),
            timeout_secs: 5,
        }
    }
}

/// Image preprocessing configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PreprocessingConfig {
    /// Contrast boost in percent for the full-ticket pass
    pub contrast: f32,
    /// Brightness lift added to every channel
    pub brightness: i32,
    pub sharpen_sigma: f32,
    pub blur_sigma: f32,
    /// Upscale factor of the first digit variant
    pub digit_scale_factor: f64,
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            contrast: 50.0,
            brightness: 10,
            sharpen_sigma: 1.0,
            blur_sigma: 0.5,
            digit_scale_factor: 3.0,
        }
    }
}

/// Grid detection tuning
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Max vertical-center delta (normalized) for two boxes to share a row
    pub row_tolerance: f64,
    /// Padding (normalized) added around each cell before cropping
    pub cell_padding: f64,
    /// Fewer rows than this is a segmentation failure
    pub min_rows: usize,
    /// Smallest text height (fraction of image height) the recognizer reports
    pub min_text_height: f32,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            row_tolerance: 0.02,
            cell_padding: 0.01,
            min_rows: 2,
            min_text_height: 0.01,
        }
    }
}

/// Single-cell recognition tuning
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RecognitionConfig {
    /// Alternate candidates tried after the top candidate
    pub max_alternates: usize,
    pub min_text_height: f32,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            max_alternates: 5,
            min_text_height: 0.1,
        }
    }
}

/// Cloud vision endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CloudVisionConfig {
    /// Chat-completions URL
    pub endpoint: String,
    pub model: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    pub timeout_secs: u64,
    pub max_tokens: u32,
    /// Longest image side sent to the service
    pub max_dimension: u32,
    /// Encoded payload budget in bytes
    pub max_payload_bytes: usize,
    /// JPEG qualities tried in order until the payload fits
    pub jpeg_qualities: Vec<u8>,
}

impl Default for CloudVisionConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4o".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: 60,
            max_tokens: 1000,
            max_dimension: 1536,
            max_payload_bytes: 1_000_000,
            jpeg_qualities: vec![90, 80, 70, 60, 50, 40],
        }
    }
}

/// Game detection configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GameConfig {
    /// Catalog ids in inference priority order; empty uses the built-in order
    pub priority: Vec<String>,
    /// Constraint assumed before any game is inferred
    pub default_game: String,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            priority: Vec::new(),
            default_game: "us_mega_millions".to_string(),
        }
    }
}

/// Which local tier runs before the cloud
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LocalStrategy {
    /// Per-cell grid segmentation and recognition
    #[default]
    Grid,
    /// Whole-line recognition, for tickets too noisy to segment
    FullRow,
}

/// Complete scanner configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ScannerConfig {
    #[serde(default)]
    pub ocr_server: OcrServerConfig,
    #[serde(default)]
    pub preprocessing: PreprocessingConfig,
    #[serde(default)]
    pub segmentation: SegmentationConfig,
    #[serde(default)]
    pub recognition: RecognitionConfig,
    #[serde(default)]
    pub cloud: CloudVisionConfig,
    #[serde(default)]
    pub games: GameConfig,
    #[serde(default)]
    pub local_strategy: LocalStrategy,
    #[serde(default)]
    pub crop: CropStrategy,
}
