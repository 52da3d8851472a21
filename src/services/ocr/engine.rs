use async_trait::async_trait;
use image::DynamicImage;

use crate::error::Result;
use crate::models::grid::NormalizedRect;

/// Options passed to a text-recognition call
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionOptions {
    /// Smallest text height to report, as a fraction of image height
    pub min_text_height: f32,
    pub language_correction: bool,
    /// Restrict recognition to these characters when the engine supports it
    pub vocabulary_hint: Option<String>,
}

impl RecognitionOptions {
    /// Line-level recognition over a whole ticket
    pub fn lines(min_text_height: f32) -> Self {
        Self {
            min_text_height,
            language_correction: false,
            vocabulary_hint: None,
        }
    }

    /// Digit-only recognition for single cells
    pub fn digits(min_text_height: f32) -> Self {
        Self {
            min_text_height,
            language_correction: false,
            vocabulary_hint: Some("0123456789".to_string()),
        }
    }
}

/// One piece of recognized text
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedText {
    pub text: String,
    pub bounding_box: NormalizedRect,
    /// Lower-ranked readings of the same region, best first
    pub alternates: Vec<String>,
}

impl RecognizedText {
    pub fn new(text: impl Into<String>, bounding_box: NormalizedRect) -> Self {
        Self {
            text: text.into(),
            bounding_box,
            alternates: Vec::new(),
        }
    }

    pub fn with_alternates(mut self, alternates: Vec<String>) -> Self {
        self.alternates = alternates;
        self
    }

    /// Top reading followed by up to `max_alternates` alternates
    pub fn candidates(&self, max_alternates: usize) -> impl Iterator<Item = &str> {
        std::iter::once(self.text.as_str())
            .chain(self.alternates.iter().take(max_alternates).map(String::as_str))
    }
}

/// Text recognition abstraction (local OCR server, platform engine, test fakes)
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    /// Recognize text regions in `image`
    async fn recognize(
        &self,
        image: &DynamicImage,
        options: &RecognitionOptions,
    ) -> Result<Vec<RecognizedText>>;
}
