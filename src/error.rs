use thiserror::Error;

/// Errors surfaced by the extraction pipeline.
///
/// Per-cell recognition failures are not errors; they are recorded as
/// [`crate::models::grid::CellReading::Unreadable`] and end up as `-1`.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Grid could not be formed; the orchestrator falls through to the cloud tier.
    #[error("segmentation failed: {0}")]
    Segmentation(String),

    /// No connectivity or a transport failure talking to the vision service.
    #[error("network error: {0}")]
    Network(String),

    /// The vision service declined to process the image.
    #[error("vision service refused the request: {0}")]
    Refusal(String),

    /// The vision response could not be decoded into ticket rows.
    #[error("failed to parse vision response: {0}")]
    Parse(String),

    /// The local text-recognition service failed as a whole.
    #[error("text recognition failed: {0}")]
    Recognition(String),

    #[error("image processing failed: {0}")]
    Image(#[from] image::ImageError),

    /// Malformed canonical ticket string.
    #[error("invalid ticket string: {0}")]
    Format(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("scan cancelled")]
    Cancelled,
}

impl From<reqwest::Error> for ScanError {
    fn from(e: reqwest::Error) -> Self {
        ScanError::Network(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
