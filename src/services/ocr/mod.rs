pub mod engine;
pub mod http_ocr;
pub mod parser;
pub mod preprocessing;

// Re-export main types
pub use engine::{RecognitionOptions, RecognizedText, TextRecognizer};
pub use http_ocr::HttpTextRecognizer;
pub use preprocessing::ImageNormalizer;
