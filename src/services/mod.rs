pub mod cell_recognizer;
pub mod cloud_vision;
pub mod config;
pub mod connectivity;
pub mod game_catalog;
pub mod ocr;
pub mod orchestrator;
pub mod reconstructor;
pub mod row_reader;
pub mod segmenter;

pub use cloud_vision::{CloudVisionClient, VisionExtractor};
pub use connectivity::{Connectivity, HttpConnectivity, StaticConnectivity};
pub use game_catalog::GameCatalog;
pub use orchestrator::{ExtractionOrchestrator, ScanOutcome, ScanSource, StopSignal};
