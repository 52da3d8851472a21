//! Lottery ticket number extraction.
//!
//! A ticket photo goes through local grid recognition first (text boxes
//! grouped into rows, each cell read with retry variants); when that yields
//! too little the image is sent to a cloud vision service, optionally with
//! the expected row count as a hint. The result is a list of
//! [`TicketRow`]s, serialized as `"Lottery: r1|r2 Ticket:<source>"`.

pub mod commands;
pub mod error;
pub mod models;
pub mod services;

pub use commands::scan::{
    decode_base64_image, init_scanner, scan_ticket, scan_ticket_base64, scan_ticket_file,
    ScannerState,
};
pub use error::{Result, ScanError};
pub use models::config::ScannerConfig;
pub use models::ticket::{CanonicalTicket, TicketRow};
pub use services::config::ConfigManager;
pub use services::orchestrator::{ExtractionOrchestrator, ScanOutcome, ScanSource, StopSignal};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` overrides the default `info` level. Calling this twice is a
/// no-op rather than a panic.
pub fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    let result = if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    };

    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
