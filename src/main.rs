use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;

use ticket_scanner_lib::{init_logging, init_scanner, scan_ticket_file, ConfigManager, StopSignal};

/// Read the played numbers off a lottery ticket photo
#[derive(Parser, Debug)]
#[command(name = "ticket-scanner")]
#[command(author, version, about = "Lottery ticket number extraction")]
struct Cli {
    /// Ticket image (JPEG, PNG, ...)
    image: PathBuf,

    /// Emit logs as JSON lines on stderr
    #[arg(long)]
    json_logs: bool,

    /// Ask the vision service for the row count first and use it as a hint
    #[arg(long)]
    rows: bool,

    /// Config file to use instead of the per-user one
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json_logs);

    let config = match &cli.config {
        Some(path) => ConfigManager::load_from(path),
        None => ConfigManager::new().and_then(|manager| manager.load()),
    }
    .context("failed to load configuration")?;

    let scanner = init_scanner(&config).context("failed to initialize scanner")?;

    let stop = StopSignal::new();
    let ctrl_c = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cancelling scan");
            ctrl_c.stop();
        }
    });

    let canonical = scan_ticket_file(&scanner, &cli.image, cli.rows, &stop)
        .await
        .with_context(|| format!("failed to scan {}", cli.image.display()))?;

    println!("{}", canonical);
    Ok(())
}
