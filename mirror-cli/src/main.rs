use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use mirror::{SyncEngine, SyncLogger, SyncOptions};
use tracing::{error, info, Level};

#[derive(Parser)]
#[command(name = "mirror")]
#[command(about = "One-way synchronization of a replica directory to a source directory")]
struct Cli {
    /// Path to the source directory
    source: PathBuf,

    /// Path to the replica directory
    replica: PathBuf,

    /// Path to the operation log file; console-only when omitted
    #[arg(short, long)]
    log: Option<PathBuf>,

    /// Repeat interval in seconds; when not specified the program runs one pass
    #[arg(short, long)]
    interval: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let cli = Cli::parse();

    let mut logger = match &cli.log {
        Some(path) => SyncLogger::with_file(path)?,
        None => SyncLogger::console_only(),
    };

    let engine = SyncEngine::new(SyncOptions::default());

    match cli.interval {
        None => {
            let report = engine.sync(&cli.source, &cli.replica, &mut logger).await?;
            println!("{}", report.summary());
            if !report.is_clean() {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(seconds) => {
            info!("Synchronizing every {}s until interrupted", seconds);

            let mut ticker = tokio::time::interval(Duration::from_secs(seconds.max(1)));
            // A long pass must not trigger a catch-up burst of extra passes
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                // Passes run strictly one at a time for this pair; the next
                // tick is not serviced until the current pass returns.
                match engine.sync(&cli.source, &cli.replica, &mut logger).await {
                    Ok(report) => info!("{}", report.summary()),
                    Err(e) => {
                        error!("Synchronization pass failed: {}", e);
                        std::process::exit(1);
                    }
                }
            }
        }
    }
}
