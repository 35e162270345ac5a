//! # Board Scraper
//!
//! Polls announcement boards, extracts their postings and persists every
//! posting it has not seen before.
//!
//! ## Features
//!
//! - Per-origin access clients that space requests and retry with exponential backoff
//! - Two markup families (common boards and the scholarship board)
//! - Latest-page and date-range ingestion passes with one commit per pass
//! - Idempotent persistence keyed on `"{origin code}-{native id}"`
//! - Optional webhook notification of newly stored announcements
//!
//! ## Usage
//!
//! ```sh
//! board_scraper --config scraper.yaml run
//! board_scraper scrape FA1
//! board_scraper scrape-range FA1 --start 2025-03-01 --end 2025-03-31
//! board_scraper show FA1-1024
//! ```
//!
//! ## Architecture
//!
//! 1. **Access**: [`client`] composes rate limiting over retries over a reqwest transport
//! 2. **Parsing**: [`adapters`] turn listing and detail markup into records
//! 3. **Pagination**: [`pagination`] lazily walks listing pages until one is empty
//! 4. **Ingestion**: [`ingest`] applies the stop/skip policy, dedups and commits
//! 5. **Scheduling**: [`scheduler`] runs one polling loop per origin

use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod adapters;
mod cli;
mod client;
mod config;
mod error;
mod ingest;
mod models;
mod pagination;
mod scheduler;
mod store;
#[cfg(test)]
mod testing;
mod utils;
mod webhook;

use cli::{Cli, Command};
use config::Settings;
use ingest::Ingestor;
use store::{AnnouncementStore, JsonStore};

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    let args = Cli::parse();
    debug!(config = %args.config.display(), command = ?args.command, "Parsed CLI arguments");

    let settings = Settings::load(&args.config).await?;
    let registry = settings.registry();

    match args.command {
        Command::Origins => {
            for origin in registry.origins() {
                println!(
                    "{}\t{}\t{}\t{}min\t{}",
                    origin.id, origin.code, origin.adapter, origin.poll_interval_minutes, origin.name
                );
            }
        }
        Command::Show { key } => {
            let store = JsonStore::open(&settings.store_path).await?;
            match store.find(&key).await? {
                Some(row) => println!("{}", serde_json::to_string_pretty(&row)?),
                None => {
                    let total = store.count().await?;
                    error!(%key, total, "No stored announcement with this key");
                    return Err(format!("announcement {} not found", key).into());
                }
            }
        }
        Command::Run => {
            let store = JsonStore::open(&settings.store_path).await?;
            scheduler::run(&settings, store).await?;
        }
        Command::Scrape { origin } => {
            let origin = registry.find(&origin)?;
            let store = JsonStore::open(&settings.store_path).await?;
            let ingestor = Ingestor::from_settings(&settings, store)?;
            match ingestor.scrape(origin).await {
                Ok(count) => println!("{}: {} new announcement(s)", origin.code, count),
                Err(e) => {
                    error!(origin = %origin.code, error = %e, "Scrape failed");
                    return Err(e.into());
                }
            }
        }
        Command::ScrapeRange {
            origin,
            start,
            end,
            start_page,
        } => {
            let origin = registry.find(&origin)?;
            let store = JsonStore::open(&settings.store_path).await?;
            let ingestor = Ingestor::from_settings(&settings, store)?;
            match ingestor.scrape_range(origin, start, end, start_page).await {
                Ok(count) => println!("{}: {} new announcement(s)", origin.code, count),
                Err(e) => {
                    error!(origin = %origin.code, error = %e, "Range scrape failed");
                    return Err(e.into());
                }
            }
        }
    }

    let elapsed = start_time.elapsed();
    info!(?elapsed, secs = elapsed.as_secs(), "Execution complete");
    Ok(())
}
