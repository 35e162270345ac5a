//! Command-line interface definitions for the board scraper.
//!
//! Every command reads the same YAML settings file; its path can be given
//! with `--config` or the `SCRAPER_CONFIG` environment variable.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments for the board scraper.
///
/// # Examples
///
/// ```sh
/// # Poll every registered origin on its own interval
/// board_scraper run
///
/// # One latest-mode pass for an origin, by code or numeric id
/// board_scraper scrape FA1
///
/// # Backfill March 2025, starting from the third listing page
/// board_scraper scrape-range FA1 --start 2025-03-01 --end 2025-03-31 --start-page 3
///
/// # Look up a stored announcement by its scraping key
/// board_scraper show FA1-1024
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the settings file
    #[arg(short, long, env = "SCRAPER_CONFIG", default_value = "scraper.yaml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Run the interval scheduler until Ctrl-C
    Run,

    /// Ingest the first listing page of one origin
    Scrape {
        /// Origin code or numeric id
        origin: String,
    },

    /// Ingest every record of one origin dated within a range
    ScrapeRange {
        /// Origin code or numeric id
        origin: String,

        /// Earliest publication date to ingest (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,

        /// Latest publication date to ingest (YYYY-MM-DD)
        #[arg(long)]
        end: NaiveDate,

        /// Listing page to start from
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        start_page: u32,
    },

    /// Print one stored announcement as JSON
    Show {
        /// Scraping key, e.g. FA1-1024
        key: String,
    },

    /// List registered origins
    Origins,
}
