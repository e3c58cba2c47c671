//! CLI commands for matchboard-api.
//!
//! Besides running the server, a scraper output file can be imported
//! directly and the stored statistics printed.

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;

use crate::config::AppConfig;
use crate::ingest::{ingest_batch, ParsedBatch};
use crate::storage::MatchRepository;

#[derive(Parser)]
#[command(name = "matchboard-api")]
#[command(version, about = "Matchboard: scraped match ingestion and query API", long_about = None)]
pub struct Cli {
    /// SQLite database path override
    #[arg(short, long, global = true)]
    pub database: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the API server
    Serve {
        /// Host to bind to
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Ingest a scraper batch file, exactly as the webhook would
    Import {
        /// Path to batch JSON file
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Print aggregate statistics as JSON
    Stats,
}

/// Load configuration and apply the database override.
pub fn load_config(database: Option<PathBuf>) -> anyhow::Result<AppConfig> {
    let mut config = AppConfig::load().context("Failed to load configuration")?;
    if let Some(path) = database {
        config.database.path = path.to_string_lossy().to_string();
    }
    Ok(config)
}

/// Import a batch file into the database.
pub fn run_import(file: PathBuf, config: &AppConfig) -> anyhow::Result<()> {
    let body = std::fs::read(&file)
        .with_context(|| format!("Failed to read batch file {}", file.display()))?;
    let batch = ParsedBatch::from_slice(&body, &config.webhook.default_source)
        .with_context(|| format!("Invalid batch file {}", file.display()))?;

    let repo = MatchRepository::new(&config.database.path);
    repo.init()
        .with_context(|| format!("Failed to initialize database {}", config.database.path))?;

    eprintln!("Importing {} matches from {}", batch.received(), file.display());
    let summary = ingest_batch(&repo, &batch)?;

    eprintln!("Database now holds {} matches", repo.count()?);

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

/// Print stats and breakdowns for the database.
pub fn run_stats(config: &AppConfig) -> anyhow::Result<()> {
    let repo = MatchRepository::new(&config.database.path);

    let stats = repo.stats()?;
    let sports = repo.sport_breakdown()?;
    let dates = repo.date_breakdown(config.query.dates_limit)?;
    let bookmakers = repo.bookmaker_breakdown()?;

    let report = json!({
        "stats": stats,
        "sports": sports,
        "dates": dates,
        "bookmakers": bookmakers,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
