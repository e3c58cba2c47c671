//! Matchboard API
//!
//! Webhook ingestion and REST queries for scraped sports matches.

mod auth;
mod cli;
mod codec;
mod config;
mod ingest;
mod routes;
mod storage;
mod types;

use anyhow::Context;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands};
use crate::config::AppConfig;
use crate::routes::{create_router, AppState};
use crate::storage::MatchRepository;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging; stdout is left to command output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "matchboard_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = cli::load_config(cli.database)?;

    match cli.command {
        Commands::Serve { host, port } => run_server(config, host, port).await,
        Commands::Import { file } => cli::run_import(file, &config),
        Commands::Stats => cli::run_stats(&config),
    }
}

/// Run the API server.
async fn run_server(
    mut config: AppConfig,
    host: Option<String>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    // Override with CLI args
    if let Some(h) = host {
        config.server.host = h;
    }
    if let Some(p) = port {
        config.server.port = p;
    }

    tracing::info!("Configuration loaded");
    let repo = MatchRepository::new(&config.database.path);
    tracing::info!("Database path: {}", repo.path().display());

    match repo.init() {
        Ok(()) => tracing::info!("Database ready"),
        // Keep serving; /health reports the database as disconnected
        Err(e) => tracing::warn!("Failed to initialize database: {}", e),
    }

    if config.webhook.api_key().is_none() {
        tracing::warn!("No webhook API key configured, accepting unauthenticated webhook requests");
    }

    let addr = SocketAddr::new(
        config
            .server
            .host
            .parse()
            .with_context(|| format!("Invalid host {}", config.server.host))?,
        config.server.port,
    );

    // Create application state
    let state = Arc::new(AppState { repo, config });
    let app = create_router(state);

    // Start server
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
