//! Windkeep Server - Headless Daemon
//!
//! Keeps per-account usage metadata fresh and wakes dormant usage windows
//! with minimal probe requests. The scheduler aligns its wake-ups with the
//! earliest expected window reset instead of polling on a fixed interval.

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{AccountCommands, Cli, Commands};
use windkeep_core::modules::{
    config, FileAccountStore, HttpRelay, HttpUsageFetcher, PollerConfig, StoredTokenGateway,
};
use windkeep_core::PollerService;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let store = Arc::new(match &cli.data_dir {
        Some(dir) => FileAccountStore::new(dir.clone())
            .map_err(|e| anyhow::anyhow!("Failed to open data dir: {}", e))?,
        None => FileAccountStore::open_default()
            .map_err(|e| anyhow::anyhow!("Failed to open data dir: {}", e))?,
    });

    let poller_config = config::load_config(store.data_dir())
        .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    let service = build_service(&store, poller_config);

    match cli.command {
        None | Some(Commands::Run) => run_daemon(&service).await,
        Some(Commands::Pass) => commands::run_pass_once(&service).await,
        Some(Commands::Status) => commands::show_status(&service, &store).await,
        Some(Commands::Account(cmd)) => match cmd {
            AccountCommands::List { json } => commands::list_accounts(&store, json).await,
            AccountCommands::Add { file } => commands::add_account(&store, &file).await,
            AccountCommands::Remove { identifier } => {
                commands::remove_account(&store, &identifier).await
            },
        },
    }
}

fn build_service(store: &Arc<FileAccountStore>, poller_config: PollerConfig) -> PollerService {
    let tokens = Arc::new(StoredTokenGateway::new());
    let fetcher = Arc::new(HttpUsageFetcher::new(tokens.clone(), poller_config.clone()));
    let relay = Arc::new(HttpRelay::new(poller_config.clone()));

    PollerService::new(store.clone(), fetcher, tokens, relay, poller_config)
}

async fn run_daemon(service: &PollerService) -> Result<()> {
    tracing::info!("Windkeep daemon starting...");

    service.start().await;

    let status = service.status();
    tracing::info!(
        "Poller running (base {}min, settle {}min, reset threshold {}min)",
        status.base_interval_minutes,
        status.after_reset_minutes,
        status.reset_threshold_minutes
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received, draining...");

    service.stop().await;
    Ok(())
}
