//! LP staking dashboard server
//!
//! Serves the pool snapshot, staking actions, the transaction persistence
//! API and the local pending-transaction ledger.

use anyhow::Result;
use clap::Parser;
use farm_server::config::ServerConfig;
use farm_server::{api, ledger, server};
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "farm-server")]
#[command(about = "LP staking dashboard server")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "farm-server.toml")]
    config: String,

    /// Override log level
    #[arg(long)]
    log_level: Option<String>,

    /// Dry run mode (validate config and exit)
    #[arg(long)]
    dry_run: bool,

    /// Use the in-process staking contract instead of the gateway
    #[arg(long)]
    mock_chain: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config_found = std::path::Path::new(&cli.config).exists();
    let mut config = if config_found {
        ServerConfig::from_file(&cli.config)?
    } else {
        ServerConfig::default()
    };

    if let Some(log_level) = cli.log_level {
        config.monitoring.log_level = log_level;
    }

    init_logging(&config);
    if !config_found {
        warn!("Config file not found, using defaults: {}", cli.config);
    }

    info!("Starting farm server");
    info!("Contract gateway: {}", config.chain.rpc_url);
    info!("Ledger RocksDB path: {:?}", config.storage.rocksdb.path);

    config.check()?;
    config.ensure_directories()?;
    info!("Configuration validated successfully");

    if cli.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        return Ok(());
    }

    let state = server::build_state(&config, cli.mock_chain).await?;
    let ledger = state.ledger.clone();
    let actions = state.actions.clone();

    let sync_task = if config.ledger.sync_interval_secs > 0 {
        info!("Syncing parked transactions every {}s", config.ledger.sync_interval_secs);
        Some(ledger::spawn_sync_loop(
            ledger.clone(),
            Duration::from_secs(config.ledger.sync_interval_secs),
        ))
    } else {
        None
    };

    let api_server = api::start_server(state, &config.api).await?;

    let _metrics_server = if config.monitoring.metrics_port > 0 {
        Some(api::start_metrics_server(config.monitoring.metrics_port).await?)
    } else {
        None
    };

    info!("Farm server started. Press Ctrl+C to shutdown.");
    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
        result = api_server => {
            if let Err(e) = result {
                error!("API server task error: {}", e);
            }
        }
    }

    if let Some(task) = sync_task {
        task.abort();
    }

    // give in-flight confirmations a moment to land
    if tokio::time::timeout(Duration::from_secs(5), actions.settle()).await.is_err() {
        warn!("Confirmation tracking still running at shutdown; records stay pending");
    }
    match ledger.sync().await {
        Ok(synced) if synced > 0 => info!("Synced {} parked transactions before exit", synced),
        Ok(_) => {}
        Err(e) => error!("Final ledger sync failed: {}", e),
    }

    info!("Shutting down farm server");
    Ok(())
}

fn init_logging(config: &ServerConfig) {
    let log_level = config.monitoring.log_level.parse().unwrap_or(tracing::Level::INFO);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("farm_server={},tower_http={}", log_level, log_level).into());

    if config.monitoring.structured_logging {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
