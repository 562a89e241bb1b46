/*
newsbrief - single-binary main.rs
Loads configuration, opens the key-value store and serves the news API.
*/

use anyhow::Result;
use clap::Parser;
use common::Config;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use newsbrief::app::{open_store, NewsService};
use newsbrief::server::launch_rocket;

#[derive(Parser, Debug)]
#[command(name = "newsbrief", about = "News aggregation server with cached summaries and bookmarks")]
struct Args {
    /// Path to config.toml
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override log level (info, debug, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Override the bind address from config
    #[arg(long)]
    address: Option<String>,

    /// Override the port from config
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    // Resolve config paths
    let default_path = PathBuf::from("config.default.toml");

    let override_path = if let Some(p) = args.config {
        if !p.exists() {
            error!(path = ?p, "specified config file not found");
            return Err(anyhow::anyhow!("Config file not found: {}", p.display()));
        }
        Some(p)
    } else {
        let p = PathBuf::from("config.toml");
        if p.exists() { Some(p) } else { None }
    };

    let config = match Config::load_with_defaults(
        if default_path.exists() { Some(&default_path) } else { None },
        override_path.as_deref(),
    )
    .await
    {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(%e, "failed to load configuration");
            return Err(e);
        }
    };
    info!(default_file = ?default_path, override_file = ?override_path, "configuration loaded");

    let store = open_store(&config).await?;
    let service = NewsService::from_config(&config, store)?;

    let address = args
        .address
        .or_else(|| config.server.address.clone())
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let port = args.port.or(config.server.port).unwrap_or(8000);

    if let Err(e) = launch_rocket(service, &address, port).await {
        error!(%e, "Rocket server failed");
        return Err(e);
    }

    info!("Shutdown complete");
    Ok(())
}
