//! biomedis - storefront API server
//!
//! Startup order: load `.env`, configure tracing, build the database engine
//! (falling back to a local store if `DATABASE_URL` is missing or unusable),
//! run a connectivity check, then serve until SIGTERM/Ctrl+C.

use std::net::{IpAddr, SocketAddr};

use anyhow::{Context, Result};
use biomedis_db::{create_engine, probe, DatabaseSettings};
use biomedis_server::tracing_setup::{self, TracingConfig};
use biomedis_server::{run_server, AppState, ServerConfig};
use clap::Parser;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "biomedis", version, about = "Biomedis storefront API server")]
struct Cli {
    /// Address to bind to (overrides HOST)
    #[arg(long)]
    host: Option<IpAddr>,

    /// Port to listen on (overrides PORT)
    #[arg(long, short = 'p')]
    port: Option<u16>,

    /// Database URL (overrides DATABASE_URL)
    #[arg(long)]
    database_url: Option<String>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    tracing_setup::init(&TracingConfig { debug: cli.debug })?;

    let mut config = ServerConfig::from_env();
    if cli.host.is_some() || cli.port.is_some() {
        config.bind_addr = SocketAddr::new(
            cli.host.unwrap_or(config.bind_addr.ip()),
            cli.port.unwrap_or(config.bind_addr.port()),
        );
    }

    let mut settings = DatabaseSettings::from_env();
    if let Some(url) = cli.database_url {
        settings = settings.with_url(url);
    }

    let engine = create_engine(&settings).await;
    if probe::check_connectivity_within(&engine, settings.probe_timeout()).await {
        info!(
            backend = %engine.kind(),
            fallback = engine.is_fallback(),
            "Database connection successful"
        );
    } else {
        warn!(
            backend = %engine.kind(),
            "Database unreachable at startup; serving in degraded mode"
        );
    }

    let state = AppState::new(engine.clone(), config, settings.probe_timeout());
    let served = run_server(state).await.context("Server error");

    engine.close().await;
    served
}
