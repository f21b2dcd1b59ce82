use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use sanctuary_core::{load_sanctuary_config, FallbackService, SessionLedger};
use sanctuary_functions::AppState;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "sanctuary-functions", about = "Hosted functions for the Sanctuary app")]
struct Cli {
    /// Path to the service configuration file.
    #[arg(long, default_value = "configs/sanctuary.toml")]
    config: PathBuf,
    /// Override the configured bind address.
    #[arg(long)]
    bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_sanctuary_config(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;

    if let Some(parent) = config.ledger.db_path().parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
    }
    let ledger = SessionLedger::new(config.ledger.db_path())?;
    ledger.initialize().context("initializing session ledger")?;

    // A missing credential degrades the service instead of killing it:
    // requests get an explicit "not configured" outcome.
    let service = match FallbackService::from_config(&config, Arc::new(ledger)) {
        Ok(service) => Some(Arc::new(service)),
        Err(error) => {
            error!(%error, "fallback service unconfigured; serving error outcomes");
            None
        }
    };

    let addr = match cli.bind {
        Some(addr) => addr,
        None => config
            .service
            .bind_addr
            .parse()
            .context("invalid service.bind_addr")?,
    };

    let app = sanctuary_functions::routes(Arc::new(AppState { service }));
    info!(%addr, environment = %config.service.environment, "listening");

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    let interrupt = async {
        tokio::signal::ctrl_c()
            .await
            .expect("install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => {},
        _ = terminate => {},
    }
}
