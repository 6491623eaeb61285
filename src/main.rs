// ABOUTME: Main entry point for the shell gateway HTTP/WebSocket server

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use shell_gateway::api::{self, AppState};
use shell_gateway::config::{AppConfig, LoggingConfig};
use shell_gateway::docker::ContainerManager;

#[derive(Debug, Parser)]
#[command(name = "shell-gateway", version, about)]
struct Cli {
    /// Path to the TOML config file
    #[arg(short, long, env = "SHELL_GATEWAY_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on, overrides server.bind
    #[arg(short, long)]
    bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(bind) = cli.bind {
        config.server.bind = bind;
    }

    setup_logging(&config.logging);
    setup_panic_handler();

    if config.auth.api_key.is_none() {
        warn!("No API key configured, /getaccess is unauthenticated");
    }

    let runtime = ContainerManager::new(&config.docker)
        .await
        .context("Failed to connect to Docker")?;
    let state = AppState::with_memory_store(&config, Arc::new(runtime));

    let listener = tokio::net::TcpListener::bind(config.server.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind))?;
    info!("Shell gateway listening on {}", listener.local_addr()?);

    axum::serve(listener, api::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shell gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

fn setup_logging(config: &LoggingConfig) {
    use std::fs::OpenOptions;
    use tracing_subscriber::prelude::*;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.filter.as_str().into());

    let log_file = config.directory.as_ref().and_then(|dir| {
        let _ = std::fs::create_dir_all(dir);
        let path = dir.join(format!(
            "shell-gateway-{}.log",
            chrono::Local::now().format("%Y%m%d-%H%M%S")
        ));
        match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => Some(file),
            Err(e) => {
                eprintln!("Cannot open log file {}: {}, logging to stderr", path.display(), e);
                None
            }
        }
    });

    let registry = tracing_subscriber::registry().with(filter);
    match log_file {
        Some(file) => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(file)
                    .with_ansi(false), // No ANSI colors in log file
            )
            .init(),
        None => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

fn setup_panic_handler() {
    use tracing::error;

    std::panic::set_hook(Box::new(|panic_info| {
        error!("Application panicked: {}", panic_info);
        eprintln!("Application panicked: {}", panic_info);
    }));
}
