//! Main entry point for the parlor lobby server.

use parlor_server::{cli, config::Config, server, server::AppState};

use anyhow::Context;
use clap::Parser;
use std::net::{SocketAddr, TcpListener};
use std::path::PathBuf;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::ServerCli::parse();

    // If debug is on: show everything at DEBUG level. Otherwise keep our
    // crates at INFO and quiet the rest.
    let log_filter = if cli.debug {
        "debug".to_string()
    } else {
        "parlor_server=info,parlor_shared=info,warn".to_string()
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(cli.debug)
        .init();

    let config_path: PathBuf = cli.config.clone();
    let mut cfg = Config::load_or_create(&config_path)
        .with_context(|| format!("loading or creating config '{}'", config_path.display()))?;

    // Apply CLI overrides in-memory (non-persistent by default)
    if let Some(port) = cli.port {
        cfg.port = port;
    }
    if let Some(countdown) = cli.countdown {
        cfg.countdown_seconds = countdown;
    }
    if cli.persist {
        cfg.save(&config_path)
            .with_context(|| format!("saving updated config '{}'", config_path.display()))?;
    }

    tracing::info!(config = %config_path.display(), port = cfg.port, countdown = cfg.countdown_seconds);

    let port = find_available_port(cfg.port)?;
    if port != cfg.port {
        tracing::warn!(requested = cfg.port, port, "configured port was not available");
    }
    let addr = SocketAddr::from(([127, 0, 0, 1], port));

    let state = AppState::new(cfg);
    server::run_server(addr, state).await?;
    Ok(())
}

/// Find the first available port starting from the given port number
fn find_available_port(start_port: u16) -> anyhow::Result<u16> {
    for port in start_port..start_port + 100 {
        match TcpListener::bind(("127.0.0.1", port)) {
            Ok(_) => return Ok(port),
            Err(_) => continue,
        }
    }
    Err(anyhow::anyhow!(
        "no available ports found in range {}..{}",
        start_port,
        start_port + 100
    ))
}
