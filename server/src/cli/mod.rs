use clap::Parser;
use std::path::PathBuf;

/// Server CLI for parlor-server
#[derive(Parser, Debug, Clone)]
#[command(
    name = "parlor-server",
    version,
    about = "Lobby coordination server for the parlor card game"
)]
pub struct ServerCli {
    /// Path to config file
    #[arg(long, default_value = "parlor-server.toml")]
    pub config: PathBuf,

    /// Listen port (overrides config)
    #[arg(long)]
    pub port: Option<u16>,

    /// Countdown length in seconds (overrides config)
    #[arg(long)]
    pub countdown: Option<u64>,

    /// Persist CLI overrides back to the config file
    #[arg(long, default_value_t = false)]
    pub persist: bool,

    /// Verbose logging
    #[arg(long, default_value_t = false)]
    pub debug: bool,
}
