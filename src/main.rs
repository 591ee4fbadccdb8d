//! Screencap CLI
//!
//! Contact sheets and keyframe-aligned lossless split scripts for video
//! collections described by M3U playlists.
//!
//! # Usage
//!
//! ```bash
//! screencap metadata holiday.m3u
//! screencap sort ~/videos > sorted.m3u
//! screencap split cuts.m3u --script split.sh
//! screencap screens holiday.m3u --columns 4 --rows 4
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use screencap_cli::app::DefaultAppContainer;
use screencap_cli::cli::{commands, Cli, Commands};
use screencap_cli::config_initialization::initialize_configuration_hierarchy;
use screencap_cli::utils::logging::LoggingSystem;

/// Main entry point for the Screencap CLI application
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = initialize_configuration_hierarchy(cli.config.as_deref(), &cli.config_overrides())
        .context("Invalid configuration")?;
    LoggingSystem::new(config.logging.level.clone(), config.logging.format)
        .init()
        .context("Failed to initialize logging")?;
    info!("Starting Screencap");

    let container = DefaultAppContainer::new(config);
    match cli.command {
        Commands::Metadata(args) => {
            info!("Executing metadata command");
            commands::metadata(&container, args).await?;
        }
        Commands::Sort(args) => {
            info!("Executing sort command");
            commands::sort(&container, args).await?;
        }
        Commands::Split(args) => {
            info!("Executing split command");
            commands::split(&container, args).await?;
        }
        Commands::Screens(args) => {
            info!("Executing screens command");
            commands::screens(&container, args).await?;
        }
    }

    info!("Screencap completed successfully");
    Ok(())
}
