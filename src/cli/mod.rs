//! CLI module for Screencap
//!
//! This module handles command-line argument parsing and command execution.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config_initialization::ConfigOverrides;
use crate::utils::logging::LogFormat;

pub mod args;
pub mod commands;

pub use args::{InputArgs, MetadataArgs, ScreensArgs, SortArgs, SplitArgs};

/// Contact sheets and lossless split scripts for video playlists
#[derive(Parser, Debug)]
#[command(name = "screencap")]
#[command(about = "Screencap - contact sheets and keyframe-aligned split scripts for M3U playlists")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    /// Configuration file
    #[arg(long, global = true, env = "SCREENCAP_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Logging level or filter directive
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format: pretty, compact or json
    #[arg(long, global = true)]
    pub log_format: Option<LogFormat>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Probe entries and print the playlist annotated with their metadata
    Metadata(MetadataArgs),
    /// Reorder entries: reachable first, then by resolution and bit rate
    Sort(SortArgs),
    /// Plan keyframe-aligned cuts and print the split script
    Split(SplitArgs),
    /// Render a thumbnail contact sheet per entry
    Screens(ScreensArgs),
}

impl Cli {
    /// Command-line values that take part in the configuration hierarchy
    pub fn config_overrides(&self) -> ConfigOverrides {
        let input = self.input();
        let mut overrides = ConfigOverrides {
            log_level: self.log_level.clone(),
            log_format: self.log_format,
            workers: input.workers,
            state_file: input.state_file.clone(),
            ..ConfigOverrides::default()
        };
        match &self.command {
            Commands::Split(args) => {
                overrides.output_dir = args.output_dir.clone();
                overrides.keyframe_script = args.keyframe_script.clone();
            }
            Commands::Screens(args) => {
                overrides.columns = args.columns;
                overrides.rows = args.rows;
            }
            Commands::Metadata(_) | Commands::Sort(_) => {}
        }
        overrides
    }

    pub fn input(&self) -> &InputArgs {
        match &self.command {
            Commands::Metadata(args) => &args.input,
            Commands::Sort(args) => &args.input,
            Commands::Split(args) => &args.input,
            Commands::Screens(args) => &args.input,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_split_overrides() {
        let cli = Cli::parse_from([
            "screencap",
            "--log-format",
            "json",
            "split",
            "trip.m3u",
            "-o",
            "/out",
            "--workers",
            "4",
        ]);
        let overrides = cli.config_overrides();
        assert_eq!(overrides.log_format, Some(LogFormat::Json));
        assert_eq!(overrides.output_dir, Some(PathBuf::from("/out")));
        assert_eq!(overrides.workers, Some(4));
        assert_eq!(overrides.columns, None);
    }

    #[test]
    fn test_grid_bounds() {
        assert!(Cli::try_parse_from(["screencap", "screens", "a.mkv", "--columns", "0"]).is_err());
        assert!(Cli::try_parse_from(["screencap", "screens", "a.mkv", "--rows", "21"]).is_err());
        let cli = Cli::try_parse_from(["screencap", "screens", "a.mkv", "--columns", "4"]).unwrap();
        assert_eq!(cli.config_overrides().columns, Some(4));
    }

    #[test]
    fn test_inputs_are_required() {
        assert!(Cli::try_parse_from(["screencap", "metadata"]).is_err());
    }
}
