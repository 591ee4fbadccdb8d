//! Command-line argument definitions

use std::path::PathBuf;

use clap::Args;

fn grid_size(s: &str) -> Result<u32, String> {
    clap_num::number_range(s, 1, 20)
}

fn worker_count(s: &str) -> Result<usize, String> {
    clap_num::number_range(s, 1, 256)
}

/// Inputs and probing options shared by every command
#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// Playlists, videos, or directories containing them
    #[arg(required = true, value_name = "INPUT")]
    pub inputs: Vec<PathBuf>,

    /// Concurrent host probes (default: number of CPUs)
    #[arg(long, value_parser = worker_count)]
    pub workers: Option<usize>,

    /// Host failure ledger location
    #[arg(long, value_name = "FILE")]
    pub state_file: Option<PathBuf>,
}

/// Arguments for the metadata command
#[derive(Args, Debug)]
pub struct MetadataArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Probe entries even when the playlist gives title and duration
    #[arg(long)]
    pub force: bool,

    /// Rewrite playlist files instead of printing them
    #[arg(long)]
    pub in_place: bool,
}

/// Arguments for the sort command
#[derive(Args, Debug)]
pub struct SortArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Rewrite playlist files instead of printing them
    #[arg(long)]
    pub in_place: bool,
}

/// Arguments for the split command
#[derive(Args, Debug)]
pub struct SplitArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Root directory for segment outputs
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Script printing `<frame> <timestamp>` lines for a video
    #[arg(long, value_name = "FILE")]
    pub keyframe_script: Option<PathBuf>,

    /// Cut at the requested times without looking up keyframes
    #[arg(long)]
    pub no_align: bool,

    /// Probe sources first so open-ended ranges know where the file ends
    #[arg(long)]
    pub probe: bool,

    /// Print the plan as JSON instead of a script
    #[arg(long)]
    pub json: bool,

    /// Write the script here instead of stdout
    #[arg(long, value_name = "FILE")]
    pub script: Option<PathBuf>,
}

/// Arguments for the screens command
#[derive(Args, Debug)]
pub struct ScreensArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Thumbnail columns
    #[arg(long, value_parser = grid_size)]
    pub columns: Option<u32>,

    /// Thumbnail rows
    #[arg(long, value_parser = grid_size)]
    pub rows: Option<u32>,

    /// Seconds to skip at the start (SS, MM:SS or HH:MM:SS)
    #[arg(long, value_name = "TIME")]
    pub skip_intro: Option<String>,

    /// Directory for the sheets (default: next to each video)
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Replace existing sheets
    #[arg(long)]
    pub overwrite: bool,
}
