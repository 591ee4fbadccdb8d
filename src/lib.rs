//! Screencap Library
//!
//! Playlist model, metadata enrichment and keyframe-aligned split planning for
//! video collections described by extended M3U playlists. Media work itself is
//! left to ffprobe, ffmpeg, ImageMagick and mkvmerge.

pub mod adapters;
pub mod app;
pub mod cli;
pub mod config_initialization;
pub mod domain;
pub mod error;
pub mod planner;
pub mod playlist;
pub mod ports;
pub mod probe;
pub mod utils;

// Re-export commonly used types
pub use domain::model::{Entry, HostKey, Locator, Seconds};
pub use error::{ScreencapError, ScreencapResult};
pub use playlist::Playlist;
