//! FFprobe adapters for metadata probing and keyframe listing
//!
//! Both shell out to `ffprobe` and decode its output; nothing is decoded
//! in-process.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::adapters::tool_runner::{resolve_tool, ToolCommand};
use crate::domain::model::Locator;
use crate::error::{ScreencapError, ScreencapResult};
use crate::planner::keyframes::{FramePair, KeyframeIndex};
use crate::ports::{KeyframePort, ProbePort};
use crate::probe::record::ProbeRecord;

/// Arguments placed before the input for metadata probing
pub const PROBE_ARGS: &[&str] = &[
    "-hide_banner",
    "-v",
    "error",
    "-show_format",
    "-show_streams",
    "-show_chapters",
    "-show_data_hash",
    "SHA256",
    "-print_format",
    "json",
];

/// FFprobe-based metadata prober
#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    ffprobe_path: PathBuf,
    timeout: Duration,
}

impl FfprobeProbe {
    pub fn new(ffprobe_path: PathBuf, timeout: Duration) -> Self {
        Self {
            ffprobe_path,
            timeout,
        }
    }

    /// Find ffprobe on `PATH` unless a path is configured
    pub fn discover(configured: Option<&Path>, timeout: Duration) -> ScreencapResult<Self> {
        Ok(Self::new(resolve_tool("ffprobe", configured)?, timeout))
    }

    pub fn command(&self, locator: &Locator) -> ToolCommand {
        let mut cmd = ToolCommand::new(self.ffprobe_path.clone());
        cmd.args(PROBE_ARGS.iter().copied())
            .arg(locator.to_string())
            .timeout(self.timeout);
        cmd
    }
}

#[async_trait]
impl ProbePort for FfprobeProbe {
    async fn probe(&self, locator: &Locator) -> ScreencapResult<ProbeRecord> {
        let output = self
            .command(locator)
            .execute()
            .await
            .map_err(|e| ScreencapError::ProbeFailure {
                locator: locator.to_string(),
                message: e.to_string(),
            })?;
        let mut record = ProbeRecord::from_ffprobe_json(&output.stdout).map_err(|e| {
            ScreencapError::ProbeFailure {
                locator: locator.to_string(),
                message: e.to_string(),
            }
        })?;
        if record.filename.is_empty() {
            record.filename = locator.to_string();
        }
        debug!(locator = %locator, streams = record.streams.len(), "probed");
        Ok(record)
    }
}

/// Keyframe lister reading packet flags of the first video stream
///
/// Reads the entire file, so it is only run for sources that are split.
#[derive(Debug, Clone)]
pub struct FfprobeKeyframes {
    ffprobe_path: PathBuf,
    timeout: Duration,
}

impl FfprobeKeyframes {
    pub fn new(ffprobe_path: PathBuf, timeout: Duration) -> Self {
        Self {
            ffprobe_path,
            timeout,
        }
    }

    pub fn command(&self, path: &Path) -> ToolCommand {
        let mut cmd = ToolCommand::new(self.ffprobe_path.clone());
        cmd.args([
            "-hide_banner",
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "packet=pts_time,flags",
            "-of",
            "csv=p=0",
        ])
        .arg(path.to_string_lossy())
        .timeout(self.timeout);
        cmd
    }
}

/// Turn `pts_time,flags` packet rows into keyframe pairs
///
/// Packets are numbered from 1 in stream order; rows without a timestamp still
/// count as frames.
pub fn parse_packet_rows(text: &str) -> ScreencapResult<KeyframeIndex> {
    let mut pairs = Vec::new();
    let mut frame_number = 0u64;
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        frame_number += 1;
        let mut fields = line.split(',');
        let pts = fields.next().unwrap_or("");
        let flags = fields.next().unwrap_or("");
        if !flags.starts_with('K') {
            continue;
        }
        if let Ok(timestamp) = Decimal::from_str(pts) {
            pairs.push(FramePair::new(frame_number, timestamp.normalize()));
        }
    }
    KeyframeIndex::new(pairs)
}

#[async_trait]
impl KeyframePort for FfprobeKeyframes {
    async fn list_keyframes(&self, path: &Path) -> ScreencapResult<KeyframeIndex> {
        info!(path = %path.display(), "detecting keyframes (reads the entire video)");
        let output = self.command(path).execute().await?;
        let index = parse_packet_rows(&output.stdout)?;
        debug!(path = %path.display(), keyframes = index.len(), "keyframes listed");
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::keyframes::{Direction, KeyframeQuery};

    #[test]
    fn test_probe_command_line() {
        let probe = FfprobeProbe::new(PathBuf::from("/usr/bin/ffprobe"), Duration::from_secs(5));
        let cmd = probe.command(&Locator::parse("http://h/a.mkv"));
        let args = cmd.get_args();
        assert_eq!(args.first().map(String::as_str), Some("-hide_banner"));
        assert!(args.windows(2).any(|w| w[0] == "-show_data_hash" && w[1] == "SHA256"));
        assert_eq!(args.last().map(String::as_str), Some("http://h/a.mkv"));
    }

    #[test]
    fn test_parse_packet_rows() {
        let rows = "0.000000,K__\n0.040000,___\nN/A,___\n0.120000,K_\n\n0.160000,__\n";
        let index = parse_packet_rows(rows).unwrap();
        assert_eq!(index.len(), 2);
        let pair = index
            .find(KeyframeQuery::Timestamp(Decimal::from_str("0.13").unwrap()), Direction::Before)
            .unwrap();
        assert_eq!(pair.frame_number, 4);
        assert_eq!(pair.timestamp, Decimal::from_str("0.12").unwrap());
    }
}
