//! FFmpeg contact sheet adapter
//!
//! Extracts keyframes into a single tiled image with ffmpeg, then captions
//! the corners with ImageMagick `convert`.

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::adapters::tool_runner::ToolCommand;
use crate::domain::model::Seconds;
use crate::error::{ScreencapError, ScreencapResult};
use crate::ports::{ContactSheetPort, ContactSheetRequest};

/// Durations above this many seconds skip an intro by default
pub const LONG_VIDEO_SECONDS: u32 = 1000;

/// Seconds skipped for long videos
pub const DEFAULT_SKIP_INTRO: u32 = 30;

const GRAVITIES: [&str; 4] = ["northwest", "northeast", "southwest", "southeast"];

/// Contact sheet renderer driving ffmpeg and convert
#[derive(Debug, Clone)]
pub struct FfmpegContactSheet {
    pub ffmpeg: PathBuf,
    pub convert: PathBuf,
    pub timeout: Duration,
    pub font: String,
    pub pointsize: u32,
}

impl FfmpegContactSheet {
    pub fn new(ffmpeg: PathBuf, convert: PathBuf, timeout: Duration) -> Self {
        Self {
            ffmpeg,
            convert,
            timeout,
            font: "Palatino-Bold".to_string(),
            pointsize: 32,
        }
    }

    /// Intro skip actually applied to a request
    pub fn effective_skip(request: &ContactSheetRequest) -> Seconds {
        match request.skip_intro {
            Some(skip) => skip,
            None if request.duration > Decimal::from(LONG_VIDEO_SECONDS) => {
                Decimal::from(DEFAULT_SKIP_INTRO)
            }
            None => Decimal::ZERO,
        }
    }

    /// Whole seconds between thumbnails
    pub fn seconds_per_tile(request: &ContactSheetRequest) -> u64 {
        let tiles = Decimal::from(request.columns.max(1) * request.rows.max(1));
        let span = (request.duration - Self::effective_skip(request)).max(Decimal::ZERO);
        (span / tiles).trunc().to_u64().unwrap_or(0)
    }

    pub fn ffmpeg_args(&self, request: &ContactSheetRequest, output: &Path, interactive: bool) -> Vec<String> {
        let mut args = vec!["-hide_banner".to_string(), "-y".to_string()];
        if !interactive {
            args.push("-nostdin".to_string());
        }
        let skip = Self::effective_skip(request);
        if !skip.is_zero() {
            args.push("-ss".to_string());
            args.push(skip.normalize().to_string());
        }
        args.extend(
            ["-skip_frame", "nokey", "-an", "-vsync", "0", "-i"]
                .iter()
                .map(|s| s.to_string()),
        );
        args.push(request.input.to_string());
        args.push("-vf".to_string());
        args.push(format!(
            "select='isnan(prev_selected_t)+gte(t-prev_selected_t\\,{})',tile={}x{}",
            Self::seconds_per_tile(request),
            request.columns,
            request.rows
        ));
        args.push("-frames:v".to_string());
        args.push("1".to_string());
        args.push(output.to_string_lossy().to_string());
        args
    }

    pub fn convert_args(&self, request: &ContactSheetRequest, tiles: &Path) -> Vec<String> {
        let mut args = vec![
            tiles.to_string_lossy().to_string(),
            "-resize".to_string(),
            "2000000@>".to_string(),
            "-fill".to_string(),
            "gray95".to_string(),
            "-undercolor".to_string(),
            "#00000080".to_string(),
            "-font".to_string(),
            self.font.clone(),
            "-pointsize".to_string(),
            self.pointsize.to_string(),
            "-antialias".to_string(),
        ];
        for (text, gravity) in request.annotation.iter().zip(GRAVITIES) {
            if let Some(text) = text.as_deref().filter(|t| !t.is_empty()) {
                args.push("-gravity".to_string());
                args.push(gravity.to_string());
                args.push("-annotate".to_string());
                args.push("+0+0".to_string());
                args.push(format!("  {}  ", text));
            }
        }
        args.push(request.output.to_string_lossy().to_string());
        args
    }

    fn has_annotation(request: &ContactSheetRequest) -> bool {
        request
            .annotation
            .iter()
            .any(|a| a.as_deref().map_or(false, |t| !t.is_empty()))
    }
}

#[async_trait]
impl ContactSheetPort for FfmpegContactSheet {
    async fn render(&self, request: &ContactSheetRequest) -> ScreencapResult<()> {
        let annotate = Self::has_annotation(request);
        let tiles = if annotate {
            request.output.with_extension("tiles.png")
        } else {
            request.output.clone()
        };
        info!(
            input = %request.input,
            tiles = request.columns * request.rows,
            seconds_per_tile = Self::seconds_per_tile(request),
            "extracting thumbnails"
        );

        let interactive = std::io::stdin().is_terminal();
        ToolCommand::new(self.ffmpeg.clone())
            .args(self.ffmpeg_args(request, &tiles, interactive))
            .timeout(self.timeout)
            .execute()
            .await?;
        if !annotate {
            return Ok(());
        }

        let size = tokio::fs::metadata(&tiles).await.map(|m| m.len()).unwrap_or(0);
        if size == 0 {
            return Err(ScreencapError::ToolFailed {
                tool: "ffmpeg".to_string(),
                message: format!("no thumbnails written for {}", request.input),
            });
        }

        let result = ToolCommand::new(self.convert.clone())
            .args(self.convert_args(request, &tiles))
            .timeout(self.timeout)
            .execute()
            .await;
        if let Err(e) = tokio::fs::remove_file(&tiles).await {
            debug!(path = %tiles.display(), error = %e, "could not remove tile image");
        }
        result.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Locator;

    fn request(duration: u32) -> ContactSheetRequest {
        ContactSheetRequest {
            input: Locator::parse("/v/show.mkv"),
            output: PathBuf::from("/v/show_screens.jpeg"),
            duration: Decimal::from(duration),
            columns: 6,
            rows: 5,
            skip_intro: None,
            annotation: [
                Some("Show".to_string()),
                None,
                Some("1,000 bytes".to_string()),
                Some("20:00".to_string()),
            ],
        }
    }

    fn adapter() -> FfmpegContactSheet {
        FfmpegContactSheet::new(PathBuf::from("ffmpeg"), PathBuf::from("convert"), Duration::from_secs(60))
    }

    #[test]
    fn test_long_videos_skip_intro() {
        assert_eq!(FfmpegContactSheet::effective_skip(&request(1200)), Decimal::from(30));
        assert_eq!(FfmpegContactSheet::effective_skip(&request(600)), Decimal::ZERO);
        // (1200 - 30) / 30 tiles
        assert_eq!(FfmpegContactSheet::seconds_per_tile(&request(1200)), 39);
        assert_eq!(FfmpegContactSheet::seconds_per_tile(&request(600)), 20);
    }

    #[test]
    fn test_ffmpeg_args() {
        let args = adapter().ffmpeg_args(&request(1200), Path::new("/tmp/t.png"), false);
        let line = args.join(" ");
        assert!(line.starts_with("-hide_banner -y -nostdin -ss 30 -skip_frame nokey -an -vsync 0 -i /v/show.mkv"));
        assert!(line.contains("gte(t-prev_selected_t\\,39)',tile=6x5"));
        assert!(line.ends_with("-frames:v 1 /tmp/t.png"));

        let interactive = adapter().ffmpeg_args(&request(10), Path::new("o.png"), true);
        assert!(!interactive.contains(&"-nostdin".to_string()));
        assert!(!interactive.contains(&"-ss".to_string()));
    }

    #[test]
    fn test_convert_args_place_captions_in_corners() {
        let args = adapter().convert_args(&request(1200), Path::new("/tmp/t.png"));
        let line = args.join(" ");
        assert!(line.starts_with("/tmp/t.png -resize 2000000@>"));
        assert!(line.contains("-gravity northwest -annotate +0+0   Show  "));
        assert!(!line.contains("northeast"));
        assert!(line.contains("-gravity southeast -annotate +0+0   20:00  "));
        assert!(line.ends_with("/v/show_screens.jpeg"));
    }
}
