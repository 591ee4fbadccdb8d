//! Probe records decoded from ffprobe JSON output

use std::cmp::Reverse;
use std::collections::HashMap;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::model::Seconds;
use crate::error::ScreencapResult;

/// Structured metadata for one probed file or URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeRecord {
    /// File name as the prober reported it
    pub filename: String,
    /// Container `title` tag
    pub title: Option<String>,
    /// Size in bytes
    pub file_size: Option<u64>,
    /// Container duration
    pub duration: Option<Seconds>,
    /// Overall bit rate in bits per second
    pub bit_rate: Option<u64>,
    pub streams: Vec<ProbeStream>,
    pub chapters: Vec<ProbeChapter>,
}

/// One elementary stream
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProbeStream {
    pub index: u32,
    pub codec_type: String,
    pub codec_name: Option<String>,
    pub width: Option<u64>,
    pub height: Option<u64>,
    pub bit_rate: Option<u64>,
    /// Rational frame rate as reported, e.g. `30000/1001`
    pub avg_frame_rate: Option<String>,
    pub nb_frames: Option<u64>,
    pub language: Option<String>,
    /// `<TYPE>:<hex>` digest of the codec extradata
    pub extradata_hash: Option<String>,
}

impl ProbeStream {
    pub fn is_video(&self) -> bool {
        self.codec_type == "video"
    }

    pub fn is_audio(&self) -> bool {
        self.codec_type == "audio"
    }

    /// `<codec_type>:<TYPE>:<HEX>`, used to recognise identical encodes
    pub fn content_hash(&self) -> Option<String> {
        let hash = self.extradata_hash.as_deref()?;
        let (kind, digest) = hash.split_once(':')?;
        Some(format!(
            "{}:{}:{}",
            self.codec_type,
            kind.to_uppercase(),
            digest.to_uppercase()
        ))
    }
}

/// Chapter marker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeChapter {
    pub id: i64,
    pub start_time: Option<Seconds>,
    pub end_time: Option<Seconds>,
    pub title: Option<String>,
}

impl ProbeRecord {
    /// Decode `ffprobe -print_format json` output
    pub fn from_ffprobe_json(text: &str) -> ScreencapResult<Self> {
        let output: FfprobeOutput = serde_json::from_str(text)?;
        Ok(output.into_record())
    }

    pub fn video_streams(&self) -> impl Iterator<Item = &ProbeStream> {
        self.streams.iter().filter(|s| s.is_video())
    }

    pub fn audio_streams(&self) -> impl Iterator<Item = &ProbeStream> {
        self.streams.iter().filter(|s| s.is_audio())
    }

    /// Video stream with the highest bit rate, then the largest width
    pub fn primary_video_stream(&self) -> Option<&ProbeStream> {
        self.video_streams().min_by_key(|s| {
            (
                Reverse(s.bit_rate.unwrap_or(0)),
                Reverse(s.width.unwrap_or(0)),
                s.index,
            )
        })
    }
}

// ffprobe reports most numbers as strings, so the raw structs keep them as
// strings and the conversion parses what it can.

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: FfprobeFormat,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
    #[serde(default)]
    chapters: Vec<FfprobeChapter>,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeFormat {
    filename: Option<String>,
    size: Option<String>,
    duration: Option<String>,
    bit_rate: Option<String>,
    #[serde(default)]
    tags: FfprobeTags,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    #[serde(default)]
    index: u32,
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u64>,
    height: Option<u64>,
    bit_rate: Option<String>,
    avg_frame_rate: Option<String>,
    nb_frames: Option<String>,
    extradata_hash: Option<String>,
    #[serde(default)]
    tags: FfprobeTags,
}

#[derive(Debug, Deserialize)]
struct FfprobeChapter {
    id: i64,
    start_time: Option<String>,
    end_time: Option<String>,
    #[serde(default)]
    tags: FfprobeTags,
}

/// Free-form tag map; Matroska writes upper-case names, others lower-case
#[derive(Debug, Default, Deserialize)]
#[serde(transparent)]
struct FfprobeTags(HashMap<String, String>);

impl FfprobeTags {
    /// Exact key first, then any spelling differing only in case
    fn get(&self, key: &str) -> Option<String> {
        self.0
            .get(key)
            .or_else(|| {
                self.0
                    .iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(key))
                    .map(|(_, v)| v)
            })
            .cloned()
    }
}

impl FfprobeOutput {
    fn into_record(self) -> ProbeRecord {
        let format = self.format;
        ProbeRecord {
            filename: format.filename.unwrap_or_default(),
            title: format.tags.get("title").filter(|t| !t.trim().is_empty()),
            file_size: parse_u64(format.size.as_deref()),
            duration: parse_seconds(format.duration.as_deref()),
            bit_rate: parse_u64(format.bit_rate.as_deref()),
            streams: self.streams.into_iter().map(FfprobeStream::into_stream).collect(),
            chapters: self
                .chapters
                .into_iter()
                .map(|c| ProbeChapter {
                    id: c.id,
                    start_time: parse_seconds(c.start_time.as_deref()),
                    end_time: parse_seconds(c.end_time.as_deref()),
                    title: c.tags.get("title"),
                })
                .collect(),
        }
    }
}

impl FfprobeStream {
    fn into_stream(self) -> ProbeStream {
        ProbeStream {
            index: self.index,
            codec_type: self.codec_type.unwrap_or_default(),
            codec_name: self.codec_name,
            width: self.width,
            height: self.height,
            bit_rate: parse_u64(self.bit_rate.as_deref()),
            avg_frame_rate: self.avg_frame_rate.filter(|r| r != "0/0"),
            nb_frames: parse_u64(self.nb_frames.as_deref()),
            language: self.tags.get("language"),
            extradata_hash: self.extradata_hash,
        }
    }
}

fn parse_u64(text: Option<&str>) -> Option<u64> {
    text.and_then(|t| t.trim().parse().ok())
}

fn parse_seconds(text: Option<&str>) -> Option<Seconds> {
    text.and_then(|t| Decimal::from_str(t.trim()).ok())
        .map(|d| d.normalize())
}
