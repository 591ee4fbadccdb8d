// Domain models - Core types and data structures

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, trace};
use url::Url;

use crate::domain::rules;
use crate::error::{ScreencapError, ScreencapResult};
use crate::probe::record::{ProbeRecord, ProbeStream};

/// Time in seconds, exact decimal
pub type Seconds = Decimal;

/// Where an entry's media lives: a local path or a remote URL, never both
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Locator {
    Local(PathBuf),
    Remote(Url),
}

impl Locator {
    /// Classify a playlist path line
    ///
    /// Absolute URLs with a host become remote locators. `file://` URLs and
    /// everything else are treated as local paths, so `C:\video.mkv` stays local.
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if let Ok(url) = Url::parse(text) {
            if url.scheme() == "file" {
                if let Ok(path) = url.to_file_path() {
                    return Locator::Local(path);
                }
            } else if url.has_host() {
                return Locator::Remote(url);
            }
        }
        Locator::Local(PathBuf::from(text))
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Locator::Remote(_))
    }

    pub fn as_local(&self) -> Option<&Path> {
        match self {
            Locator::Local(path) => Some(path),
            Locator::Remote(_) => None,
        }
    }

    /// Last path component, URL-decoded segments included as-is
    pub fn file_name(&self) -> String {
        match self {
            Locator::Local(path) => path
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_else(|| path.to_string_lossy().to_string()),
            Locator::Remote(url) => url
                .path_segments()
                .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
                .map(str::to_string)
                .unwrap_or_else(|| url.host_str().unwrap_or_default().to_string()),
        }
    }

    /// File name without its extension
    pub fn stem(&self) -> String {
        rules::splitext(&self.file_name()).0.to_string()
    }

    /// Lowercased extension including the dot, empty when there is none
    pub fn extension(&self) -> String {
        rules::splitext(&self.file_name()).1.to_lowercase()
    }

    /// Bucket used to parallelize reachability and metadata checks
    pub fn host_key(&self) -> HostKey {
        match self {
            Locator::Local(_) => HostKey::Local,
            Locator::Remote(url) => HostKey::Remote {
                host: url.host_str().unwrap_or_default().to_lowercase(),
                port: url.port_or_known_default(),
            },
        }
    }

    /// Join relative local paths onto the playlist directory
    pub fn resolve(&self, base_dir: Option<&Path>) -> Locator {
        match (self, base_dir) {
            (Locator::Local(path), Some(base)) if path.is_relative() => {
                Locator::Local(base.join(path))
            }
            _ => self.clone(),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Local(path) => write!(f, "{}", path.display()),
            Locator::Remote(url) => write!(f, "{}", url.as_str()),
        }
    }
}

/// Network host (or the local bucket) an entry is served from
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HostKey {
    Local,
    Remote { host: String, port: Option<u16> },
}

impl HostKey {
    pub fn is_local(&self) -> bool {
        matches!(self, HostKey::Local)
    }
}

impl fmt::Display for HostKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostKey::Local => write!(f, "local"),
            HostKey::Remote { host, port: Some(port) } => write!(f, "{}:{}", host, port),
            HostKey::Remote { host, port: None } => write!(f, "{}", host),
        }
    }
}

/// Key of a precedence chain; `ALL` lists every key, lowest precedence first
pub trait RankKey: Copy + Eq + fmt::Debug + 'static {
    const ALL: &'static [Self];
}

/// Fixed-size ordered map from source to value
///
/// Every key has a slot from construction on. Resolution walks the slots from
/// highest precedence down and returns the first populated one, so a value set
/// later from a weaker source never hides a stronger one.
#[derive(Debug, Clone, PartialEq)]
pub struct Ranked<K: RankKey, V> {
    slots: Vec<(K, Option<V>)>,
}

impl<K: RankKey, V> Ranked<K, V> {
    pub fn new() -> Self {
        Self {
            slots: K::ALL.iter().map(|&key| (key, None)).collect(),
        }
    }

    /// Replace the slot for `key`; `None` clears it
    pub fn set(&mut self, key: K, value: Option<V>) {
        if let Some(slot) = self.slots.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        }
    }

    /// Highest-precedence populated value
    pub fn get(&self) -> Option<&V> {
        self.slots.iter().rev().find_map(|(_, value)| value.as_ref())
    }

    /// Value stored for one specific source
    pub fn get_from(&self, key: K) -> Option<&V> {
        self.slots
            .iter()
            .find(|(k, _)| *k == key)
            .and_then(|(_, value)| value.as_ref())
    }

    /// Source the resolved value came from
    pub fn resolved_source(&self) -> Option<K> {
        self.slots
            .iter()
            .rev()
            .find(|(_, value)| value.is_some())
            .map(|(key, _)| *key)
    }

    /// Populated slots, lowest precedence first
    pub fn iter(&self) -> impl Iterator<Item = (K, &V)> {
        self.slots
            .iter()
            .filter_map(|(key, value)| value.as_ref().map(|v| (*key, v)))
    }
}

impl<K: RankKey, V> Default for Ranked<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Where a title came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TitleSource {
    /// Stem of the probed file name
    Filename,
    /// Container `title` tag
    Probe,
    /// `#EXTINF` label
    Playlist,
}

impl RankKey for TitleSource {
    const ALL: &'static [Self] = &[TitleSource::Filename, TitleSource::Probe, TitleSource::Playlist];
}

/// Where a duration came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DurationSource {
    /// `stop-time - start-time`
    Inferred,
    /// Container duration
    Probe,
    /// `#EXTINF` duration
    Playlist,
}

impl RankKey for DurationSource {
    const ALL: &'static [Self] = &[
        DurationSource::Inferred,
        DurationSource::Probe,
        DurationSource::Playlist,
    ];
}

/// Origin of a metadata bag value, weakest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MetaSource {
    Derived,
    Probe,
    Explicit,
}

/// One value in the metadata bag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaEntry {
    pub value: Value,
    pub source: MetaSource,
}

/// Outcome of the last probe attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryStatus {
    pub probed_at: DateTime<Utc>,
    pub reachable: bool,
}

/// One playable unit: a whole file or a time-bounded sub-range
#[derive(Debug, Clone)]
pub struct Entry {
    locator: Locator,
    /// Position in the source playlist, stable across every transformation
    pub order: usize,
    titles: Ranked<TitleSource, String>,
    durations: Ranked<DurationSource, Seconds>,
    start_time: Option<Seconds>,
    stop_time: Option<Seconds>,
    /// Extra `#EXTINF` fields after the label
    pub tags: Vec<String>,
    /// `#EXTGRP` value
    pub group: Option<String>,
    /// `#EXTVLCOPT` pairs other than the time bounds, in source order
    pub options: Vec<(String, String)>,
    metadata: BTreeMap<String, MetaEntry>,
    status: Option<EntryStatus>,
    pub output_path: Option<PathBuf>,
    pub screens_path: Option<PathBuf>,
}

impl Entry {
    pub fn new(locator: Locator, order: usize) -> Self {
        Self {
            locator,
            order,
            titles: Ranked::new(),
            durations: Ranked::new(),
            start_time: None,
            stop_time: None,
            tags: Vec::new(),
            group: None,
            options: Vec::new(),
            metadata: BTreeMap::new(),
            status: None,
            output_path: None,
            screens_path: None,
        }
    }

    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    pub fn set_title(&mut self, source: TitleSource, title: Option<String>) {
        let title = title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        self.titles.set(source, title);
    }

    /// Best known title, falling back to the locator's file stem
    pub fn get_title(&self) -> String {
        self.titles
            .get()
            .cloned()
            .unwrap_or_else(|| self.locator.stem())
    }

    pub fn title_from(&self, source: TitleSource) -> Option<&str> {
        self.titles.get_from(source).map(String::as_str)
    }

    /// True when some source populated the title, i.e. it is not the stem fallback
    pub fn has_title(&self) -> bool {
        self.titles.get().is_some()
    }

    /// Zero and negative durations mean "unknown" and clear the slot
    pub fn set_duration(&mut self, source: DurationSource, duration: Option<Seconds>) {
        self.durations
            .set(source, duration.filter(|d| d.is_sign_positive() && !d.is_zero()));
    }

    pub fn get_duration(&self) -> Option<Seconds> {
        self.durations.get().copied()
    }

    pub fn duration_from(&self, source: DurationSource) -> Option<Seconds> {
        self.durations.get_from(source).copied()
    }

    pub fn start_time(&self) -> Option<Seconds> {
        self.start_time
    }

    pub fn stop_time(&self) -> Option<Seconds> {
        self.stop_time
    }

    /// Set the sub-range bounds, keeping `start < stop`
    pub fn set_range(&mut self, start: Option<Seconds>, stop: Option<Seconds>) -> ScreencapResult<()> {
        if let Some(start) = start {
            if start.is_sign_negative() {
                return Err(ScreencapError::InvalidRange {
                    start: start.to_string(),
                    stop: stop.map(|s| s.to_string()).unwrap_or_default(),
                });
            }
        }
        if let (Some(start), Some(stop)) = (start, stop) {
            if start >= stop {
                return Err(ScreencapError::InvalidRange {
                    start: start.to_string(),
                    stop: stop.to_string(),
                });
            }
        }
        self.start_time = start;
        self.stop_time = stop;
        let inferred = match (start, stop) {
            (Some(start), Some(stop)) => Some(stop - start),
            (None, Some(stop)) => Some(stop),
            _ => None,
        };
        self.set_duration(DurationSource::Inferred, inferred);
        Ok(())
    }

    pub fn is_sub_range(&self) -> bool {
        self.start_time.is_some() || self.stop_time.is_some()
    }

    pub fn metadata(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key).map(|entry| &entry.value)
    }

    pub fn metadata_entries(&self) -> impl Iterator<Item = (&String, &MetaEntry)> {
        self.metadata.iter()
    }

    /// Merge one bag value; the first write wins unless `source` ranks higher
    ///
    /// Returns whether the bag changed.
    pub fn merge_metadata(&mut self, key: &str, value: Value, source: MetaSource) -> bool {
        if value.is_null() {
            return false;
        }
        match self.metadata.get(key) {
            Some(existing) if existing.source >= source => {
                if existing.value != value {
                    trace!(key, order = self.order, "keeping earlier metadata value");
                }
                false
            }
            _ => {
                self.metadata
                    .insert(key.to_string(), MetaEntry { value, source });
                true
            }
        }
    }

    pub fn set_metadata(&mut self, key: &str, value: Value) -> bool {
        self.merge_metadata(key, value, MetaSource::Explicit)
    }

    pub fn status(&self) -> Option<EntryStatus> {
        self.status
    }

    pub fn mark_probed(&mut self, reachable: bool) {
        self.mark_probed_at(Utc::now(), reachable);
    }

    pub fn mark_probed_at(&mut self, probed_at: DateTime<Utc>, reachable: bool) {
        self.status = Some(EntryStatus { probed_at, reachable });
    }

    /// Unknown reachability counts as reachable
    pub fn is_reachable(&self) -> bool {
        self.status.map(|s| s.reachable).unwrap_or(true)
    }

    /// Entries that already carry a playlist title and duration skip probing
    pub fn needs_probe(&self) -> bool {
        self.status.is_none()
            && !(self.title_from(TitleSource::Playlist).is_some()
                && self.duration_from(DurationSource::Playlist).is_some())
    }

    pub fn width(&self) -> u64 {
        self.metadata("width").and_then(Value::as_u64).unwrap_or(0)
    }

    pub fn height(&self) -> u64 {
        self.metadata("height").and_then(Value::as_u64).unwrap_or(0)
    }

    pub fn bit_rate(&self) -> u64 {
        self.metadata("bit_rate").and_then(Value::as_u64).unwrap_or(0)
    }

    pub fn file_size(&self) -> Option<u64> {
        self.metadata("file_size").and_then(Value::as_u64)
    }

    /// First `#EXTINF` tag, used as the preferred output name
    pub fn artist_tag(&self) -> Option<&str> {
        self.tags
            .iter()
            .map(|t| t.trim())
            .find(|t| !t.is_empty())
    }

    /// Merge a probe result without clobbering stronger values
    pub fn update_metadata(&mut self, record: &ProbeRecord) {
        self.set_title(TitleSource::Probe, record.title.clone());
        let stem = rules::splitext(rules::basename(&record.filename)).0.to_string();
        self.set_title(TitleSource::Filename, Some(stem));
        self.set_duration(DurationSource::Probe, record.duration);

        self.merge_metadata("probed_filename", json!(record.filename), MetaSource::Probe);
        if let Some(size) = record.file_size.filter(|&s| s > 0) {
            self.merge_metadata("file_size", json!(size), MetaSource::Probe);
        }
        if let Some(bit_rate) = record.bit_rate.filter(|&b| b > 0) {
            self.merge_metadata("bit_rate", json!(bit_rate), MetaSource::Probe);
        }
        if let Some(duration) = record.duration {
            self.merge_metadata("source_duration", json!(duration.to_string()), MetaSource::Probe);
        }

        if !record.chapters.is_empty() {
            let mut chapters = record.chapters.clone();
            chapters.sort_by_key(|c| c.id);
            self.merge_metadata("chapters", json!(chapters), MetaSource::Probe);
        }

        let hashes: Vec<String> = record.streams.iter().filter_map(ProbeStream::content_hash).collect();
        if !hashes.is_empty() {
            self.merge_metadata("extradata_hashes", json!(hashes), MetaSource::Probe);
        }

        if let Some(video) = record.primary_video_stream() {
            for other in record.video_streams().filter(|s| s.index != video.index) {
                debug!(
                    order = self.order,
                    stream = other.index,
                    "discarding secondary video stream"
                );
            }
            self.merge_metadata("width", json!(video.width), MetaSource::Probe);
            self.merge_metadata("height", json!(video.height), MetaSource::Probe);
            self.merge_metadata("fps", json!(video.avg_frame_rate), MetaSource::Probe);
            self.merge_metadata("nb_frames", json!(video.nb_frames), MetaSource::Probe);
            self.merge_metadata("video_codec", json!(video.codec_name), MetaSource::Probe);
        }

        let audio: Vec<&ProbeStream> = record.audio_streams().collect();
        if !audio.is_empty() {
            let languages: Vec<String> = audio
                .iter()
                .map(|s| s.language.clone().unwrap_or_else(|| "und".to_string()))
                .collect();
            let codecs: Vec<String> = audio
                .iter()
                .map(|s| s.codec_name.clone().unwrap_or_default())
                .collect();
            self.merge_metadata("audio_languages", json!(languages), MetaSource::Probe);
            self.merge_metadata("audio_codecs", json!(codecs), MetaSource::Probe);
        }

        self.refresh_labels();
    }

    /// Human-readable labels for contact sheets and annotated listings
    pub fn refresh_labels(&mut self) {
        if let Some(duration) = self.get_duration() {
            self.merge_metadata(
                "duration_label",
                json!(rules::duration_label(duration)),
                MetaSource::Derived,
            );
        }
        if let Some(size) = self.file_size() {
            self.merge_metadata("size_label", json!(rules::size_label(size)), MetaSource::Derived);
        }
        if self.width() > 0 && self.height() > 0 {
            let label = rules::quality_label(self.width(), self.height(), self.bit_rate());
            self.merge_metadata("quality_label", json!(label), MetaSource::Derived);
        }
    }
}
