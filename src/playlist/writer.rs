//! Canonical M3U serialization

use serde_json::Value;

use crate::domain::model::{DurationSource, Entry};
use crate::playlist::token::{GROUP_PREFIX, HEADER, INFO_PREFIX, OPTION_PREFIX, START_TIME_KEY, STOP_TIME_KEY};
use crate::playlist::Playlist;

/// Serialization switches
#[derive(Debug, Clone, Copy, Default)]
pub struct SerializeOptions {
    /// Emit the metadata bag as `# key: value` comments
    pub annotate: bool,
}

impl Playlist {
    /// Lines of the playlist in canonical directive order
    pub fn to_m3u_lines(&self, options: &SerializeOptions) -> Vec<String> {
        let mut lines = vec![self.header.clone().unwrap_or_else(|| HEADER.to_string())];
        for entry in &self.entries {
            lines.push(String::new());
            for comment in self.comments.iter().filter(|c| c.before == Some(entry.order)) {
                // annotations from an earlier run are replaced, not repeated
                if options.annotate && is_annotation_of(entry, &comment.text) {
                    continue;
                }
                lines.push(format!("# {}", comment.text));
            }
            if options.annotate {
                lines.extend(annotation_lines(entry));
            }
            lines.extend(entry_lines(entry));
        }
        let trailing: Vec<_> = self.comments.iter().filter(|c| c.before.is_none()).collect();
        if !trailing.is_empty() {
            lines.push(String::new());
            lines.extend(trailing.into_iter().map(|c| format!("# {}", c.text)));
        }
        lines
    }

    pub fn to_m3u_string(&self, options: &SerializeOptions) -> String {
        let mut text = self.to_m3u_lines(options).join("\n");
        text.push('\n');
        text
    }
}

/// Directive and path lines for one entry
pub fn entry_lines(entry: &Entry) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(start) = entry.start_time() {
        lines.push(format!("{}{}={}", OPTION_PREFIX, START_TIME_KEY, start.normalize()));
    }
    if let Some(stop) = entry.stop_time() {
        lines.push(format!("{}{}={}", OPTION_PREFIX, STOP_TIME_KEY, stop.normalize()));
    }
    for (key, value) in &entry.options {
        lines.push(format!("{}{}={}", OPTION_PREFIX, key, value));
    }

    // an inferred duration is implied by the range and never written out
    let duration = entry
        .duration_from(DurationSource::Playlist)
        .or_else(|| entry.duration_from(DurationSource::Probe));
    if entry.has_title() || duration.is_some() || !entry.tags.is_empty() {
        let mut info = format!(
            "{}{},{}",
            INFO_PREFIX,
            duration
                .map(|d| d.normalize().to_string())
                .unwrap_or_else(|| "-1".to_string()),
            if entry.has_title() { entry.get_title() } else { String::new() }
        );
        for tag in &entry.tags {
            info.push(',');
            info.push_str(tag);
        }
        lines.push(info);
    }

    if let Some(group) = &entry.group {
        lines.push(format!("{}{}", GROUP_PREFIX, group));
    }
    lines.push(entry.locator().to_string());
    lines
}

fn annotation_lines(entry: &Entry) -> Vec<String> {
    entry
        .metadata_entries()
        .map(|(key, meta)| match &meta.value {
            Value::String(text) => format!("# {}: {}", key, text),
            other => format!("# {}: {}", key, other),
        })
        .collect()
}

/// Whether a comment reads `key: value` for a key in the entry's metadata bag
fn is_annotation_of(entry: &Entry, text: &str) -> bool {
    match text.split_once(": ") {
        Some((key, _)) => entry.metadata_entries().any(|(k, _)| k == key),
        None => false,
    }
}
