//! Extended M3U playlists: parsing, grouping, sorting and serialization

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::domain::model::{Entry, HostKey, Locator};
use crate::domain::rules;
use crate::error::ScreencapResult;
use crate::planner::splitter::SplitPlan;
use crate::utils::path::physical_locator;

pub mod parser;
pub mod token;
pub mod writer;

pub use writer::SerializeOptions;

/// A comment line that is kept but not interpreted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FloatingComment {
    /// `order` of the entry the comment precedes; `None` after the last entry
    pub before: Option<usize>,
    pub text: String,
}

/// Ordered entries plus the lines that do not belong to any entry
#[derive(Debug, Clone, Default)]
pub struct Playlist {
    pub header: Option<String>,
    entries: Vec<Entry>,
    pub comments: Vec<FloatingComment>,
    /// Directory relative local paths are resolved against
    pub base_dir: Option<PathBuf>,
}

impl Playlist {
    pub fn parse(text: &str) -> ScreencapResult<Self> {
        parser::parse_tokens(token::tokenize(text)?)
    }

    pub fn parse_lines<I, S>(lines: I) -> ScreencapResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tokens = Vec::new();
        for (index, line) in lines.into_iter().enumerate() {
            let line = line.as_ref();
            let line = if index == 0 {
                line.strip_prefix('\u{feff}').unwrap_or(line)
            } else {
                line
            };
            if let Some(token) = token::classify_line(index + 1, line)? {
                tokens.push(token);
            }
        }
        parser::parse_tokens(tokens)
    }

    /// Read a playlist file; relative entries resolve against its directory
    pub fn load(path: &Path) -> ScreencapResult<Self> {
        let text = fs::read_to_string(path)?;
        let mut playlist = Self::parse(&text)?;
        playlist.base_dir = path.parent().map(Path::to_path_buf);
        info!(path = %path.display(), entries = playlist.len(), "loaded playlist");
        Ok(playlist)
    }

    /// Playlist holding one whole-file entry per locator
    pub fn from_locators(locators: impl IntoIterator<Item = Locator>) -> Self {
        Self {
            entries: locators
                .into_iter()
                .enumerate()
                .map(|(order, locator)| Entry::new(locator, order))
                .collect(),
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Entry> {
        self.entries.iter_mut()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn get(&self, order: usize) -> Option<&Entry> {
        self.entries.iter().find(|e| e.order == order)
    }

    pub fn get_mut(&mut self, order: usize) -> Option<&mut Entry> {
        self.entries.iter_mut().find(|e| e.order == order)
    }

    /// Entry locator with relative local paths joined onto `base_dir`
    pub fn source_of(&self, entry: &Entry) -> Locator {
        entry.locator().resolve(self.base_dir.as_deref())
    }

    /// Entries bucketed by the host serving them
    pub fn by_host(&self) -> BTreeMap<HostKey, Vec<&Entry>> {
        let mut buckets: BTreeMap<HostKey, Vec<&Entry>> = BTreeMap::new();
        for entry in &self.entries {
            buckets
                .entry(self.source_of(entry).host_key())
                .or_default()
                .push(entry);
        }
        buckets
    }

    /// Entries grouped by the physical file they cut, groups in order of
    /// first appearance; each group keeps the first spelling of its source
    pub fn by_source(&self) -> Vec<(Locator, Vec<&Entry>)> {
        let mut groups: Vec<(Locator, Locator, Vec<&Entry>)> = Vec::new();
        for entry in &self.entries {
            let source = self.source_of(entry);
            let physical = physical_locator(&source);
            match groups.iter_mut().find(|(p, _, _)| *p == physical) {
                Some((_, _, members)) => members.push(entry),
                None => groups.push((physical, source, vec![entry])),
            }
        }
        groups
            .into_iter()
            .map(|(_, source, members)| (source, members))
            .collect()
    }

    /// Reachable first, then wider, then higher bit rate; `order` breaks ties
    pub fn sort_by_quality(&mut self) {
        self.entries.sort_by_key(rules::video_quality_key);
    }

    pub fn sort_by_order(&mut self) {
        self.entries.sort_by_key(|e| e.order);
    }

    /// Record each planned output path on its entry
    pub fn apply_plan(&mut self, plan: &SplitPlan) {
        for item in &plan.items {
            if let Some(entry) = self.get_mut(item.order) {
                entry.output_path = Some(item.output_path.clone());
            }
        }
    }
}

impl<'a> IntoIterator for &'a Playlist {
    type Item = &'a Entry;
    type IntoIter = std::slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
