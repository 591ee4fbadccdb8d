//! Per-session memo of probe outcomes

use std::collections::HashMap;

use crate::domain::model::Locator;
use crate::probe::record::ProbeRecord;

/// Cached outcome for one locator
#[derive(Debug, Clone, PartialEq)]
pub enum CacheEntry {
    Found(ProbeRecord),
    Failed,
}

/// Probe results keyed by the locator's string form
///
/// A locator is probed at most once per session; failures are remembered too.
#[derive(Debug, Default)]
pub struct MetadataCache {
    entries: HashMap<String, CacheEntry>,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(locator: &Locator) -> String {
        locator.to_string()
    }

    pub fn get(&self, locator: &Locator) -> Option<&CacheEntry> {
        self.entries.get(&Self::key(locator))
    }

    pub fn contains(&self, locator: &Locator) -> bool {
        self.entries.contains_key(&Self::key(locator))
    }

    pub fn insert_found(&mut self, locator: &Locator, record: ProbeRecord) {
        self.entries.insert(Self::key(locator), CacheEntry::Found(record));
    }

    pub fn insert_failed(&mut self, locator: &Locator) {
        self.entries.insert(Self::key(locator), CacheEntry::Failed);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str) -> ProbeRecord {
        ProbeRecord {
            filename: name.to_string(),
            title: None,
            file_size: None,
            duration: None,
            bit_rate: None,
            streams: Vec::new(),
            chapters: Vec::new(),
        }
    }

    #[test]
    fn test_found_and_failed_are_distinct() {
        let mut cache = MetadataCache::new();
        let a = Locator::parse("/v/a.mkv");
        let b = Locator::parse("http://host/b.mkv");
        assert!(cache.is_empty());

        cache.insert_found(&a, record("a.mkv"));
        cache.insert_failed(&b);

        assert!(matches!(cache.get(&a), Some(CacheEntry::Found(r)) if r.filename == "a.mkv"));
        assert_eq!(cache.get(&b), Some(&CacheEntry::Failed));
        assert!(cache.contains(&Locator::parse("http://host/b.mkv")));
        assert_eq!(cache.len(), 2);
    }
}
