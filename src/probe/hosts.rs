//! Persisted consecutive-failure ledger per remote host

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::domain::model::HostKey;
use crate::error::ScreencapResult;

/// Consecutive failed runs per host, keyed by `host:port`
///
/// Counts never decay: a host recovers only by succeeding once.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct HostLedger {
    failures: BTreeMap<String, u32>,
    #[serde(skip)]
    path: Option<PathBuf>,
}

impl HostLedger {
    /// In-memory ledger that is never written out
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from `path`; a missing file gives an empty ledger
    pub fn load(path: &Path) -> ScreencapResult<Self> {
        let mut ledger = if path.exists() {
            let content = fs::read_to_string(path)?;
            if content.trim().is_empty() {
                Self::default()
            } else {
                serde_json::from_str::<Self>(&content)?
            }
        } else {
            debug!(path = %path.display(), "no host ledger yet");
            Self::default()
        };
        ledger.path = Some(path.to_path_buf());
        Ok(ledger)
    }

    /// Write back to the file the ledger was loaded from
    pub fn save(&self) -> ScreencapResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        debug!(path = %path.display(), hosts = self.failures.len(), "saved host ledger");
        Ok(())
    }

    pub fn failures(&self, host: &HostKey) -> u32 {
        self.failures.get(&host.to_string()).copied().unwrap_or(0)
    }

    /// Hosts past the budget are skipped without any network call
    pub fn is_exhausted(&self, host: &HostKey, max_failures: u32) -> bool {
        !host.is_local() && self.failures(host) > max_failures
    }

    pub fn record_success(&mut self, host: &HostKey) {
        if self.failures.remove(&host.to_string()).is_some() {
            info!(host = %host, "host recovered");
        }
    }

    /// Count one failed run; returns the new count
    pub fn record_failure(&mut self, host: &HostKey) -> u32 {
        if host.is_local() {
            return 0;
        }
        let count = self.failures.entry(host.to_string()).or_insert(0);
        *count += 1;
        warn!(host = %host, failures = *count, "host failed");
        *count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn host(name: &str) -> HostKey {
        HostKey::Remote {
            host: name.to_string(),
            port: Some(80),
        }
    }

    #[test]
    fn test_failures_accumulate_until_success() {
        let mut ledger = HostLedger::new();
        let nas = host("nas");
        assert_eq!(ledger.record_failure(&nas), 1);
        assert_eq!(ledger.record_failure(&nas), 2);
        assert!(!ledger.is_exhausted(&nas, 2));
        assert_eq!(ledger.record_failure(&nas), 3);
        assert!(ledger.is_exhausted(&nas, 2));

        ledger.record_success(&nas);
        assert_eq!(ledger.failures(&nas), 0);
        assert!(!ledger.is_exhausted(&nas, 2));
    }

    #[test]
    fn test_local_host_is_never_counted() {
        let mut ledger = HostLedger::new();
        assert_eq!(ledger.record_failure(&HostKey::Local), 0);
        assert!(!ledger.is_exhausted(&HostKey::Local, 0));
    }

    #[test]
    fn test_persists_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state").join("hosts.json");

        let mut ledger = HostLedger::load(&path).unwrap();
        ledger.record_failure(&host("a"));
        ledger.record_failure(&host("a"));
        ledger.record_failure(&host("b"));
        ledger.save().unwrap();

        let reloaded = HostLedger::load(&path).unwrap();
        assert_eq!(reloaded.failures(&host("a")), 2);
        assert_eq!(reloaded.failures(&host("b")), 1);
        assert_eq!(reloaded.failures(&host("c")), 0);
    }
}
