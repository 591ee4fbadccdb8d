// Enrich interactor - Probes playlist entries, one worker per host

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::domain::model::{HostKey, Locator};
use crate::error::{ScreencapError, ScreencapResult};
use crate::playlist::Playlist;
use crate::ports::{LivenessPort, ProbePort};
use crate::probe::{CacheEntry, HostLedger, MetadataCache, ProbeRecord};

/// Limits for one probing session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    /// Host buckets probed concurrently
    pub workers: usize,
    /// Stored failures above which a host is not contacted at all
    pub max_host_failures: u32,
    /// Consecutive failures within a bucket before the rest is abandoned
    pub host_failure_budget: u32,
    /// Probe entries whose playlist already gives title and duration
    pub force: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            workers: num_cpus::get(),
            max_host_failures: 3,
            host_failure_budget: 2,
            force: false,
        }
    }
}

/// What enrichment did with one entry
#[derive(Debug, Clone, PartialEq)]
pub enum EntryOutcome {
    /// Metadata merged from a probe record
    Probed,
    /// Playlist already had what was needed
    NotNeeded,
    /// Marked unreachable
    Failed { reason: String },
}

/// Per-entry outcomes of one `enrich` call, keyed by entry order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrichReport {
    pub outcomes: BTreeMap<usize, EntryOutcome>,
}

impl EnrichReport {
    pub fn processed(&self) -> usize {
        self.count(|o| matches!(o, EntryOutcome::Probed))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, EntryOutcome::NotNeeded))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, EntryOutcome::Failed { .. }))
    }

    fn count(&self, pred: impl Fn(&EntryOutcome) -> bool) -> usize {
        self.outcomes.values().filter(|o| pred(o)).count()
    }
}

impl fmt::Display for EnrichReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} processed, {} skipped, {} failed",
            self.processed(),
            self.skipped(),
            self.failed()
        )
    }
}

/// Everything one worker learned about its host
struct BucketResult {
    host: HostKey,
    alive: bool,
    results: Vec<(Locator, ScreencapResult<ProbeRecord>)>,
}

/// Probing state for one run: the cache and the host ledger
///
/// Only the coordinator touches either; workers hand back plain results.
#[derive(Debug)]
pub struct ProbeSession {
    cache: MetadataCache,
    ledger: HostLedger,
    settings: SessionSettings,
}

impl ProbeSession {
    pub fn new(ledger: HostLedger, settings: SessionSettings) -> Self {
        Self {
            cache: MetadataCache::new(),
            ledger,
            settings,
        }
    }

    pub fn cache(&self) -> &MetadataCache {
        &self.cache
    }

    pub fn ledger(&self) -> &HostLedger {
        &self.ledger
    }

    /// Persist the ledger where it was loaded from
    pub fn save_ledger(&self) -> ScreencapResult<()> {
        self.ledger.save()
    }

    /// Probe every entry that needs it and merge the results
    ///
    /// Every considered entry ends up either carrying fresh metadata or marked
    /// unreachable. Entries keep their `order` sort afterwards.
    pub async fn enrich(
        &mut self,
        playlist: &mut Playlist,
        probe: Arc<dyn ProbePort>,
        liveness: Arc<dyn LivenessPort>,
    ) -> ScreencapResult<EnrichReport> {
        let mut report = EnrichReport::default();
        let mut targets: Vec<(usize, Locator)> = Vec::new();
        for entry in playlist.iter() {
            if self.settings.force || entry.needs_probe() {
                targets.push((entry.order, playlist.source_of(entry)));
            } else {
                report.outcomes.insert(entry.order, EntryOutcome::NotNeeded);
            }
        }

        let mut reasons: HashMap<Locator, String> = HashMap::new();
        let mut buckets: BTreeMap<HostKey, Vec<Locator>> = BTreeMap::new();
        for (_, locator) in &targets {
            if self.cache.contains(locator) {
                continue;
            }
            let host = locator.host_key();
            if self.ledger.is_exhausted(&host, self.settings.max_host_failures) {
                if !reasons.contains_key(locator) {
                    debug!(host = %host, locator = %locator, "host over its failure budget, skipping");
                    reasons.insert(
                        locator.clone(),
                        ScreencapError::HostExhausted { host: host.to_string() }.to_string(),
                    );
                }
                continue;
            }
            let bucket = buckets.entry(host).or_default();
            if !bucket.contains(locator) {
                bucket.push(locator.clone());
            }
        }

        if !buckets.is_empty() {
            info!(
                hosts = buckets.len(),
                locators = buckets.values().map(Vec::len).sum::<usize>(),
                "probing"
            );
        }
        let finished = self.run_workers(buckets, probe, liveness).await;
        for bucket in finished {
            self.merge_bucket(bucket, &mut reasons);
        }

        for (order, locator) in targets {
            let Some(entry) = playlist.get_mut(order) else {
                continue;
            };
            let outcome = match self.cache.get(&locator) {
                Some(CacheEntry::Found(record)) => {
                    entry.update_metadata(record);
                    entry.mark_probed(true);
                    EntryOutcome::Probed
                }
                Some(CacheEntry::Failed) | None => {
                    entry.mark_probed(false);
                    let reason = reasons
                        .get(&locator)
                        .cloned()
                        .unwrap_or_else(|| format!("probing {} failed earlier in this session", locator));
                    EntryOutcome::Failed { reason }
                }
            };
            report.outcomes.insert(order, outcome);
        }

        playlist.sort_by_order();
        info!("enrichment finished: {}", report);
        Ok(report)
    }

    async fn run_workers(
        &self,
        buckets: BTreeMap<HostKey, Vec<Locator>>,
        probe: Arc<dyn ProbePort>,
        liveness: Arc<dyn LivenessPort>,
    ) -> Vec<BucketResult> {
        let semaphore = Arc::new(Semaphore::new(self.settings.workers.max(1)));
        let budget = self.settings.host_failure_budget.max(1);
        let mut tasks = JoinSet::new();

        for (host, locators) in buckets {
            let semaphore = Arc::clone(&semaphore);
            let probe = Arc::clone(&probe);
            let liveness = Arc::clone(&liveness);
            tasks.spawn(async move {
                // never closed
                let _permit = semaphore.acquire_owned().await.ok();
                probe_bucket(host, locators, probe, liveness, budget).await
            });
        }

        let mut finished = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(bucket) => finished.push(bucket),
                Err(e) => error!(error = %e, "probe worker aborted"),
            }
        }
        finished
    }

    fn merge_bucket(&mut self, bucket: BucketResult, reasons: &mut HashMap<Locator, String>) {
        let mut successes = 0;
        let mut failures = 0;
        for (locator, result) in bucket.results {
            match result {
                Ok(record) => {
                    successes += 1;
                    self.cache.insert_found(&locator, record);
                }
                Err(e) => {
                    failures += 1;
                    self.cache.insert_failed(&locator);
                    reasons.insert(locator, e.to_string());
                }
            }
        }

        if successes > 0 {
            self.ledger.record_success(&bucket.host);
        } else if failures > 0 || !bucket.alive {
            self.ledger.record_failure(&bucket.host);
        }
    }
}

/// Worker body: liveness check, then sequential probes
///
/// Remote hosts give up after `budget` consecutive failures; local files never do.
async fn probe_bucket(
    host: HostKey,
    locators: Vec<Locator>,
    probe: Arc<dyn ProbePort>,
    liveness: Arc<dyn LivenessPort>,
    budget: u32,
) -> BucketResult {
    if !host.is_local() && !liveness.is_alive(&host).await {
        warn!(host = %host, entries = locators.len(), "host unreachable, skipping its entries");
        let results = locators
            .into_iter()
            .map(|locator| {
                let err = ScreencapError::ProbeFailure {
                    locator: locator.to_string(),
                    message: format!("host {} is unreachable", host),
                };
                (locator, Err(err))
            })
            .collect();
        return BucketResult {
            host,
            alive: false,
            results,
        };
    }

    let mut results = Vec::with_capacity(locators.len());
    let mut consecutive = 0u32;
    for locator in locators {
        if !host.is_local() && consecutive >= budget {
            let err = ScreencapError::HostExhausted { host: host.to_string() };
            results.push((locator, Err(err)));
            continue;
        }
        match probe.probe(&locator).await {
            Ok(record) => {
                consecutive = 0;
                results.push((locator, Ok(record)));
            }
            Err(e) => {
                consecutive += 1;
                let err = if e.is_per_entry() {
                    e
                } else {
                    ScreencapError::ProbeFailure {
                        locator: locator.to_string(),
                        message: e.to_string(),
                    }
                };
                warn!(host = %host, locator = %locator, error = %err, "probe failed");
                results.push((locator, Err(err)));
            }
        }
    }
    BucketResult {
        host,
        alive: true,
        results,
    }
}
