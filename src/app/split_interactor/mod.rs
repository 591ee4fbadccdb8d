// Split interactor - Plans keyframe-aligned cuts and renders the split script

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::model::{Entry, Locator};
use crate::domain::rules;
use crate::error::ScreencapResult;
use crate::planner::{KeyframeIndex, ScriptWriter, SplitPlan, SplitPlanner};
use crate::playlist::Playlist;
use crate::ports::KeyframePort;
use crate::utils::time::format_seconds;

/// Plans for every split source plus the rendered script
#[derive(Debug, Clone, Serialize)]
pub struct SplitOutcome {
    pub plans: Vec<SplitPlan>,
    #[serde(skip)]
    pub script: String,
    /// Entries left alone because they cover their whole file
    pub whole_files: usize,
}

impl SplitOutcome {
    pub fn warning_count(&self) -> usize {
        self.plans.iter().map(|p| p.warnings.len()).sum()
    }
}

/// Interactor for the split use case
pub struct SplitInteractor {
    keyframe_port: Option<Arc<dyn KeyframePort>>,
    planner: SplitPlanner,
    writer: ScriptWriter,
}

impl SplitInteractor {
    /// `keyframe_port` is optional; without it cuts stay where they were asked
    pub fn new(
        keyframe_port: Option<Arc<dyn KeyframePort>>,
        planner: SplitPlanner,
        writer: ScriptWriter,
    ) -> Self {
        Self {
            keyframe_port,
            planner,
            writer,
        }
    }

    /// Plan every source with sub-range entries and record output paths
    pub async fn execute(&self, playlist: &mut Playlist) -> ScreencapResult<SplitOutcome> {
        let planner = self.planner.clone().with_base_dir(playlist.base_dir.clone());
        let mut plans = Vec::new();
        let mut whole_files = 0;

        for (source, members) in playlist.by_source() {
            let ranges: Vec<&Entry> = members.iter().copied().filter(|e| e.is_sub_range()).collect();
            whole_files += members.len() - ranges.len();
            if ranges.is_empty() {
                debug!(source = %source, "no sub-ranges, nothing to split");
                continue;
            }

            let index = self.keyframes_for(&source).await;
            let plan = planner.plan(ranges, index.as_ref())?;
            for warning in &plan.warnings {
                warn!(source = %source, "{}", warning);
            }
            for item in &plan.items {
                debug!(
                    order = item.order,
                    start = %item.aligned_start.map(format_seconds).unwrap_or_default(),
                    stop = %item.aligned_stop.map(format_seconds).unwrap_or_default(),
                    output = %item.output_path.display(),
                    "planned segment"
                );
            }
            plans.push(plan);
        }

        for plan in &plans {
            playlist.apply_plan(plan);
        }
        let script = self.writer.render_all(&plans)?;
        let outcome = SplitOutcome {
            plans,
            script,
            whole_files,
        };
        info!(
            sources = outcome.plans.len(),
            segments = outcome.plans.iter().map(|p| p.items.len()).sum::<usize>(),
            warnings = outcome.warning_count(),
            "split planned"
        );
        Ok(outcome)
    }

    /// Keyframes matter only for local files split by the remux tool
    async fn keyframes_for(&self, source: &Locator) -> Option<KeyframeIndex> {
        let port = self.keyframe_port.as_ref()?;
        let path = source.as_local()?;
        if !rules::needs_remux(&source.extension()) {
            return None;
        }
        match port.list_keyframes(path).await {
            Ok(index) if !index.is_empty() => Some(index),
            Ok(_) => {
                warn!(source = %source, "no keyframes listed, cuts stay unaligned");
                None
            }
            Err(e) => {
                warn!(source = %source, error = %e, "keyframe listing failed, cuts stay unaligned");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScreencapError;
    use async_trait::async_trait;
    use std::path::{Path, PathBuf};
    use std::str::FromStr;
    use std::sync::Mutex;

    struct FixedKeyframes {
        listing: &'static str,
        asked: Mutex<Vec<PathBuf>>,
    }

    #[async_trait]
    impl KeyframePort for FixedKeyframes {
        async fn list_keyframes(&self, path: &Path) -> ScreencapResult<KeyframeIndex> {
            self.asked.lock().unwrap().push(path.to_path_buf());
            if self.listing.is_empty() {
                return Err(ScreencapError::ToolFailed {
                    tool: "keyframes".to_string(),
                    message: "boom".to_string(),
                });
            }
            KeyframeIndex::parse_listing(self.listing)
        }
    }

    const PLAYLIST: &str = "#EXTM3U
#EXTVLCOPT:start-time=10
#EXTVLCOPT:stop-time=20
/v/trip.mkv
#EXTVLCOPT:start-time=20
#EXTVLCOPT:stop-time=30
/v/trip.mkv
/v/whole.mkv
#EXTVLCOPT:start-time=5
http://nas/v/remote.mkv
";

    fn interactor(listing: &'static str) -> (SplitInteractor, Arc<FixedKeyframes>) {
        let port = Arc::new(FixedKeyframes {
            listing,
            asked: Mutex::new(Vec::new()),
        });
        let interactor = SplitInteractor::new(
            Some(port.clone() as Arc<dyn KeyframePort>),
            SplitPlanner::new("/out"),
            ScriptWriter::default(),
        );
        (interactor, port)
    }

    #[tokio::test]
    async fn test_plans_sources_with_ranges() {
        let mut playlist = Playlist::parse(PLAYLIST).unwrap();
        let (interactor, port) = interactor("1 0\n238 9.5\n495 19.8\n750 30");
        let outcome = interactor.execute(&mut playlist).await.unwrap();

        assert_eq!(outcome.plans.len(), 2);
        assert_eq!(outcome.whole_files, 1);
        // remote sources are never scanned for keyframes
        assert_eq!(*port.asked.lock().unwrap(), vec![PathBuf::from("/v/trip.mkv")]);

        let trip = &outcome.plans[0];
        let d = |s: &str| rust_decimal::Decimal::from_str(s).unwrap();
        assert_eq!(trip.items[0].aligned_start, Some(d("9.5")));
        assert_eq!(trip.items[0].aligned_stop, Some(d("19.8")));
        assert_eq!(trip.items[1].aligned_start, Some(d("19.8")));

        assert_eq!(
            playlist.get(0).unwrap().output_path,
            Some(PathBuf::from("/out/trip_Scene-001.MKV"))
        );
        assert!(playlist.get(2).unwrap().output_path.is_none());
        assert!(outcome.script.starts_with("#! /usr/bin/env bash\nset -e\n"));
        assert!(outcome.script.contains("mkvmerge @/v/trip.mkv.options"));
        assert!(outcome.script.contains("cat << EOF"));
    }

    #[tokio::test]
    async fn test_failed_listing_plans_unaligned() {
        let mut playlist = Playlist::parse(PLAYLIST).unwrap();
        let (interactor, _) = interactor("");
        let outcome = interactor.execute(&mut playlist).await.unwrap();

        let trip = &outcome.plans[0];
        assert_eq!(trip.items[0].aligned_start, Some(rust_decimal::Decimal::from(10)));
        assert_eq!(trip.items[1].aligned_start, Some(rust_decimal::Decimal::from(20)));
        assert_eq!(outcome.warning_count(), 0);
    }

    #[tokio::test]
    async fn test_json_dump_has_items() {
        let mut playlist = Playlist::parse(PLAYLIST).unwrap();
        let interactor = SplitInteractor::new(None, SplitPlanner::new("/out"), ScriptWriter::default());
        let outcome = interactor.execute(&mut playlist).await.unwrap();
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["plans"][0]["items"].as_array().unwrap().len(), 2);
        assert!(json.get("script").is_none());
    }

    #[tokio::test]
    async fn test_two_spellings_of_one_file_share_a_plan() {
        let text = "#EXTM3U\n#EXTVLCOPT:start-time=0\n#EXTVLCOPT:stop-time=20\n/v/trip.mkv\n\
                    #EXTVLCOPT:start-time=10\n#EXTVLCOPT:stop-time=30\n/v/sub/../trip.mkv\n";
        let mut playlist = Playlist::parse(text).unwrap();
        let interactor = SplitInteractor::new(None, SplitPlanner::new("/out"), ScriptWriter::default());
        let outcome = interactor.execute(&mut playlist).await.unwrap();

        assert_eq!(outcome.plans.len(), 1);
        let items = &outcome.plans[0].items;
        assert_eq!(items.len(), 2);
        assert!(items[0].aligned_stop <= items[1].aligned_start);
        assert_ne!(items[0].output_path, items[1].output_path);
        assert_eq!(outcome.script.matches("mv -i").count(), 1);
    }
}
