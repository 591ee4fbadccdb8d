//! Split planning: keyframe alignment, overlap resolution and output naming

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::model::{DurationSource, Entry, Locator, Seconds};
use crate::domain::rules;
use crate::error::{ScreencapError, ScreencapResult};
use crate::planner::keyframes::KeyframeIndex;
use crate::utils::path::physical_locator;

/// One planned output segment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanItem {
    /// `order` of the entry this segment came from
    pub order: usize,
    /// 1-based position in cut order
    pub sequence: usize,
    pub source: Locator,
    pub requested_start: Option<Seconds>,
    pub requested_stop: Option<Seconds>,
    /// `None` means the beginning of the source
    pub aligned_start: Option<Seconds>,
    /// `None` means the end of the source
    pub aligned_stop: Option<Seconds>,
    pub output_path: PathBuf,
    /// File name the split tool writes before the segment is moved into place
    pub intermediate_name: String,
}

/// Non-fatal planning events
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlanWarning {
    /// No keyframe at or before the requested start
    UnalignedStart { order: usize, start: Seconds },
    /// The range lies entirely inside an earlier one and was dropped
    CoveredRange { order: usize, covered_by: usize },
}

impl fmt::Display for PlanWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanWarning::UnalignedStart { order, start } => {
                write!(f, "entry {}: no keyframe at or before {}s", order, start)
            }
            PlanWarning::CoveredRange { order, covered_by } => {
                write!(f, "entry {}: range is covered by entry {}", order, covered_by)
            }
        }
    }
}

/// Ordered segments for one source
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SplitPlan {
    pub source: Locator,
    pub items: Vec<PlanItem>,
    pub warnings: Vec<PlanWarning>,
}

impl SplitPlan {
    /// Whether the source is split by remuxing into Matroska
    pub fn is_remux(&self) -> bool {
        rules::needs_remux(&self.source.extension())
    }
}

/// Range being planned; `stop == None` runs to the end of the source
#[derive(Debug, Clone)]
struct Cut<'a> {
    entry: &'a Entry,
    start: Option<Seconds>,
    stop: Option<Seconds>,
}

impl Cut<'_> {
    fn start_or_zero(&self) -> Seconds {
        self.start.unwrap_or(Seconds::ZERO)
    }

    /// `None` is unbounded
    fn length(&self) -> Option<Seconds> {
        self.stop.map(|stop| stop - self.start_or_zero())
    }

    fn overlaps(&self, next: &Cut<'_>) -> bool {
        match self.stop {
            Some(stop) => stop > next.start_or_zero(),
            None => true,
        }
    }
}

/// `a >= b` where `None` is infinitely long
fn at_least_as_long(a: Option<Seconds>, b: Option<Seconds>) -> bool {
    match (a, b) {
        (None, _) => true,
        (Some(_), None) => false,
        (Some(a), Some(b)) => a >= b,
    }
}

/// Plans the split of one source file into segments
#[derive(Debug, Clone, Default)]
pub struct SplitPlanner {
    /// Directory segment outputs and `#EXTGRP` subdirectories are placed under
    pub output_root: PathBuf,
    /// Directory relative local entry paths resolve against
    pub base_dir: Option<PathBuf>,
}

impl SplitPlanner {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
            base_dir: None,
        }
    }

    pub fn with_base_dir(mut self, base_dir: Option<PathBuf>) -> Self {
        self.base_dir = base_dir;
        self
    }

    /// Plan segments for entries that all refer to the same source
    pub fn plan<'a>(
        &self,
        entries: impl IntoIterator<Item = &'a Entry>,
        keyframes: Option<&KeyframeIndex>,
    ) -> ScreencapResult<SplitPlan> {
        let entries: Vec<&Entry> = entries.into_iter().collect();
        let source = self.common_source(&entries)?;
        let mut warnings = Vec::new();

        let source_duration = entries
            .iter()
            .filter_map(|e| e.duration_from(DurationSource::Probe))
            .max();

        let mut cuts: Vec<Cut<'_>> = entries
            .iter()
            .map(|&entry| Cut {
                entry,
                start: entry.start_time(),
                stop: entry.stop_time(),
            })
            .collect();
        cuts.sort_by(|a, b| {
            a.start_or_zero()
                .cmp(&b.start_or_zero())
                .then_with(|| compare_stop(a.stop.or(source_duration), b.stop.or(source_duration)))
                .then_with(|| a.entry.order.cmp(&b.entry.order))
        });

        if let Some(index) = keyframes {
            for cut in cuts.iter_mut() {
                let Some(start) = cut.start else { continue };
                match index.floor_timestamp(start) {
                    Ok(aligned) => {
                        if aligned < start {
                            info!(
                                order = cut.entry.order,
                                "moving start time ({}) to previous keyframe ({})", start, aligned
                            );
                        }
                        cut.start = Some(aligned);
                    }
                    Err(_) => {
                        warn!(order = cut.entry.order, %start, "no keyframe before start time");
                        warnings.push(PlanWarning::UnalignedStart {
                            order: cut.entry.order,
                            start,
                        });
                    }
                }
            }
        }

        let kept = resolve_overlaps(cuts, keyframes, &mut warnings);
        let items = self.name_outputs(&source, kept);

        debug!(source = %source, items = items.len(), warnings = warnings.len(), "planned split");
        Ok(SplitPlan {
            source,
            items,
            warnings,
        })
    }

    fn common_source(&self, entries: &[&Entry]) -> ScreencapResult<Locator> {
        let mut resolved: Option<Locator> = None;
        let mut candidates: Vec<Locator> = Vec::new();
        for entry in entries {
            let locator = entry.locator().resolve(self.base_dir.as_deref());
            let physical = physical_locator(&locator);
            if !candidates.contains(&physical) {
                candidates.push(physical);
            }
            resolved.get_or_insert(locator);
        }
        if candidates.len() > 1 {
            return Err(ScreencapError::AmbiguousSource {
                candidates: candidates.iter().map(|c| c.to_string()).collect(),
            });
        }
        resolved.ok_or(ScreencapError::EmptyPlaylist)
    }

    fn output_dir(&self, entry: &Entry) -> PathBuf {
        match entry.group.as_deref().map(str::trim).filter(|g| !g.is_empty()) {
            Some(group) => self.output_root.join(rules::clean_filename(group)),
            None => self.output_root.clone(),
        }
    }

    fn name_outputs(&self, source: &Locator, kept: Vec<Cut<'_>>) -> Vec<PlanItem> {
        let file_name = source.file_name();
        let (stem, source_ext) = rules::splitext(&file_name);
        let ext = if rules::needs_remux(source_ext) {
            rules::REMUX_EXTENSION.to_string()
        } else {
            source_ext.to_string()
        };
        let clean_stem = rules::clean_filename(stem);

        let mut items: Vec<PlanItem> = kept
            .into_iter()
            .enumerate()
            .map(|(i, cut)| {
                let sequence = i + 1;
                let name = match cut.entry.artist_tag() {
                    Some(tag) => format!("{}{}", rules::clean_filename(tag), ext),
                    None => format!("{}_Scene-{:03}{}", clean_stem, sequence, ext),
                };
                PlanItem {
                    order: cut.entry.order,
                    sequence,
                    source: source.clone(),
                    requested_start: cut.entry.start_time(),
                    requested_stop: cut.entry.stop_time(),
                    aligned_start: cut.start,
                    aligned_stop: cut.stop,
                    output_path: self.output_dir(cut.entry).join(name),
                    intermediate_name: format!("{}-{:03}{}", stem, sequence, ext),
                }
            })
            .collect();

        deduplicate(&mut items);
        items
    }
}

fn compare_stop(a: Option<Seconds>, b: Option<Seconds>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Walk the sorted cuts keeping a non-overlapping list
fn resolve_overlaps<'a>(
    cuts: Vec<Cut<'a>>,
    keyframes: Option<&KeyframeIndex>,
    warnings: &mut Vec<PlanWarning>,
) -> Vec<Cut<'a>> {
    let mut kept: Vec<Cut<'a>> = Vec::with_capacity(cuts.len());
    for mut next in cuts {
        let Some(prev) = kept.last_mut() else {
            kept.push(next);
            continue;
        };
        if !prev.overlaps(&next) {
            kept.push(next);
            continue;
        }

        let prev_start = prev.start_or_zero();
        let next_start = next.start_or_zero();

        // the longer clip gives way when the incoming one starts later
        if at_least_as_long(prev.length(), next.length()) && next_start > prev_start {
            debug!(order = prev.entry.order, stop = %next_start, "shrinking earlier range");
            prev.stop = Some(next_start);
            kept.push(next);
            continue;
        }

        let advanced = prev.stop.and_then(|stop| match keyframes {
            Some(index) => index.ceil_timestamp(stop).ok(),
            None => Some(stop),
        });
        if let Some(advanced) = advanced {
            if next.stop.map_or(true, |stop| advanced < stop) {
                debug!(order = next.entry.order, start = %advanced, "advancing later range");
                next.start = Some(advanced);
                kept.push(next);
                continue;
            }
        }

        if next_start > prev_start {
            debug!(order = prev.entry.order, stop = %next_start, "shrinking earlier range");
            prev.stop = Some(next_start);
            kept.push(next);
            continue;
        }

        warn!(order = next.entry.order, covered_by = prev.entry.order, "dropping covered range");
        warnings.push(PlanWarning::CoveredRange {
            order: next.entry.order,
            covered_by: prev.entry.order,
        });
    }
    kept
}

/// Insert `-<NNN>` before the extension of every colliding output path
fn deduplicate(items: &mut [PlanItem]) {
    let mut counts: HashMap<PathBuf, usize> = HashMap::new();
    for item in items.iter() {
        *counts.entry(item.output_path.clone()).or_insert(0) += 1;
    }
    let duplicates: Vec<&PathBuf> = counts.iter().filter(|&(_, &n)| n > 1).map(|(p, _)| p).collect();
    if duplicates.is_empty() {
        return;
    }
    info!(
        "de-duplicating output filenames {}",
        duplicates
            .iter()
            .map(|p| format!("'{}'", p.display()))
            .collect::<Vec<_>>()
            .join(", ")
    );
    for item in items.iter_mut() {
        if counts.get(&item.output_path).copied().unwrap_or(0) > 1 {
            item.output_path = with_suffix(&item.output_path, &format!("-{:03}", item.sequence));
        }
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    path.with_file_name(rules::insert_filename_suffix(&name, suffix))
}

#[cfg(test)]
mod tests;
