//! Renders split plans as bash scripts for the external split tools

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::model::{Locator, Seconds};
use crate::domain::rules;
use crate::error::ScreencapResult;
use crate::planner::splitter::{PlanItem, SplitPlan};
use crate::utils::path::{shell_quote, shell_quote_path};

pub const SCRIPT_HEAD: &str = "#! /usr/bin/env bash\nset -e";

/// How a plan is turned into commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScriptProfile {
    /// `mkvmerge --split parts:` into Matroska, then rename
    Mkvmerge,
    /// One `ffmpeg -c copy` per segment
    FfmpegCopy,
    /// Describe the cuts only; used for remote sources
    Listing,
}

impl ScriptProfile {
    pub fn for_plan(plan: &SplitPlan) -> Self {
        match &plan.source {
            Locator::Remote(_) => ScriptProfile::Listing,
            Locator::Local(_) if plan.is_remux() => ScriptProfile::Mkvmerge,
            Locator::Local(_) => ScriptProfile::FfmpegCopy,
        }
    }
}

/// Script renderer with the tool names to call
#[derive(Debug, Clone)]
pub struct ScriptWriter {
    pub mkvmerge: String,
    pub ffmpeg: String,
    /// Move the source into `delme/` once it has been split
    pub archive_source: bool,
}

impl Default for ScriptWriter {
    fn default() -> Self {
        Self {
            mkvmerge: "mkvmerge".to_string(),
            ffmpeg: "ffmpeg".to_string(),
            archive_source: true,
        }
    }
}

impl ScriptWriter {
    /// Full script with the shebang header
    pub fn render(&self, plan: &SplitPlan) -> ScreencapResult<String> {
        self.render_all(std::slice::from_ref(plan))
    }

    /// One script for several sources, a blank line between them
    pub fn render_all(&self, plans: &[SplitPlan]) -> ScreencapResult<String> {
        let mut script = String::from(SCRIPT_HEAD);
        script.push('\n');
        for plan in plans {
            script.push('\n');
            for line in self.commands(plan)? {
                script.push_str(&line);
                script.push('\n');
            }
        }
        Ok(script)
    }

    /// Shell lines for one plan, chosen by its profile
    pub fn commands(&self, plan: &SplitPlan) -> ScreencapResult<Vec<String>> {
        if plan.items.is_empty() {
            return Ok(vec![format!("# nothing to split in {}", plan.source)]);
        }
        let mut lines = match ScriptProfile::for_plan(plan) {
            ScriptProfile::Mkvmerge => self.mkvmerge_commands(plan)?,
            ScriptProfile::FfmpegCopy => self.ffmpeg_commands(plan),
            ScriptProfile::Listing => return Ok(listing_commands(plan)),
        };
        if self.archive_source {
            lines.push("mkdir -p delme covers".to_string());
            lines.push(format!("mv -i {} delme", shell_quote(&plan.source.to_string())));
        }
        Ok(lines)
    }

    fn mkvmerge_commands(&self, plan: &SplitPlan) -> ScreencapResult<Vec<String>> {
        let source = plan.source.to_string();
        let options_file = format!("{}.options", source);
        let (stem, _) = rules::splitext(&source);
        let output_pattern = format!("{}-%03d{}", stem, rules::REMUX_EXTENSION);

        let parts: Vec<String> = plan.items.iter().map(split_part).collect();
        let options = vec![
            "-o".to_string(),
            output_pattern,
            "--link".to_string(),
            "--split".to_string(),
            format!("parts:{}", parts.join(",")),
            source.clone(),
        ];

        let mut lines = vec![format!("<< 'EOF' cat > {}", shell_quote(&options_file))];
        lines.push(serde_json::to_string_pretty(&options)?);
        lines.push("EOF".to_string());
        lines.extend(mkdir_line(&plan.items));
        lines.push(format!("{} @{}", self.mkvmerge, shell_quote(&options_file)));
        for item in &plan.items {
            let intermediate = shell_quote_path(&intermediate_path(&plan.source, item));
            lines.push(format!(
                "[[ -s {0} ]] && mv {0} {1}",
                intermediate,
                shell_quote_path(&item.output_path)
            ));
        }
        Ok(lines)
    }

    fn ffmpeg_commands(&self, plan: &SplitPlan) -> Vec<String> {
        let source = shell_quote(&plan.source.to_string());
        let mut lines: Vec<String> = mkdir_line(&plan.items).into_iter().collect();
        for item in &plan.items {
            let mut args = vec![self.ffmpeg.clone(), "-hide_banner".to_string(), "-nostdin".to_string()];
            if let Some(start) = item.aligned_start {
                args.push(format!("-ss {}", seconds(start)));
            }
            if let Some(stop) = item.aligned_stop {
                args.push(format!("-to {}", seconds(stop)));
            }
            args.push(format!("-i {}", source));
            args.push("-map 0 -c copy -n".to_string());
            args.push(shell_quote_path(&item.output_path));
            lines.push(args.join(" "));
        }
        lines
    }
}

fn listing_commands(plan: &SplitPlan) -> Vec<String> {
    let mut lines = vec!["cat << EOF".to_string()];
    for item in &plan.items {
        lines.push(format!(
            "{} -> {} -> {}",
            plan.source,
            item.intermediate_name,
            item.output_path.display()
        ));
    }
    lines.push("EOF".to_string());
    lines
}

fn seconds(value: Seconds) -> String {
    value.normalize().to_string()
}

/// `<start>s-<stop>s`, either side empty when open
fn split_part(item: &PlanItem) -> String {
    format!(
        "{}-{}",
        item.aligned_start
            .filter(|s| !s.is_zero())
            .map(|s| format!("{}s", seconds(s)))
            .unwrap_or_default(),
        item.aligned_stop
            .map(|s| format!("{}s", seconds(s)))
            .unwrap_or_default()
    )
}

/// Where the split tool writes a segment: next to the source
fn intermediate_path(source: &Locator, item: &PlanItem) -> PathBuf {
    match source.as_local().and_then(Path::parent) {
        Some(dir) => dir.join(&item.intermediate_name),
        None => PathBuf::from(&item.intermediate_name),
    }
}

fn mkdir_line(items: &[PlanItem]) -> Option<String> {
    let dirs: BTreeSet<&Path> = items
        .iter()
        .filter_map(|item| item.output_path.parent())
        .filter(|dir| !dir.as_os_str().is_empty())
        .collect();
    if dirs.is_empty() {
        return None;
    }
    let quoted: Vec<String> = dirs.into_iter().map(shell_quote_path).collect();
    Some(format!("mkdir -p {}", quoted.join(" ")))
}
