// Screens interactor - Contact sheets for playlist entries

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::model::{DurationSource, Entry, Seconds};
use crate::domain::rules;
use crate::error::ScreencapResult;
use crate::playlist::Playlist;
use crate::ports::{ContactSheetPort, ContactSheetRequest};

/// Suffix of every contact sheet file
pub const SHEET_SUFFIX: &str = "_screens.jpeg";

/// Grid and placement of contact sheets
#[derive(Debug, Clone, PartialEq)]
pub struct SheetLayout {
    pub columns: u32,
    pub rows: u32,
    pub skip_intro: Option<Seconds>,
    /// Where sheets go; next to local sources and in the working directory otherwise
    pub output_dir: Option<PathBuf>,
    pub overwrite: bool,
}

impl Default for SheetLayout {
    fn default() -> Self {
        Self {
            columns: 6,
            rows: 5,
            skip_intro: None,
            output_dir: None,
            overwrite: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScreensReport {
    pub rendered: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl fmt::Display for ScreensReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} rendered, {} skipped, {} failed",
            self.rendered, self.skipped, self.failed
        )
    }
}

/// Interactor for the contact sheet use case
pub struct ScreensInteractor {
    sheet_port: Arc<dyn ContactSheetPort>,
    layout: SheetLayout,
}

impl ScreensInteractor {
    pub fn new(sheet_port: Arc<dyn ContactSheetPort>, layout: SheetLayout) -> Self {
        Self { sheet_port, layout }
    }

    /// Sheet request for one entry; `None` when its length is unknown
    pub fn request_for(&self, playlist: &Playlist, entry: &Entry) -> Option<ContactSheetRequest> {
        let duration = entry
            .duration_from(DurationSource::Probe)
            .or_else(|| entry.get_duration())?;
        let input = playlist.source_of(entry);

        let title = rules::sanitize_label(&entry.get_title());
        let file_name = format!("{}{}", rules::clean_filename(&title), SHEET_SUFFIX);
        let dir = match (&self.layout.output_dir, input.as_local()) {
            (Some(dir), _) => dir.clone(),
            (None, Some(path)) => path.parent().map(PathBuf::from).unwrap_or_default(),
            (None, None) => PathBuf::new(),
        };

        let label = |key: &str| entry.metadata(key).and_then(|v| v.as_str()).map(str::to_string);
        Some(ContactSheetRequest {
            input,
            output: dir.join(file_name),
            duration,
            columns: self.layout.columns,
            rows: self.layout.rows,
            skip_intro: self.layout.skip_intro,
            annotation: [
                Some(title),
                label("quality_label"),
                label("size_label"),
                label("duration_label").or_else(|| Some(rules::duration_label(duration))),
            ],
        })
    }

    /// Render a sheet per reachable entry and record where it went
    pub async fn execute(&self, playlist: &mut Playlist) -> ScreencapResult<ScreensReport> {
        let mut report = ScreensReport::default();
        let mut planned = Vec::new();
        for entry in playlist.iter() {
            if !entry.is_reachable() {
                warn!(order = entry.order, "skipping unreachable entry");
                report.skipped += 1;
                continue;
            }
            match self.request_for(playlist, entry) {
                Some(request) => planned.push((entry.order, request)),
                None => {
                    warn!(order = entry.order, locator = %entry.locator(), "unknown duration, no contact sheet");
                    report.skipped += 1;
                }
            }
        }

        for (order, request) in planned {
            if request.output.exists() && !self.layout.overwrite {
                info!(output = %request.output.display(), "contact sheet exists, keeping it");
                report.skipped += 1;
            } else {
                match self.sheet_port.render(&request).await {
                    Ok(()) => report.rendered += 1,
                    Err(e) => {
                        warn!(order, error = %e, "contact sheet failed");
                        report.failed += 1;
                        continue;
                    }
                }
            }
            if let Some(entry) = playlist.get_mut(order) {
                entry.screens_path = Some(request.output);
            }
        }

        info!("contact sheets: {}", report);
        Ok(report)
    }
}
