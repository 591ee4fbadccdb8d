// Ports - Contracts for the external collaborators

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::domain::model::{HostKey, Locator, Seconds};
use crate::error::ScreencapResult;
use crate::planner::keyframes::KeyframeIndex;
use crate::probe::record::ProbeRecord;

/// Port for reading container and stream metadata
#[async_trait]
pub trait ProbePort: Send + Sync {
    /// Probe one file or URL
    async fn probe(&self, locator: &Locator) -> ScreencapResult<ProbeRecord>;
}

/// Port for checking whether a remote host answers at all
#[async_trait]
pub trait LivenessPort: Send + Sync {
    async fn is_alive(&self, host: &HostKey) -> bool;
}

/// Port for listing the keyframes of a local video
#[async_trait]
pub trait KeyframePort: Send + Sync {
    async fn list_keyframes(&self, path: &Path) -> ScreencapResult<KeyframeIndex>;
}

/// What a contact sheet should show
#[derive(Debug, Clone, PartialEq)]
pub struct ContactSheetRequest {
    pub input: Locator,
    pub output: PathBuf,
    pub duration: Seconds,
    pub columns: u32,
    pub rows: u32,
    /// Seconds skipped at the beginning; `None` picks automatically
    pub skip_intro: Option<Seconds>,
    /// Corner captions: northwest, northeast, southwest, southeast
    pub annotation: [Option<String>; 4],
}

/// Port for rendering thumbnail grids
#[async_trait]
pub trait ContactSheetPort: Send + Sync {
    async fn render(&self, request: &ContactSheetRequest) -> ScreencapResult<()>;
}
