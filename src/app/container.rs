use std::sync::Arc;
use std::time::Duration;

use crate::adapters::{
    resolve_tool, FfmpegContactSheet, FfprobeKeyframes, FfprobeProbe, ScriptKeyframes, TcpLiveness,
};
use crate::app::enrich_interactor::{ProbeSession, SessionSettings};
use crate::app::screens_interactor::{ScreensInteractor, SheetLayout};
use crate::app::split_interactor::SplitInteractor;
use crate::config_initialization::ScreencapConfig;
use crate::error::ScreencapResult;
use crate::planner::{ScriptWriter, SplitPlanner};
use crate::ports::{ContactSheetPort, KeyframePort, LivenessPort, ProbePort};
use crate::probe::HostLedger;

/// Wires adapters into interactors from the effective configuration
///
/// Tools are looked up on first use, so commands that never probe do not
/// need ffprobe installed.
pub trait AppContainer: Send + Sync {
    fn probe_port(&self) -> ScreencapResult<Arc<dyn ProbePort>>;
    fn liveness_port(&self) -> Arc<dyn LivenessPort>;
    fn keyframe_port(&self) -> ScreencapResult<Arc<dyn KeyframePort>>;
    fn sheet_port(&self) -> ScreencapResult<Arc<dyn ContactSheetPort>>;
}

pub struct DefaultAppContainer {
    config: ScreencapConfig,
}

impl DefaultAppContainer {
    pub fn new(config: ScreencapConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScreencapConfig {
        &self.config
    }

    /// Session with the persisted host ledger
    pub fn probe_session(&self, force: bool) -> ScreencapResult<ProbeSession> {
        let probe = &self.config.probe;
        let ledger = HostLedger::load(&probe.state_file)?;
        Ok(ProbeSession::new(
            ledger,
            SessionSettings {
                workers: probe.workers,
                max_host_failures: probe.max_host_failures,
                host_failure_budget: probe.host_failure_budget,
                force,
            },
        ))
    }

    /// Split interactor; keyframe alignment is skipped when `align` is false
    pub fn split_interactor(&self, align: bool) -> ScreencapResult<SplitInteractor> {
        let split = &self.config.split;
        let keyframe_port = if align { Some(self.keyframe_port()?) } else { None };
        let writer = ScriptWriter {
            mkvmerge: split.mkvmerge.clone(),
            ffmpeg: split.ffmpeg.clone(),
            archive_source: split.archive_source,
        };
        Ok(SplitInteractor::new(
            keyframe_port,
            SplitPlanner::new(split.output_dir.clone()),
            writer,
        ))
    }

    pub fn screens_interactor(&self, layout: SheetLayout) -> ScreencapResult<ScreensInteractor> {
        Ok(ScreensInteractor::new(self.sheet_port()?, layout))
    }
}

impl AppContainer for DefaultAppContainer {
    fn probe_port(&self) -> ScreencapResult<Arc<dyn ProbePort>> {
        let probe = &self.config.probe;
        let adapter = FfprobeProbe::discover(probe.ffprobe.as_deref(), probe.timeout())?;
        Ok(Arc::new(adapter))
    }

    fn liveness_port(&self) -> Arc<dyn LivenessPort> {
        Arc::new(TcpLiveness::new(self.config.probe.liveness_timeout()))
    }

    fn keyframe_port(&self) -> ScreencapResult<Arc<dyn KeyframePort>> {
        let split = &self.config.split;
        let timeout = Duration::from_secs(split.keyframe_timeout_secs);
        match &split.keyframe_script {
            Some(script) => Ok(Arc::new(ScriptKeyframes::new(
                resolve_tool("keyframes", Some(script))?,
                timeout,
            ))),
            None => {
                let ffprobe = resolve_tool("ffprobe", self.config.probe.ffprobe.as_deref())?;
                Ok(Arc::new(FfprobeKeyframes::new(ffprobe, timeout)))
            }
        }
    }

    fn sheet_port(&self) -> ScreencapResult<Arc<dyn ContactSheetPort>> {
        let screens = &self.config.screens;
        let mut adapter = FfmpegContactSheet::new(
            resolve_tool("ffmpeg", screens.ffmpeg.as_deref())?,
            resolve_tool("convert", screens.convert.as_deref())?,
            Duration::from_secs(screens.timeout_secs),
        );
        adapter.font = screens.font.clone();
        adapter.pointsize = screens.pointsize;
        Ok(Arc::new(adapter))
    }
}
