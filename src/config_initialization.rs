//! Configuration initialization and hierarchy management
//!
//! Precedence, highest first: command line, `SCREENCAP_*` environment
//! variables, the TOML file, built-in defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::adapters::toml_config::TomlConfigAdapter;
use crate::error::{ScreencapError, ScreencapResult};
use crate::utils::logging::{LogFormat, LoggingSystem};

/// Prefix shared by every environment override
pub const ENV_PREFIX: &str = "SCREENCAP_";

/// Probing and enrichment settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeSettings {
    /// Host buckets probed at the same time
    pub workers: usize,
    pub timeout_secs: u64,
    pub liveness_timeout_secs: u64,
    /// Stored consecutive failures after which a host is skipped outright
    pub max_host_failures: u32,
    /// Consecutive failures within one run before a host's remaining entries are abandoned
    pub host_failure_budget: u32,
    pub state_file: PathBuf,
    pub ffprobe: Option<PathBuf>,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            workers: num_cpus::get(),
            timeout_secs: 60,
            liveness_timeout_secs: 5,
            max_host_failures: 3,
            host_failure_budget: 2,
            state_file: default_state_file(),
            ffprobe: None,
        }
    }
}

impl ProbeSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn liveness_timeout(&self) -> Duration {
        Duration::from_secs(self.liveness_timeout_secs)
    }
}

/// Split planning and script settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitSettings {
    pub output_dir: PathBuf,
    /// Script printing `<frame> <timestamp>` lines; ffprobe packet listing when unset
    pub keyframe_script: Option<PathBuf>,
    pub keyframe_timeout_secs: u64,
    pub mkvmerge: String,
    pub ffmpeg: String,
    /// Move split sources into `delme/` at the end of the script
    pub archive_source: bool,
}

impl Default for SplitSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            keyframe_script: None,
            keyframe_timeout_secs: 600,
            mkvmerge: "mkvmerge".to_string(),
            ffmpeg: "ffmpeg".to_string(),
            archive_source: true,
        }
    }
}

/// Contact sheet settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreensSettings {
    pub columns: u32,
    pub rows: u32,
    pub timeout_secs: u64,
    pub ffmpeg: Option<PathBuf>,
    pub convert: Option<PathBuf>,
    pub font: String,
    pub pointsize: u32,
}

impl Default for ScreensSettings {
    fn default() -> Self {
        Self {
            columns: 6,
            rows: 5,
            timeout_secs: 900,
            ffmpeg: None,
            convert: None,
            font: "Palatino-Bold".to_string(),
            pointsize: 32,
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreencapConfig {
    pub probe: ProbeSettings,
    pub split: SplitSettings,
    pub screens: ScreensSettings,
    pub logging: LoggingSettings,
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub workers: Option<usize>,
    pub state_file: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub keyframe_script: Option<PathBuf>,
    pub columns: Option<u32>,
    pub rows: Option<u32>,
}

fn default_state_file() -> PathBuf {
    let base = std::env::var_os("XDG_STATE_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".local/state")));
    match base {
        Some(dir) => dir.join("screencap").join("hosts.json"),
        None => PathBuf::from(".screencap-hosts.json"),
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> ScreencapResult<T> {
    value.trim().parse().map_err(|_| ScreencapError::Config {
        message: format!("{}{} has an invalid value '{}'", ENV_PREFIX, key, value),
    })
}

impl ScreencapConfig {
    /// Apply `SCREENCAP_*` variables; unknown names are ignored
    pub fn apply_env<I, K, V>(&mut self, vars: I) -> ScreencapResult<usize>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut applied = 0;
        for (name, value) in vars {
            let Some(key) = name.as_ref().strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let value = value.as_ref();
            match key {
                "LOG_LEVEL" => self.logging.level = value.to_string(),
                "LOG_FORMAT" => self.logging.format = value.parse()?,
                "PROBE_WORKERS" => self.probe.workers = parse_env(key, value)?,
                "PROBE_TIMEOUT" => self.probe.timeout_secs = parse_env(key, value)?,
                "MAX_HOST_FAILURES" => self.probe.max_host_failures = parse_env(key, value)?,
                "HOST_FAILURE_BUDGET" => self.probe.host_failure_budget = parse_env(key, value)?,
                "STATE_FILE" => self.probe.state_file = PathBuf::from(value),
                "FFPROBE" => self.probe.ffprobe = Some(PathBuf::from(value)),
                "OUTPUT_DIR" => self.split.output_dir = PathBuf::from(value),
                "KEYFRAME_SCRIPT" => self.split.keyframe_script = Some(PathBuf::from(value)),
                "COLUMNS" => self.screens.columns = parse_env(key, value)?,
                "ROWS" => self.screens.rows = parse_env(key, value)?,
                _ => {
                    debug!(variable = %name.as_ref(), "ignoring unknown environment override");
                    continue;
                }
            }
            info!("Found environment override: {}{}", ENV_PREFIX, key);
            applied += 1;
        }
        Ok(applied)
    }

    /// Apply command-line values
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) -> usize {
        let mut applied = 0;
        if let Some(level) = &overrides.log_level {
            self.logging.level = level.clone();
            applied += 1;
        }
        if let Some(format) = overrides.log_format {
            self.logging.format = format;
            applied += 1;
        }
        if let Some(workers) = overrides.workers {
            self.probe.workers = workers;
            applied += 1;
        }
        if let Some(state_file) = &overrides.state_file {
            self.probe.state_file = state_file.clone();
            applied += 1;
        }
        if let Some(output_dir) = &overrides.output_dir {
            self.split.output_dir = output_dir.clone();
            applied += 1;
        }
        if let Some(script) = &overrides.keyframe_script {
            self.split.keyframe_script = Some(script.clone());
            applied += 1;
        }
        if let Some(columns) = overrides.columns {
            self.screens.columns = columns;
            applied += 1;
        }
        if let Some(rows) = overrides.rows {
            self.screens.rows = rows;
            applied += 1;
        }
        applied
    }

    /// Reject values no run could work with
    pub fn validate(&self) -> ScreencapResult<()> {
        let fail = |message: &str| {
            Err(ScreencapError::Config {
                message: message.to_string(),
            })
        };
        if self.probe.workers == 0 {
            return fail("probe.workers must be at least 1");
        }
        if self.probe.timeout_secs == 0 || self.probe.liveness_timeout_secs == 0 {
            return fail("probe timeouts must be at least one second");
        }
        if self.probe.host_failure_budget == 0 {
            return fail("probe.host_failure_budget must be at least 1");
        }
        if self.screens.columns == 0 || self.screens.rows == 0 {
            return fail("screens.columns and screens.rows must be at least 1");
        }
        if self.split.mkvmerge.trim().is_empty() || self.split.ffmpeg.trim().is_empty() {
            return fail("split tool names must not be empty");
        }
        LoggingSystem::validate_level(&self.logging.level)
    }
}

/// Build the effective configuration
///
/// An explicit `config_path` must exist; otherwise the first default location
/// that exists is used, if any.
pub fn initialize_configuration_hierarchy(
    config_path: Option<&Path>,
    overrides: &ConfigOverrides,
) -> ScreencapResult<ScreencapConfig> {
    let adapter = TomlConfigAdapter::new();
    let mut config = match config_path {
        Some(path) => adapter.load(path)?,
        None => match adapter.find_config_file() {
            Some(path) => adapter.load(&path)?,
            None => {
                debug!("no configuration file found, using defaults");
                ScreencapConfig::default()
            }
        },
    };

    let from_env = config.apply_env(std::env::vars())?;
    let from_cli = config.apply_overrides(overrides);
    if from_env + from_cli > 0 {
        debug!(env = from_env, cli = from_cli, "applied configuration overrides");
    }

    config.validate()?;
    Ok(config)
}
