// TOML config adapter - Reads and writes the configuration file

use std::path::{Path, PathBuf};

use tracing::info;

use crate::config_initialization::ScreencapConfig;
use crate::error::{ScreencapError, ScreencapResult};

/// Loads `ScreencapConfig` from TOML files
#[derive(Debug, Clone)]
pub struct TomlConfigAdapter {
    search_paths: Vec<PathBuf>,
}

impl Default for TomlConfigAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl TomlConfigAdapter {
    /// Adapter searching the default locations
    pub fn new() -> Self {
        Self::with_search_paths(Self::default_paths())
    }

    pub fn with_search_paths(search_paths: Vec<PathBuf>) -> Self {
        Self { search_paths }
    }

    /// `./screencap.toml`, `./config/screencap.toml`, then the user config dir
    pub fn default_paths() -> Vec<PathBuf> {
        let mut paths = vec![
            PathBuf::from("screencap.toml"),
            PathBuf::from("config").join("screencap.toml"),
        ];
        let user_dir = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")));
        if let Some(dir) = user_dir {
            paths.push(dir.join("screencap").join("config.toml"));
        }
        paths
    }

    /// First search path that exists
    pub fn find_config_file(&self) -> Option<PathBuf> {
        self.search_paths.iter().find(|p| p.is_file()).cloned()
    }

    pub fn parse(&self, text: &str) -> ScreencapResult<ScreencapConfig> {
        toml::from_str(text).map_err(|e| ScreencapError::Config {
            message: format!("Failed to parse TOML config: {}", e),
        })
    }

    pub fn load(&self, path: &Path) -> ScreencapResult<ScreencapConfig> {
        if !path.exists() {
            return Err(ScreencapError::Config {
                message: format!("Config file does not exist: {}", path.display()),
            });
        }
        let text = std::fs::read_to_string(path)?;
        let config = self.parse(&text).map_err(|e| ScreencapError::Config {
            message: format!("{}: {}", path.display(), e),
        })?;
        info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }

    pub fn save(&self, config: &ScreencapConfig, path: &Path) -> ScreencapResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let text = toml::to_string_pretty(config).map_err(|e| ScreencapError::Config {
            message: format!("Failed to serialize config: {}", e),
        })?;
        std::fs::write(path, text)?;
        info!("Saved configuration to: {}", path.display());
        Ok(())
    }
}
