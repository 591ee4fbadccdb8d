//! Logging setup on top of tracing-subscriber
//!
//! Logs go to stderr so that scripts and JSON written to stdout stay clean.
//! `RUST_LOG` wins over the configured level when it is set.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::error::{ScreencapError, ScreencapResult};

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line human-readable output
    #[default]
    Pretty,
    /// One line per event
    Compact,
    /// Newline-delimited JSON
    Json,
}

impl FromStr for LogFormat {
    type Err = ScreencapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(ScreencapError::Config {
                message: format!("unknown log format '{}' (pretty, compact, json)", other),
            }),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pretty => "pretty",
            Self::Compact => "compact",
            Self::Json => "json",
        };
        f.write_str(name)
    }
}

/// Logging system manager
#[derive(Debug, Clone)]
pub struct LoggingSystem {
    level: String,
    format: LogFormat,
}

impl LoggingSystem {
    pub fn new(level: impl Into<String>, format: LogFormat) -> Self {
        Self {
            level: level.into(),
            format,
        }
    }

    /// Check that the level is a usable filter directive
    pub fn validate_level(level: &str) -> ScreencapResult<()> {
        EnvFilter::try_new(level)
            .map(|_| ())
            .map_err(|e| ScreencapError::Config {
                message: format!("invalid log level '{}': {}", level, e),
            })
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level))
    }

    /// Install the global subscriber
    pub fn init(&self) -> ScreencapResult<()> {
        let builder = tracing_subscriber::fmt()
            .with_env_filter(self.filter())
            .with_writer(std::io::stderr)
            .with_target(false);

        let installed = match self.format {
            LogFormat::Pretty => builder.pretty().try_init(),
            LogFormat::Compact => builder.compact().try_init(),
            LogFormat::Json => builder.json().try_init(),
        };
        installed.map_err(|e| ScreencapError::Config {
            message: format!("failed to install logger: {}", e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_names() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!(" compact".parse::<LogFormat>().unwrap(), LogFormat::Compact);
        assert!("xml".parse::<LogFormat>().is_err());
        assert_eq!(LogFormat::Pretty.to_string(), "pretty");
    }

    #[test]
    fn test_level_validation() {
        assert!(LoggingSystem::validate_level("debug").is_ok());
        assert!(LoggingSystem::validate_level("screencap_cli=trace,warn").is_ok());
        assert!(LoggingSystem::validate_level("screencap=loud").is_err());
    }
}
