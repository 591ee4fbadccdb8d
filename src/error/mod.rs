//! Error handling module for Screencap

use thiserror::Error;

/// Main error type for Screencap operations
#[derive(Error, Debug)]
pub enum ScreencapError {
    /// Malformed playlist line
    #[error("Playlist format error at line {line}: {message}")]
    Format { line: usize, message: String },

    /// Playlist without a single path or URL line
    #[error("Playlist contains no entries")]
    EmptyPlaylist,

    /// Start/stop bounds that do not form a range
    #[error("Invalid time range: start ({start}) must be less than stop ({stop})")]
    InvalidRange { start: String, stop: String },

    /// Probing a file or URL failed
    #[error("Failed to probe {locator}: {message}")]
    ProbeFailure { locator: String, message: String },

    /// Entries of one split group point at different files
    #[error("Entries refer to more than one source file: {}", candidates.join(", "))]
    AmbiguousSource { candidates: Vec<String> },

    /// Keyframe lookup outside the indexed range
    #[error("No keyframe {direction} {value}")]
    KeyframeNotFound { value: String, direction: String },

    /// Keyframe listing that cannot form a sorted index
    #[error("Invalid keyframe listing: {message}")]
    InvalidKeyframes { message: String },

    /// Host skipped after crossing its failure budget
    #[error("Host {host} exceeded its failure budget")]
    HostExhausted { host: String },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// External tool missing from PATH
    #[error("Required tool not found: {tool}")]
    ToolNotFound { tool: String },

    /// External tool exited unsuccessfully
    #[error("{tool} failed: {message}")]
    ToolFailed { tool: String, message: String },

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl ScreencapError {
    /// Shorthand for a format error at a 1-based line number
    pub fn format(line: usize, message: impl Into<String>) -> Self {
        Self::Format {
            line,
            message: message.into(),
        }
    }

    /// Whether the error only affects a single entry rather than the run
    pub fn is_per_entry(&self) -> bool {
        matches!(
            self,
            Self::ProbeFailure { .. } | Self::HostExhausted { .. } | Self::KeyframeNotFound { .. }
        )
    }
}

/// Result type alias for Screencap operations
pub type ScreencapResult<T> = std::result::Result<T, ScreencapError>;
