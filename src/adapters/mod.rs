// Adapters - External system implementations

pub mod exec_ffmpeg;
pub mod keyframes_script;
pub mod liveness_tcp;
pub mod probe_ffprobe;
pub mod toml_config;
pub mod tool_runner;

// Re-export adapters
pub use exec_ffmpeg::FfmpegContactSheet;
pub use keyframes_script::ScriptKeyframes;
pub use liveness_tcp::TcpLiveness;
pub use probe_ffprobe::{FfprobeKeyframes, FfprobeProbe};
pub use toml_config::TomlConfigAdapter;
pub use tool_runner::{resolve_tool, ToolCommand, ToolOutput};
