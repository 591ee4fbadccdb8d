// Tool runner - External process invocation with timeout

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::debug;

use crate::error::{ScreencapError, ScreencapResult};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Locate a tool: an explicit path wins, otherwise search `PATH`
pub fn resolve_tool(name: &str, configured: Option<&Path>) -> ScreencapResult<PathBuf> {
    if let Some(path) = configured {
        return which::which(path).map_err(|_| ScreencapError::ToolNotFound {
            tool: path.display().to_string(),
        });
    }
    which::which(name).map_err(|_| ScreencapError::ToolNotFound {
        tool: name.to_string(),
    })
}

/// Captured output of a finished tool
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Builder for one tool invocation
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl ToolCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn arg(&mut self, arg: impl Into<String>) -> &mut Self {
        self.args.push(arg.into());
        self
    }

    pub fn args(&mut self, args: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn timeout(&mut self, timeout: Duration) -> &mut Self {
        self.timeout = timeout;
        self
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    fn tool_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }

    /// Run to completion; non-zero exit and timeouts are errors
    pub async fn execute(&self) -> ScreencapResult<ToolOutput> {
        let tool = self.tool_name();
        debug!(tool = %tool, args = ?self.args, "running tool");

        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ScreencapError::ToolFailed {
                tool: tool.clone(),
                message: format!("failed to spawn: {}", e),
            })?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| ScreencapError::ToolFailed {
                tool: tool.clone(),
                message: format!("timed out after {:?}", self.timeout),
            })?
            .map_err(|e| ScreencapError::ToolFailed {
                tool: tool.clone(),
                message: format!("I/O error waiting for process: {}", e),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        if !output.status.success() {
            return Err(ScreencapError::ToolFailed {
                tool,
                message: format!("exited with {}: {}", output.status, stderr.trim()),
            });
        }
        Ok(ToolOutput { stdout, stderr })
    }
}
