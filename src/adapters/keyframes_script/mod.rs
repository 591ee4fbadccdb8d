// Keyframe script adapter - Runs a user script that prints `<frame> <timestamp>` lines

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::adapters::tool_runner::ToolCommand;
use crate::error::ScreencapResult;
use crate::planner::keyframes::KeyframeIndex;
use crate::ports::KeyframePort;

/// Keyframe lister backed by an external script
#[derive(Debug, Clone)]
pub struct ScriptKeyframes {
    script: PathBuf,
    timeout: Duration,
}

impl ScriptKeyframes {
    pub fn new(script: PathBuf, timeout: Duration) -> Self {
        Self { script, timeout }
    }
}

#[async_trait]
impl KeyframePort for ScriptKeyframes {
    async fn list_keyframes(&self, path: &Path) -> ScreencapResult<KeyframeIndex> {
        let output = ToolCommand::new(self.script.clone())
            .arg(path.to_string_lossy())
            .timeout(self.timeout)
            .execute()
            .await?;
        debug!(script = %self.script.display(), bytes = output.stdout.len(), "keyframe script finished");
        KeyframeIndex::parse_listing(&output.stdout)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_script_output_becomes_index() {
        let dir = TempDir::new().unwrap();
        let script = dir.path().join("keyframes.sh");
        fs::write(&script, "#!/bin/sh\nprintf '251 10.04\\n1 0\\n'\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        let lister = ScriptKeyframes::new(script, Duration::from_secs(10));
        let index = lister.list_keyframes(Path::new("video.mkv")).await.unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.pairs()[0].frame_number, 1);
    }
}
