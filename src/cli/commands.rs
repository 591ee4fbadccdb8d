//! Command implementations

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::app::{AppContainer, DefaultAppContainer, SheetLayout};
use crate::cli::args::{MetadataArgs, ScreensArgs, SortArgs, SplitArgs};
use crate::domain::model::Locator;
use crate::planner::script::SCRIPT_HEAD;
use crate::playlist::{Playlist, SerializeOptions};
use crate::utils::path::{expand_inputs, is_playlist, is_video};
use crate::utils::time::parse_seconds;

/// A playlist and the file it came from; loose videos have no file
pub struct LoadedPlaylist {
    pub path: Option<PathBuf>,
    pub playlist: Playlist,
}

/// Read every playlist argument; loose video files form one extra playlist
pub fn load_inputs(inputs: &[PathBuf]) -> Result<Vec<LoadedPlaylist>> {
    let files = expand_inputs(inputs, |p| is_playlist(p) || is_video(p))
        .context("Failed to expand input directories")?;

    let mut loaded = Vec::new();
    let mut videos = Vec::new();
    for file in files {
        if is_playlist(&file) {
            let playlist = Playlist::load(&file)
                .with_context(|| format!("Failed to load playlist {}", file.display()))?;
            loaded.push(LoadedPlaylist {
                path: Some(file),
                playlist,
            });
        } else {
            videos.push(Locator::parse(&file.to_string_lossy()));
        }
    }
    if !videos.is_empty() {
        loaded.push(LoadedPlaylist {
            path: None,
            playlist: Playlist::from_locators(videos),
        });
    }
    if loaded.is_empty() {
        anyhow::bail!("No playlists or videos found in the given inputs");
    }
    Ok(loaded)
}

/// Probe all playlists in one session and persist the host ledger
async fn enrich_all(
    container: &DefaultAppContainer,
    loaded: &mut [LoadedPlaylist],
    force: bool,
) -> Result<()> {
    let probe = container.probe_port().context("Cannot probe without ffprobe")?;
    let liveness = container.liveness_port();
    let mut session = container
        .probe_session(force)
        .context("Failed to load host failure ledger")?;

    let (mut processed, mut skipped, mut failed) = (0, 0, 0);
    for item in loaded.iter_mut() {
        let report = session
            .enrich(&mut item.playlist, probe.clone(), liveness.clone())
            .await
            .context("Probing failed")?;
        processed += report.processed();
        skipped += report.skipped();
        failed += report.failed();
    }
    if let Err(e) = session.save_ledger() {
        warn!(error = %e, "could not save host failure ledger");
    }
    eprintln!(
        "Entries: {} processed, {} skipped, {} failed",
        processed, skipped, failed
    );
    Ok(())
}

/// Print playlists, or write them back to their files
fn emit(loaded: &[LoadedPlaylist], options: &SerializeOptions, in_place: bool) -> Result<()> {
    for item in loaded {
        let text = item.playlist.to_m3u_string(options);
        match (&item.path, in_place) {
            (Some(path), true) => {
                std::fs::write(path, text)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                info!(path = %path.display(), entries = item.playlist.len(), "playlist rewritten");
            }
            _ => print!("{}", text),
        }
    }
    Ok(())
}

/// Execute the metadata command
pub async fn metadata(container: &DefaultAppContainer, args: MetadataArgs) -> Result<()> {
    let mut loaded = load_inputs(&args.input.inputs)?;
    enrich_all(container, &mut loaded, args.force).await?;
    emit(&loaded, &SerializeOptions { annotate: true }, args.in_place)
}

/// Execute the sort command
pub async fn sort(container: &DefaultAppContainer, args: SortArgs) -> Result<()> {
    let mut loaded = load_inputs(&args.input.inputs)?;
    enrich_all(container, &mut loaded, false).await?;
    for item in loaded.iter_mut() {
        item.playlist.sort_by_quality();
    }
    emit(&loaded, &SerializeOptions::default(), args.in_place)
}

/// Execute the split command
pub async fn split(container: &DefaultAppContainer, args: SplitArgs) -> Result<()> {
    let mut loaded = load_inputs(&args.input.inputs)?;
    if args.probe {
        enrich_all(container, &mut loaded, false).await?;
    }

    let interactor = container
        .split_interactor(!args.no_align)
        .context("Cannot list keyframes")?;
    let mut plans = Vec::new();
    let mut script = String::new();
    for item in loaded.iter_mut() {
        let outcome = interactor
            .execute(&mut item.playlist)
            .await
            .with_context(|| match &item.path {
                Some(path) => format!("Failed to plan split for {}", path.display()),
                None => "Failed to plan split".to_string(),
            })?;
        let body = if script.is_empty() {
            outcome.script.as_str()
        } else {
            outcome.script.strip_prefix(SCRIPT_HEAD).unwrap_or(&outcome.script)
        };
        script.push_str(body);
        plans.extend(outcome.plans);
    }

    let segments: usize = plans.iter().map(|p| p.items.len()).sum();
    let warnings: usize = plans.iter().map(|p| p.warnings.len()).sum();
    eprintln!("Sources: {}, segments: {}, warnings: {}", plans.len(), segments, warnings);

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&plans).context("Failed to serialize plans")?
        );
        return Ok(());
    }
    match &args.script {
        Some(path) => write_script(path, &script),
        None => {
            print!("{}", script);
            Ok(())
        }
    }
}

fn write_script(path: &Path, script: &str) -> Result<()> {
    std::fs::write(path, script).with_context(|| format!("Failed to write {}", path.display()))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
            .with_context(|| format!("Failed to make {} executable", path.display()))?;
    }
    info!(path = %path.display(), "split script written");
    Ok(())
}

/// Execute the screens command
pub async fn screens(container: &DefaultAppContainer, args: ScreensArgs) -> Result<()> {
    let skip_intro = args
        .skip_intro
        .as_deref()
        .map(parse_seconds)
        .transpose()
        .context("Invalid --skip-intro")?;
    let settings = &container.config().screens;
    let layout = SheetLayout {
        columns: settings.columns,
        rows: settings.rows,
        skip_intro,
        output_dir: args.output_dir.clone(),
        overwrite: args.overwrite,
    };
    let interactor = container
        .screens_interactor(layout)
        .context("Contact sheets need ffmpeg and ImageMagick convert")?;

    let mut loaded = load_inputs(&args.input.inputs)?;
    enrich_all(container, &mut loaded, false).await?;

    for item in loaded.iter_mut() {
        let report = interactor.execute(&mut item.playlist).await?;
        eprintln!("Contact sheets: {}", report);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_inputs_groups_loose_videos() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("cuts.m3u"), "#EXTM3U\n#EXTINF:5,One\nrel/one.mkv\n").unwrap();
        fs::write(dir.path().join("a.mkv"), b"").unwrap();
        fs::write(dir.path().join("b.mp4"), b"").unwrap();
        fs::write(dir.path().join("notes.txt"), b"").unwrap();

        let loaded = load_inputs(&[dir.path().to_path_buf()]).unwrap();
        assert_eq!(loaded.len(), 2);
        assert!(loaded[0].path.as_ref().unwrap().ends_with("cuts.m3u"));
        assert_eq!(loaded[0].playlist.len(), 1);
        assert!(loaded[1].path.is_none());
        assert_eq!(loaded[1].playlist.len(), 2);
    }

    #[test]
    fn test_load_inputs_rejects_empty_and_broken() {
        let dir = TempDir::new().unwrap();
        assert!(load_inputs(&[dir.path().to_path_buf()]).is_err());

        let broken = dir.path().join("broken.m3u");
        fs::write(&broken, "#EXTM3U\n# nothing here\n").unwrap();
        let err = load_inputs(&[broken]).err().unwrap();
        assert!(format!("{:#}", err).contains("no entries"));
    }
}
