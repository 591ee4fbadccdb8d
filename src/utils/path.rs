//! Path utilities: shell quoting, physical identity and input discovery

use std::path::{Component, Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::domain::model::Locator;
use crate::error::ScreencapResult;

/// Playlist extensions recognised when walking directories
pub const PLAYLIST_EXTENSIONS: &[&str] = &["m3u", "m3u8"];

/// Video extensions recognised when walking directories
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "avi", "flv", "m2ts", "m4v", "mkv", "mov", "mp4", "mpeg", "mpg", "ts", "webm", "wmv",
];

/// Quote one word for POSIX shells
pub fn shell_quote(word: &str) -> String {
    let safe = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "@%+=:,./-_".contains(c));
    if safe {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r#"'"'"'"#))
    }
}

pub fn shell_quote_path(path: &Path) -> String {
    shell_quote(&path.to_string_lossy())
}

/// Locator identifying the physical file: local paths that exist are
/// canonicalized, missing ones are normalized lexically
pub fn physical_locator(locator: &Locator) -> Locator {
    match locator {
        Locator::Local(path) => match path.canonicalize() {
            Ok(canonical) => Locator::Local(canonical),
            Err(_) => Locator::Local(normalize_lexically(path)),
        },
        Locator::Remote(_) => locator.clone(),
    }
}

/// Drop `.` components and fold `..` into its parent where one exists
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => normalized.push(".."),
            },
            other => normalized.push(other.as_os_str()),
        }
    }
    if normalized.as_os_str().is_empty() {
        normalized.push(".");
    }
    normalized
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .map(|ext| extensions.contains(&ext.to_string_lossy().to_lowercase().as_str()))
        .unwrap_or(false)
}

pub fn is_playlist(path: &Path) -> bool {
    has_extension(path, PLAYLIST_EXTENSIONS)
}

pub fn is_video(path: &Path) -> bool {
    has_extension(path, VIDEO_EXTENSIONS)
}

/// Expand directory arguments into the files under them that `keep` accepts
///
/// File arguments are passed through untouched; directory contents come back
/// sorted so runs are reproducible.
pub fn expand_inputs(
    inputs: &[PathBuf],
    keep: impl Fn(&Path) -> bool,
) -> ScreencapResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found = Vec::new();
            for entry in WalkDir::new(input).follow_links(true) {
                let entry = entry.map_err(|e| {
                    std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
                })?;
                if entry.file_type().is_file() && keep(entry.path()) {
                    found.push(entry.into_path());
                }
            }
            found.sort();
            debug!(dir = %input.display(), files = found.len(), "expanded directory");
            files.extend(found);
        } else {
            files.push(input.clone());
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("plain-name_1.MKV"), "plain-name_1.MKV");
        assert_eq!(shell_quote("two words"), "'two words'");
        assert_eq!(shell_quote("it's"), r#"'it'"'"'s'"#);
        assert_eq!(shell_quote(""), "''");
        assert_eq!(shell_quote("$HOME"), "'$HOME'");
    }

    #[test]
    fn test_extension_filters() {
        assert!(is_playlist(Path::new("a/b.M3U")));
        assert!(is_video(Path::new("clip.webm")));
        assert!(!is_video(Path::new("notes.txt")));
        assert!(!is_video(Path::new("noext")));
    }

    #[test]
    fn test_expand_inputs_walks_directories() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("b.mkv"), b"").unwrap();
        fs::write(dir.path().join("sub").join("a.mp4"), b"").unwrap();
        fs::write(dir.path().join("readme.txt"), b"").unwrap();

        let explicit = PathBuf::from("explicit.avi");
        let files = expand_inputs(&[dir.path().to_path_buf(), explicit.clone()], is_video).unwrap();
        assert_eq!(files.len(), 3);
        assert!(files[0].ends_with("b.mkv"));
        assert!(files[1].ends_with("sub/a.mp4"));
        assert_eq!(files[2], explicit);
    }

    #[test]
    fn test_physical_locator_canonicalizes_existing_files() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("v.mkv");
        fs::write(&file, b"").unwrap();
        let dotted = Locator::Local(dir.path().join(".").join("v.mkv"));
        assert_eq!(
            physical_locator(&dotted),
            Locator::Local(file.canonicalize().unwrap())
        );
        let missing = Locator::parse("/no/such/file.mkv");
        assert_eq!(physical_locator(&missing), missing);
    }

    #[test]
    fn test_physical_locator_normalizes_missing_paths() {
        let spelled = |text: &str| physical_locator(&Locator::parse(text));
        assert_eq!(spelled("./a.mkv"), spelled("a.mkv"));
        assert_eq!(spelled("/d/sub/../a.mkv"), Locator::parse("/d/a.mkv"));
        assert_eq!(spelled("../x/./a.mkv"), Locator::parse("../x/a.mkv"));
        assert_eq!(spelled("/../a.mkv"), Locator::parse("/a.mkv"));
    }
}
