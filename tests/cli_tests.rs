use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn screencap(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("screencap").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("RUST_LOG")
        .env("SCREENCAP_STATE_FILE", dir.path().join("hosts.json"))
        .env("SCREENCAP_LOG_LEVEL", "warn");
    cmd
}

const CUTS: &str = "#EXTM3U
#EXTVLCOPT:start-time=10
#EXTVLCOPT:stop-time=20
#EXTINF:10,Opening
movie.avi
#EXTVLCOPT:start-time=20
#EXTVLCOPT:stop-time=30
#EXTINF:10,Ending
movie.avi
";

#[test]
fn test_help_lists_commands() {
    let dir = TempDir::new().unwrap();
    screencap(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("metadata"))
        .stdout(predicate::str::contains("split"))
        .stdout(predicate::str::contains("screens"));
}

#[test]
fn test_split_prints_script_without_tools() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("cuts.m3u"), CUTS).unwrap();

    screencap(&dir)
        .args(["split", "cuts.m3u", "--no-align", "-o", "clips"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("#! /usr/bin/env bash\nset -e\n"))
        .stdout(predicate::str::contains("-ss 10 -to 20"))
        .stdout(predicate::str::contains("clips/movie_Scene-002.avi"))
        .stderr(predicate::str::contains("segments: 2"));
}

#[test]
fn test_split_json_dump() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("cuts.m3u"), CUTS).unwrap();

    let output = screencap(&dir)
        .args(["split", "cuts.m3u", "--no-align", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let plans: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(plans[0]["items"].as_array().unwrap().len(), 2);
    assert_eq!(plans[0]["items"][1]["sequence"], 2);
}

#[test]
fn test_split_writes_script_file() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("cuts.m3u"), CUTS).unwrap();

    screencap(&dir)
        .args(["split", "cuts.m3u", "--no-align", "--script", "split.sh"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
    let script = std::fs::read_to_string(dir.path().join("split.sh")).unwrap();
    assert!(script.contains("mkdir -p delme covers"));
}

#[test]
fn test_broken_playlist_fails_with_line() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("bad.m3u"), "#EXTM3U\n#EXTVLCOPT:stop-time=x\na.mkv\n").unwrap();

    screencap(&dir)
        .args(["split", "bad.m3u", "--no-align"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("line 2"));
}

#[test]
fn test_invalid_config_value_is_rejected() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("cuts.m3u"), CUTS).unwrap();

    screencap(&dir)
        .env("SCREENCAP_PROBE_WORKERS", "0")
        .args(["split", "cuts.m3u", "--no-align"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("probe.workers"));
}
