//! Command-line tests that do not need ffmpeg

use std::error::Error;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::contains;
use tempfile::tempdir;

/// Binary isolated from user config files and `EDDIT_*` variables
fn eddit_cmd(work_dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("eddit").expect("Failed to find eddit binary");
    cmd.current_dir(work_dir)
        .env("XDG_CONFIG_HOME", work_dir)
        .env_remove("RUST_LOG")
        .env_remove("EDDIT_CONFIG")
        .env_remove("EDDIT_LOG_LEVEL");
    cmd
}

#[test]
fn test_help_lists_commands() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    eddit_cmd(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("inspect").and(contains("plan")).and(contains("process")));
    Ok(())
}

#[test]
fn test_plan_json_lists_outputs() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let out = dir.path().join("out");

    let assert = eddit_cmd(dir.path())
        .args(["plan", "--input", "source.mp4", "--output-dir"])
        .arg(&out)
        .args(["--segment", "0,5,A", "--segment", "0:10,0:12,B", "--json"])
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone())?;
    let plan: serde_json::Value = serde_json::from_str(&stdout)?;
    let jobs = plan["jobs"].as_array().ok_or("jobs missing")?;
    assert_eq!(jobs.len(), 2);
    let a = out.join("A.mp4").to_string_lossy().to_string();
    let b = out.join("B.mp4").to_string_lossy().to_string();
    assert_eq!(jobs[0]["output_path"], a.as_str());
    assert_eq!(jobs[1]["output_path"], b.as_str());
    assert_eq!(jobs[1]["start_time"], 10.0);
    assert_eq!(jobs[0]["settings"]["codec"], "libx264");
    assert_eq!(jobs[0]["settings"]["quality"], 23);
    Ok(())
}

#[test]
fn test_plan_reads_project_file() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    std::fs::write(
        dir.path().join("session.yaml"),
        "source: in.mp4\noutput_dir: clips\nsettings:\n  preset: slow\nsegments:\n  - {start: 0, end: 3, name: Intro cut}\n",
    )?;

    eddit_cmd(dir.path())
        .args(["plan", "--project", "session.yaml"])
        .assert()
        .success()
        .stdout(contains("Intro cut.mp4").and(contains("slow")));
    Ok(())
}

#[test]
fn test_plan_rejects_bad_segments() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;

    eddit_cmd(dir.path())
        .args(["plan", "--input", "in.mp4", "--output-dir", "out", "--segment", "5,1"])
        .assert()
        .failure()
        .stderr(contains("Invalid time range"));

    eddit_cmd(dir.path())
        .args(["plan", "--input", "in.mp4", "--output-dir", "out", "--segment", "later,1"])
        .assert()
        .failure()
        .stderr(contains("Invalid segment"));
    Ok(())
}

#[test]
fn test_plan_requires_segments() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;

    eddit_cmd(dir.path())
        .args(["plan", "--input", "in.mp4", "--output-dir", "out"])
        .assert()
        .failure()
        .stderr(contains("Nothing to process"));
    Ok(())
}

#[test]
fn test_quality_out_of_range_for_codec() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;

    eddit_cmd(dir.path())
        .args(["plan", "--input", "in.mp4", "--output-dir", "out", "--segment", "0,1"])
        .args(["--quality", "60"])
        .assert()
        .failure()
        .stderr(contains("out of range"));

    eddit_cmd(dir.path())
        .args(["plan", "--input", "in.mp4", "--output-dir", "out", "--segment", "0,1"])
        .args(["--quality", "60", "--codec", "libx265"])
        .assert()
        .success();
    Ok(())
}

#[test]
fn test_inspect_missing_file() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;

    eddit_cmd(dir.path())
        .args(["inspect", "--input", "surely/not/here.mp4"])
        .assert()
        .failure()
        .stderr(contains("File not found"));
    Ok(())
}

#[test]
fn test_invalid_config_file_is_reported() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    std::fs::write(dir.path().join("eddit.toml"), "[engine]\nstage_attempts = 0\n")?;

    eddit_cmd(dir.path())
        .args(["plan", "--input", "in.mp4", "--output-dir", "out", "--segment", "0,1"])
        .assert()
        .failure()
        .stderr(contains("stage_attempts"));
    Ok(())
}

#[cfg(unix)]
#[test]
fn test_non_utf8_environment_is_tolerated() -> Result<(), Box<dyn Error>> {
    use std::ffi::OsString;
    use std::os::unix::ffi::OsStringExt;

    let dir = tempdir()?;

    eddit_cmd(dir.path())
        .env("EDDIT_TEST_JUNK", OsString::from_vec(vec![0xff]))
        .args(["plan", "--input", "in.mp4", "--output-dir", "out", "--segment", "0,5,A"])
        .assert()
        .success()
        .stdout(contains("A.mp4"));
    Ok(())
}
