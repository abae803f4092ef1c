//! The `pixelscrub` binary run against raw studies in a temp directory.

use pixelscrub::descriptor::RawDescriptor;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const STUDY: &str = r#"{
  "data": "s.raw",
  "width": 4,
  "height": 4,
  "bands": 1,
  "sample_type": "u8",
  "frames": 3
}"#;

fn pixelscrub(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_pixelscrub"))
        .current_dir(dir)
        .args(args)
        .output()
        .unwrap()
}

fn write_study(dir: &Path) {
    let samples: Vec<u8> = (0..48).map(|i| i as u8 + 10).collect();
    fs::write(dir.join("s.raw"), samples).unwrap();
    fs::write(dir.join("s.json"), STUDY).unwrap();
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "stdout: {}\nstderr: {}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}

// =========================================================================
// redact
// =========================================================================

fn check_redacted_study(dir: &Path, out: &str) {
    let json = dir.join(out).join("s.redacted.json");
    let descriptor = RawDescriptor::load(&json).unwrap();
    assert_eq!(descriptor.frames, 3);
    let frames = descriptor.read_frames(&json).unwrap();
    assert_eq!(frames.len(), 3);
    for (index, frame) in frames.frames().iter().enumerate() {
        assert_eq!(frame.sample(1, 1, 0), Some(0.0));
        assert_eq!(frame.sample(3, 3, 0), Some((index * 16 + 15 + 10) as f64));
    }
}

#[test]
fn redacted_study_keeps_every_frame() {
    let dir = TempDir::new().unwrap();
    write_study(dir.path());

    let output = pixelscrub(
        dir.path(),
        &["redact", "s.json", "--region", "0,0,2,2", "--explicit-value", "0", "--output", "out"],
    );
    assert_success(&output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("(3 frames, 4x4x1"), "{stdout}");
    check_redacted_study(dir.path(), "out");
}

#[test]
fn spilled_study_is_written_before_release() {
    let dir = TempDir::new().unwrap();
    write_study(dir.path());
    fs::create_dir(dir.path().join("spill")).unwrap();
    fs::write(
        dir.path().join("tight.toml"),
        "[spillover]\nmemory_threshold = 1\ntemp_dir = \"spill\"\n",
    )
    .unwrap();

    let output = pixelscrub(
        dir.path(),
        &[
            "--config",
            "tight.toml",
            "redact",
            "s.json",
            "--region",
            "0,0,2,2",
            "--explicit-value",
            "0",
            "--output",
            "out",
        ],
    );
    assert_success(&output);
    check_redacted_study(dir.path(), "out");
    assert_eq!(fs::read_dir(dir.path().join("spill")).unwrap().count(), 0);
}

#[test]
fn redacted_output_can_be_redacted_again() {
    let dir = TempDir::new().unwrap();
    write_study(dir.path());
    let first = pixelscrub(dir.path(), &["redact", "s.json", "--region", "0,0,1,1"]);
    assert_success(&first);

    let second = pixelscrub(
        dir.path(),
        &["redact", "redacted/s.redacted.json", "--region", "3,3,1,1", "--output", "again"],
    );
    assert_success(&second);
    let json = dir.path().join("again/s.redacted.redacted.json");
    let frames = RawDescriptor::load(&json).unwrap().read_frames(&json).unwrap();
    assert_eq!(frames.len(), 3);
    assert_eq!(frames.frames()[2].sample(3, 3, 0), Some(0.0));
}

#[test]
fn failed_study_fails_the_run() {
    let dir = TempDir::new().unwrap();
    write_study(dir.path());
    fs::write(dir.path().join("s.raw"), [0u8; 5]).unwrap();

    let output = pixelscrub(dir.path(), &["redact", "s.json", "--region", "0,0,1,1"]);
    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("1 failed"), "{stdout}");
}

// =========================================================================
// resample and gen-config
// =========================================================================

#[test]
fn resample_writes_a_readable_frame() {
    let dir = TempDir::new().unwrap();
    write_study(dir.path());

    let output = pixelscrub(dir.path(), &["resample", "s.json", "--width", "2", "--height", "2"]);
    assert_success(&output);
    let json = dir.path().join("s.resampled.json");
    let descriptor = RawDescriptor::load(&json).unwrap();
    assert_eq!((descriptor.width, descriptor.height, descriptor.frames), (2, 2, 1));
    assert_eq!(descriptor.read_frames(&json).unwrap().len(), 1);
}

#[test]
fn gen_config_prints_the_stock_file() {
    let dir = TempDir::new().unwrap();
    let output = pixelscrub(dir.path(), &["gen-config"]);
    assert_success(&output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout, pixelscrub::config::stock_config_toml());
}
