//! Raw study files through descriptor, redaction and back, the way the
//! batch driver runs them.

use pixelscrub::config::{self, CONFIG_FILE};
use pixelscrub::descriptor::{RawDescriptor, write_frames};
use pixelscrub::raster::Rect;
use pixelscrub::redact::RedactionEngine;
use std::fs;
use tempfile::TempDir;

const DESCRIPTOR: &str = r#"{
  "data": "mr.raw",
  "width": 4,
  "height": 2,
  "bands": 1,
  "sample_type": "u16",
  "frames": 2,
  "metadata": {
    "bits_allocated": 16,
    "bits_stored": 16,
    "high_bit": 15,
    "pixel_representation": 1,
    "pixel_padding_value": -7
  }
}"#;

fn write_study(dir: &TempDir) -> std::path::PathBuf {
    let samples: Vec<u8> = (1u16..=16).flat_map(|v| (v * 100).to_le_bytes()).collect();
    fs::write(dir.path().join("mr.raw"), samples).unwrap();
    let path = dir.path().join("mr.json");
    fs::write(&path, DESCRIPTOR).unwrap();
    path
}

#[test]
fn study_is_redacted_and_written_back() {
    let dir = TempDir::new().unwrap();
    let path = write_study(&dir);

    let descriptor = RawDescriptor::load(&path).unwrap();
    let frames = descriptor.read_frames(&path).unwrap();
    assert_eq!(frames.len(), 2);
    assert_eq!(frames.frames()[1].sample(0, 0, 0), Some(900.0));

    let flags = config::load_config(dir.path()).unwrap().redaction;
    let outcome = RedactionEngine::default()
        .redact(&frames, &[Rect::new(0, 0, 1, 2)], &descriptor.metadata, &flags)
        .unwrap();

    let out_raw = dir.path().join("mr.redacted.raw");
    write_frames(&out_raw, (0..outcome.frames.len()).map(|i| outcome.frames.frame(i))).unwrap();
    let written = RawDescriptor {
        data: "mr.redacted.raw".into(),
        sample_type: outcome.frames.sample_type(),
        metadata: outcome.metadata,
        ..descriptor
    };
    let out_json = dir.path().join("mr.redacted.json");
    written.save(&out_json).unwrap();

    let reloaded = RawDescriptor::load(&out_json).unwrap();
    let redacted = reloaded.read_frames(&out_json).unwrap();
    for frame in redacted.frames() {
        assert_eq!(frame.sample(0, 0, 0), Some(-7.0));
        assert_eq!(frame.sample(0, 1, 0), Some(-7.0));
    }
    assert_eq!(redacted.frames()[0].sample(1, 0, 0), Some(200.0));
    assert_eq!(redacted.frames()[1].sample(3, 1, 0), Some(1600.0));
}

#[test]
fn config_flags_drive_the_fill() {
    let dir = TempDir::new().unwrap();
    let path = write_study(&dir);
    fs::write(
        dir.path().join(CONFIG_FILE),
        "[redaction]\nuse_pixel_padding_value = false\n",
    )
    .unwrap();

    let descriptor = RawDescriptor::load(&path).unwrap();
    let frames = descriptor.read_frames(&path).unwrap();
    let flags = config::load_config(dir.path()).unwrap().redaction;
    let outcome = RedactionEngine::default()
        .redact(&frames, &[Rect::new(2, 0, 1, 1)], &descriptor.metadata, &flags)
        .unwrap();
    let frame = outcome.frames.frame(0).unwrap();
    assert_eq!(frame.sample(2, 0, 0), Some(f64::from(i16::MIN)));
}
