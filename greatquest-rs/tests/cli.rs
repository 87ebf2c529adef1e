//! CLI integration tests for the track commands

use assert_cmd::Command;
use glam::Vec4;
use gq_track::{ControlType, KeyValue, LinearKey, Track, TrackKey};
use predicates::prelude::*;
use std::fs::File;
use std::io::{BufWriter, Cursor, Write};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn linear_position(tick: i32, x: f32) -> TrackKey {
    TrackKey::new(
        tick,
        KeyValue::LinearPosition(LinearKey::new(Vec4::new(x, 0.0, 0.0, 1.0))),
    )
}

/// Write a position track for tag 4 followed by a scale track for tag 9
fn write_track_file(dir: &Path) -> PathBuf {
    let path = dir.join("tracks.bin");
    let mut writer = BufWriter::new(File::create(&path).unwrap());

    let mut position = Track::with_keys(
        ControlType::LinearPosition,
        4,
        vec![linear_position(0, 0.0), linear_position(10, 10.0)],
    );
    let mut scale = Track::with_keys(
        ControlType::LinearScale,
        9,
        vec![TrackKey::new(
            0,
            KeyValue::LinearScale(LinearKey::new(Vec4::new(2.0, 2.0, 2.0, 0.0))),
        )],
    );

    position.save(&mut writer, 0, true, true).unwrap();
    scale.save(&mut writer, 0, false, false).unwrap();
    writer.flush().unwrap();
    path
}

fn greatquest() -> Command {
    Command::cargo_bin("greatquest-rs").unwrap()
}

#[test]
fn test_track_info() {
    let dir = TempDir::new().unwrap();
    let path = write_track_file(dir.path());

    greatquest()
        .args(["track", "info"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Tracks: 2"))
        .stdout(predicate::str::contains("LINEAR_POSITION"))
        .stdout(predicate::str::contains("LINEAR_SCALE"))
        .stdout(predicate::str::contains("Tag: 9"));
}

#[test]
fn test_track_sample_halfway() {
    let dir = TempDir::new().unwrap();
    let path = write_track_file(dir.path());

    greatquest()
        .args(["track", "sample"])
        .arg(&path)
        .args(["--tick", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Position: [5, 0, 0]"))
        .stdout(predicate::str::contains("Still Animating: true"));
}

#[test]
fn test_track_sample_other_tag() {
    let dir = TempDir::new().unwrap();
    let path = write_track_file(dir.path());

    greatquest()
        .args(["track", "sample"])
        .arg(&path)
        .args(["--tag", "9", "--tick", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Scale: [2, 2, 2]"))
        .stdout(predicate::str::contains("Still Animating: false"));
}

#[test]
fn test_track_sample_rejects_nan_tick() {
    let dir = TempDir::new().unwrap();
    let path = write_track_file(dir.path());

    greatquest()
        .args(["track", "sample"])
        .arg(&path)
        .args(["--tick", "NaN"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid animation tick"));
}

#[test]
fn test_track_info_stops_at_backward_next_track() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("looping.bin");

    let mut first = Track::with_keys(
        ControlType::LinearPosition,
        4,
        vec![linear_position(0, 0.0), linear_position(10, 10.0)],
    );
    let mut second =
        Track::with_keys(ControlType::LinearPosition, 5, vec![linear_position(0, 1.0)]);

    let mut cursor = Cursor::new(Vec::new());
    first.save(&mut cursor, 0, true, true).unwrap();
    let second_start = cursor.position() as usize;
    second.save(&mut cursor, 0, false, true).unwrap();
    let mut data = cursor.into_inner();

    // Point the second track's next-track address back into the first track.
    data[second_start + 16..second_start + 20].copy_from_slice(&4u32.to_le_bytes());
    std::fs::write(&path, &data).unwrap();

    greatquest()
        .args(["track", "info"])
        .arg(&path)
        .timeout(std::time::Duration::from_secs(10))
        .assert()
        .success()
        .stdout(predicate::str::contains("Tracks: 2"));
}

#[test]
fn test_missing_file() {
    greatquest()
        .args(["track", "info", "does-not-exist.bin"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to open file"));
}
