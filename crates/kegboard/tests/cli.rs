#![cfg(feature = "cli")]

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output};

use kegboard::frame::HEADER_SIZE;
use kegboard::message::{Hello, Message, MessageKind};

fn kegboard() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_kegboard"));
    command
        .env_remove("KEGBOARD_DEVICE")
        .env_remove("KEGBOARD_SPEED")
        .arg("--log-level")
        .arg("error");
    command
}

fn wire(message: &Message) -> Vec<u8> {
    message.to_frame_bytes().expect("message should encode").to_vec()
}

fn meter(name: &str, reading: u32) -> Message {
    Message::of(MessageKind::MeterStatus)
        .with("meter_name", name)
        .and_then(|m| m.with("meter_reading", reading))
        .expect("meter fields should be valid")
}

fn capture(frames: &[Vec<u8>]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp file should be creatable");
    for frame in frames {
        file.write_all(frame).expect("capture should be writable");
    }
    file.flush().expect("capture should flush");
    file
}

fn stdout_lines(output: &Output) -> Vec<String> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::to_string)
        .collect()
}

fn missing_device() -> PathBuf {
    PathBuf::from(format!(
        "/tmp/kegboard-missing-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ))
}

#[test]
fn version_prints_package_version() {
    let output = kegboard().arg("version").output().expect("version should run");

    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        format!("kegboard {}", env!("CARGO_PKG_VERSION"))
    );
}

#[test]
fn version_extended_reports_protocol() {
    let output = kegboard()
        .arg("version")
        .arg("--extended")
        .output()
        .expect("version should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("protocol: KBSP v1"));
    assert!(stdout.contains("default_speed: 115200"));
}

#[test]
fn monitor_replays_capture_as_json() {
    let hello = Hello {
        firmware_version: Some(18),
        serial_number: Some("KB-0001".to_string()),
    }
    .to_message()
    .expect("hello should build");
    let file = capture(&[wire(&hello), wire(&meter("flow0", 2200)), wire(&meter("flow1", 5))]);

    let output = kegboard()
        .arg("--format")
        .arg("json")
        .arg("monitor")
        .arg("--device")
        .arg(file.path())
        .arg("--count")
        .arg("2")
        .output()
        .expect("monitor should run");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let lines = stdout_lines(&output);
    assert_eq!(lines.len(), 2);

    let first: serde_json::Value = serde_json::from_str(&lines[0]).expect("json line");
    assert_eq!(first["type"], "hello");
    assert_eq!(first["firmware_version"], 18);
    assert_eq!(first["serial_number"], "KB-0001");
    assert!(first.get("timestamp").is_some());

    let second: serde_json::Value = serde_json::from_str(&lines[1]).expect("json line");
    assert_eq!(second["type"], "meter_status");
    assert_eq!(second["id"], 0x10);
    assert_eq!(second["meter_reading"], 2200);
}

#[test]
fn monitor_skips_corrupted_frames() {
    let mut corrupted = wire(&meter("bad", 1));
    corrupted[HEADER_SIZE + 3] ^= 0x01;
    let file = capture(&[wire(&meter("a", 1)), corrupted, wire(&meter("c", 3))]);

    let output = kegboard()
        .arg("--format")
        .arg("pretty")
        .arg("monitor")
        .arg("--device")
        .arg(file.path())
        .arg("--count")
        .arg("2")
        .output()
        .expect("monitor should run");

    assert!(output.status.success());
    assert_eq!(
        stdout_lines(&output),
        vec![
            "<meter_status: meter_name=a meter_reading=1>",
            "<meter_status: meter_name=c meter_reading=3>",
        ]
    );
}

#[test]
fn info_on_missing_device_fails() {
    let output = kegboard()
        .arg("info")
        .arg("--device")
        .arg(missing_device())
        .arg("--timeout")
        .arg("100ms")
        .output()
        .expect("info should run");

    assert_eq!(output.status.code(), Some(3));
    assert!(String::from_utf8_lossy(&output.stderr).contains("failed to open"));
}

#[test]
fn info_cannot_ping_a_capture_replay() {
    let file = capture(&[wire(&meter("flow0", 1))]);

    let output = kegboard()
        .arg("info")
        .arg("--device")
        .arg(file.path())
        .arg("--timeout")
        .arg("100ms")
        .output()
        .expect("info should run");

    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn tester_cannot_drive_a_capture_replay() {
    let file = capture(&[]);

    let output = kegboard()
        .arg("tester")
        .arg("--device")
        .arg(file.path())
        .arg("--cycles")
        .arg("1")
        .arg("--interval")
        .arg("1ms")
        .output()
        .expect("tester should run");

    assert_eq!(output.status.code(), Some(64));
    assert!(String::from_utf8_lossy(&output.stderr).contains("tester failed"));
}
