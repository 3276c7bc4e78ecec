//! CLI integration tests.
//!
//! Tests:
//! - --help and --version output
//! - A piped session through the real binary

use std::io::Write;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use tempfile::TempDir;

const BIN: &str = env!("CARGO_BIN_EXE_replstats");

/// --help should describe the interval argument and exporter options.
#[test]
fn test_cli_help_output() {
    let output = Command::new(BIN)
        .arg("--help")
        .output()
        .expect("failed to run");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    for option in ["[INTERVAL]", "--stats-file", "--metrics-port", "--otel-endpoint", "--log-level"] {
        assert!(stdout.contains(option), "help should mention {option}: {stdout}");
    }
}

/// --version should show the version.
#[test]
fn test_cli_version_output() {
    let output = Command::new(BIN)
        .arg("--version")
        .output()
        .expect("failed to run");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains(env!("CARGO_PKG_VERSION")),
        "version output should contain version number: {stdout}"
    );
}

/// A zero interval is rejected before anything starts.
#[test]
fn test_cli_rejects_zero_interval() {
    let output = Command::new(BIN)
        .arg("0")
        .stdin(Stdio::null())
        .output()
        .expect("failed to run");

    assert!(!output.status.success());
}

/// Piping lines through the binary echoes them uppercased and leaves a
/// stats file behind.
#[test]
fn test_piped_session() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let stats_file = dir.path().join("stats.txt");
    std::fs::write(&stats_file, "left over from a previous run\n").unwrap();

    let mut child = Command::new(BIN)
        .args(["60", "--metrics-port", "0", "--otel-endpoint", "http://127.0.0.1:1"])
        .arg("--stats-file")
        .arg(&stats_file)
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("failed to spawn");

    child
        .stdin
        .take()
        .expect("stdin is piped")
        .write_all(b"hello\n")
        .unwrap();

    // Closing stdin ends the session.
    let deadline = Instant::now() + Duration::from_secs(30);
    while child.try_wait().unwrap().is_none() {
        if Instant::now() > deadline {
            child.kill().unwrap();
            panic!("replstats did not exit after stdin closed");
        }
        std::thread::sleep(Duration::from_millis(50));
    }

    let output = child.wait_with_output().unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("> < HELLO\n\n"), "{stdout}");

    let stats = std::fs::read_to_string(&stats_file).unwrap();
    assert!(!stats.contains("left over"), "stats file should be reset at startup");
    assert!(stats.contains("replstats/lines_in--"));
    assert!(stats.contains("CountData{count=1}"), "{stats}");
}
