use std::{fs, thread::sleep, time::Duration};

use serial_test::serial;
use tempfile::tempdir;

// The global subscriber can only be installed once per test binary, so the
// file-backed case is the only one exercised here.
#[test]
#[serial]
fn log_file_receives_generation_events() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("logs").join("canvas.log");

    ideation_canvas::logging::init(true, Some(path.clone()));
    tracing::info!(ticket = 7u64, "generation applied");
    tracing::debug!("debug line");

    sleep(Duration::from_millis(100));

    assert!(path.exists(), "log file was not created");
    let contents = fs::read_to_string(path).unwrap();
    assert!(contents.contains("generation applied"));
    assert!(contents.contains("ticket=7"));
    assert!(contents.contains("debug line"));
    assert!(!contents.contains("\u{1b}["), "file output should not carry ANSI colours");
}
