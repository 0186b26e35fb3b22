// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::io::Write;

fn write_bytes(path: &Path, size: u64) {
    let mut f = std::fs::File::create(path).unwrap();
    f.write_all(&vec![b'x'; size as usize]).unwrap();
}

fn size(path: &Path) -> u64 {
    std::fs::metadata(path).unwrap().len()
}

#[test]
fn startup_marker_appends_with_pid() {
    let dir = tempfile::tempdir().unwrap();
    let config = DaemonConfig::for_home(dir.path());

    write_startup_marker(&config).unwrap();
    write_startup_marker(&config).unwrap();

    let log = std::fs::read_to_string(&config.log_path).unwrap();
    let expected = format!("{}{}) ---", STARTUP_MARKER_PREFIX, std::process::id());
    assert_eq!(log.lines().filter(|l| *l == expected).count(), 2);
}

#[test]
fn startup_error_is_appended_after_marker() {
    let dir = tempfile::tempdir().unwrap();
    let config = DaemonConfig::for_home(dir.path());
    write_startup_marker(&config).unwrap();

    write_startup_error(&config, &LifecycleError::AlreadyRunning { holder: Some(42) });

    let log = std::fs::read_to_string(&config.log_path).unwrap();
    let last = log.lines().last().unwrap();
    assert_eq!(last, "ERROR Failed to start daemon: Daemon already running (pid 42)");
}

#[test]
fn small_log_is_left_alone() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("daemon.log");
    write_bytes(&log, 1024);

    rotate_log_if_needed(&log);

    assert!(log.exists());
    assert!(!dir.path().join("daemon.log.1").exists());
}

#[test]
fn large_log_shifts_rotations_and_drops_oldest() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("daemon.log");
    write_bytes(&dir.path().join("daemon.log.1"), 100);
    write_bytes(&dir.path().join("daemon.log.2"), 200);
    write_bytes(&dir.path().join("daemon.log.3"), 300);
    write_bytes(&log, MAX_LOG_SIZE + 1);

    rotate_log_if_needed(&log);

    assert!(!log.exists());
    assert_eq!(size(&dir.path().join("daemon.log.1")), MAX_LOG_SIZE + 1);
    assert_eq!(size(&dir.path().join("daemon.log.2")), 100);
    assert_eq!(size(&dir.path().join("daemon.log.3")), 200);
    assert!(!dir.path().join("daemon.log.4").exists());
}

#[test]
fn missing_log_is_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    rotate_log_if_needed(&dir.path().join("daemon.log"));
}
