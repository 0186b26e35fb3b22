// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::process::Command;
use std::time::{Duration, Instant};

#[test]
fn own_process_is_alive_with_command_line() {
    let inspector = SystemProcessInspector::new();
    let pid = std::process::id();
    assert!(inspector.is_alive(pid));
    let cmd = inspector.command_line(pid).unwrap();
    assert!(!cmd.is_empty());
}

#[yare::parameterized(
    zero     = { 0 },
    too_big  = { u32::MAX },
)]
fn invalid_pids_are_never_alive(pid: u32) {
    let inspector = SystemProcessInspector::new();
    assert!(!inspector.is_alive(pid));
    assert!(inspector.command_line(pid).is_none());
    assert!(matches!(
        inspector.terminate(pid),
        Err(SignalError::NoSuchProcess(_))
    ));
}

#[test]
fn child_command_line_and_terminate() {
    let inspector = SystemProcessInspector::new();
    let mut child = Command::new("sleep").arg("30").spawn().unwrap();
    let pid = child.id();

    let cmd = inspector.command_line(pid).unwrap();
    assert_eq!(cmd, "sleep 30");

    inspector.terminate(pid).unwrap();
    let status = child.wait().unwrap();
    assert!(!status.success());

    // Reaped: gone from the table
    let deadline = Instant::now() + Duration::from_secs(2);
    while inspector.is_alive(pid) && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(20));
    }
    assert!(!inspector.is_alive(pid));
}
