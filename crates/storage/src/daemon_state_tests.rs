// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

#[test]
fn missing_file_reads_none() {
    let home = tempdir().unwrap();
    assert!(DaemonStateFile::new(home.path()).read().is_none());
}

#[test]
fn corrupt_file_reads_none() {
    let home = tempdir().unwrap();
    let file = DaemonStateFile::new(home.path());
    fs::write(file.path(), "not json").unwrap();
    assert!(file.read().is_none());
}

#[test]
fn write_then_read() {
    let home = tempdir().unwrap();
    let file = DaemonStateFile::new(home.path());
    let mut record = DaemonStateRecord::new(4242, 51234, "1.2.3");
    record.daemon_log_path = Some(home.path().join("logs/daemon.log"));

    file.write(&record).unwrap();

    assert_eq!(file.read(), Some(record));
}

#[test]
fn wire_format_is_camel_case() {
    let record = DaemonStateRecord::new(1, 2, "v");
    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["httpPort"], 2);
    assert_eq!(json["startedWithCliVersion"], "v");
    assert!(json.get("lastHeartbeat").is_none());
}

#[test]
fn heartbeat_only_touches_own_file() {
    let home = tempdir().unwrap();
    let file = DaemonStateFile::new(home.path());
    file.write(&DaemonStateRecord::new(100, 1, "v")).unwrap();

    assert!(!file.touch_heartbeat(200).unwrap());
    assert!(file.read().unwrap().last_heartbeat.is_none());

    assert!(file.touch_heartbeat(100).unwrap());
    assert!(file.read().unwrap().last_heartbeat.is_some());
}

#[test]
fn heartbeat_without_file_is_false() {
    let home = tempdir().unwrap();
    assert!(!DaemonStateFile::new(home.path()).touch_heartbeat(1).unwrap());
}

#[test]
fn clear_leaves_foreign_state_alone() {
    let home = tempdir().unwrap();
    let file = DaemonStateFile::new(home.path());
    file.write(&DaemonStateRecord::new(100, 1, "v")).unwrap();

    assert!(!file.clear_if_owned(200).unwrap());
    assert!(file.path().exists());

    assert!(file.clear_if_owned(100).unwrap());
    assert!(!file.path().exists());
    assert!(!file.clear_if_owned(100).unwrap());
}
