// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::daemon::test_support::harness;
use crate::registry::SessionPhase;
use hp_core::{SessionId, StartedBy};
use hp_storage::hash_process_command;
use serde_json::json;

#[test]
fn unexpected_pid_is_tracked_as_external() {
    let h = harness();
    h.inspector.insert(4242, "happy claude");

    let session = h
        .daemon
        .on_session_webhook(
            SessionId::new("s-ext"),
            json!({"hostPid": 4242, "happyHomeDir": h.dir.path(), "path": "/work"}),
        )
        .unwrap();

    assert_eq!(session.started_by, StartedBy::External);
    assert_eq!(session.phase, SessionPhase::Running);
    assert_eq!(
        session.process_command_hash,
        Some(hash_process_command("happy claude"))
    );
    let marker = h.daemon.markers().read(4242).unwrap();
    assert_eq!(marker.metadata.unwrap()["path"], "/work");
}

#[test]
fn report_from_other_installation_is_ignored() {
    let h = harness();

    let ignored = h.daemon.on_session_webhook(
        SessionId::new("s"),
        json!({"hostPid": 1, "happyHomeDir": "/somewhere/else/.happy"}),
    );

    assert!(ignored.is_none());
    assert!(h.daemon.registry().is_empty());
    assert!(h.daemon.markers().list().is_empty());
}

#[test]
fn report_without_pid_is_ignored() {
    let h = harness();
    let ignored = h
        .daemon
        .on_session_webhook(SessionId::new("s"), json!({"happyHomeDir": h.dir.path()}));
    assert!(ignored.is_none());
}

#[test]
fn repeated_reports_keep_marker_creation_time() {
    let h = harness();
    let metadata = json!({"hostPid": 7, "happyHomeDir": h.dir.path()});

    h.daemon
        .on_session_webhook(SessionId::new("s"), metadata.clone());
    let first = h.daemon.markers().read(7).unwrap();
    std::thread::sleep(std::time::Duration::from_millis(5));
    h.daemon.on_session_webhook(SessionId::new("s"), metadata);
    let second = h.daemon.markers().read(7).unwrap();

    assert_eq!(first.created_at, second.created_at);
    assert!(second.updated_at >= first.updated_at);
    assert_eq!(h.daemon.registry().len(), 1);
}
