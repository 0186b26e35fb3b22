// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::daemon::test_support::harness;
use crate::registry::TrackedSession;
use hp_adapters::{SessionCall, SignalCall};
use hp_core::SessionId;
use hp_storage::MarkerWrite;
use serde_json::json;

const CMD: &str = "happy claude --started-by daemon";

#[tokio::test]
async fn stops_reported_session_and_removes_marker() {
    let h = harness();
    h.inspector.insert(900, CMD);
    h.daemon
        .on_session_webhook(SessionId::new("s-9"), json!({"hostPid": 900, "happyHomeDir": h.dir.path()}));

    assert!(h.daemon.stop_session("s-9").await);

    assert_eq!(h.inspector.signals(), vec![SignalCall::Terminate { pid: 900 }]);
    assert!(h.daemon.registry().is_empty());
    assert!(h.daemon.markers().read(900).is_none());
}

#[tokio::test]
async fn unknown_session_is_not_stopped() {
    let h = harness();
    assert!(!h.daemon.stop_session("nope").await);
    assert!(h.inspector.signals().is_empty());
}

#[tokio::test]
async fn recycled_pid_is_refused() {
    let h = harness();
    h.inspector.insert(900, CMD);
    h.daemon
        .on_session_webhook(SessionId::new("s-9"), json!({"hostPid": 900, "happyHomeDir": h.dir.path()}));

    // The session died and an unrelated process took its pid
    h.inspector.insert(900, "/usr/bin/postgres -D /var/lib/pg");

    assert!(!h.daemon.stop_session("s-9").await);
    assert!(h.inspector.signals().is_empty());
    assert!(h.daemon.registry().contains(900));
}

#[tokio::test]
async fn hash_mismatch_on_allow_listed_process_is_refused() {
    let h = harness();
    h.inspector.insert(900, CMD);
    h.daemon
        .on_session_webhook(SessionId::new("s-9"), json!({"hostPid": 900, "happyHomeDir": h.dir.path()}));
    h.inspector.insert(900, "happy claude --started-by daemon --resume other");

    assert!(!h.daemon.stop_session("s-9").await);
    assert!(h.inspector.signals().is_empty());
}

#[tokio::test]
async fn owned_child_is_signaled_without_safety_check() {
    let h = harness();
    // Command line is not recognisable, but the daemon holds the handle
    h.inspector.insert(77, "/tmp/some-wrapper");
    h.daemon
        .registry()
        .insert(TrackedSession::spawned(77, None, true));

    assert!(h.daemon.stop_session("PID-77").await);
    assert_eq!(h.inspector.signals(), vec![SignalCall::Terminate { pid: 77 }]);
}

#[tokio::test]
async fn tmux_spawned_session_still_needs_safety_check() {
    let h = harness();
    h.inspector.insert(78, "/tmp/some-wrapper");
    h.daemon
        .registry()
        .insert(TrackedSession::spawned(78, Some("happy:w".to_string()), false));

    assert!(!h.daemon.stop_session("PID-78").await);
    assert!(h.inspector.signals().is_empty());
}

#[tokio::test]
async fn already_exited_session_is_cleaned_up() {
    let h = harness();
    h.daemon
        .registry()
        .insert(TrackedSession::spawned(79, None, true));
    h.daemon
        .markers()
        .write(MarkerWrite {
            pid: 79,
            session_id: SessionId::new("s-79"),
            started_by: None,
            metadata: None,
            process_command_hash: None,
        })
        .unwrap();

    assert!(h.daemon.stop_session("PID-79").await);
    assert!(h.daemon.registry().is_empty());
    assert!(h.daemon.markers().read(79).is_none());
}

#[tokio::test]
async fn tmux_session_loses_its_window_and_codex_home() {
    let h = harness();
    let codex_home = h.dir.path().join("tmp").join("codex-home-test");
    std::fs::create_dir_all(&codex_home).unwrap();
    std::fs::write(codex_home.join("auth.json"), "{}").unwrap();
    h.inspector.insert(81, CMD);
    let mut session = TrackedSession::spawned(81, Some("happy:codex-1".to_string()), false);
    session.codex_home = Some(codex_home.clone());
    h.daemon.registry().insert(session);
    h.daemon
        .on_session_webhook(SessionId::new("s-81"), json!({"hostPid": 81, "happyHomeDir": h.dir.path()}));

    assert!(h.daemon.stop_session("s-81").await);

    assert_eq!(h.inspector.signals(), vec![SignalCall::Terminate { pid: 81 }]);
    assert_eq!(
        h.sessions.calls(),
        vec![SessionCall::Kill {
            target: "happy:codex-1".to_string()
        }]
    );
    assert!(!codex_home.exists());
}

#[tokio::test]
async fn refused_stop_leaves_the_window_alone() {
    let h = harness();
    h.inspector.insert(82, "/usr/bin/postgres");
    h.daemon
        .registry()
        .insert(TrackedSession::spawned(82, Some("happy:w".to_string()), false));

    assert!(!h.daemon.stop_session("PID-82").await);
    assert!(h.sessions.calls().is_empty());
}
