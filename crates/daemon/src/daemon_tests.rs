// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::test_support::harness;
use super::*;
use crate::registry::TrackedSession;
use hp_core::SessionId;

#[test]
fn first_shutdown_request_wins() {
    let signal = ShutdownSignal::default();
    assert!(!signal.is_requested());

    assert!(signal.request(ShutdownSource::MobileApp));
    assert!(!signal.request(ShutdownSource::OsSignal));

    assert!(signal.is_requested());
    assert_eq!(signal.source(), Some(ShutdownSource::MobileApp));
    assert!(signal.token().is_cancelled());
}

#[test]
fn list_children_reports_every_tracked_pid() {
    let h = harness();
    h.daemon
        .registry()
        .insert(TrackedSession::spawned(2, None, true));
    h.daemon
        .registry()
        .insert(TrackedSession::external(1, SessionId::new("s-1")));

    let children = h.daemon.list_children();

    assert_eq!(children.len(), 2);
    assert_eq!(children[0].happy_session_id, Some(SessionId::new("s-1")));
    assert_eq!(children[1].happy_session_id, None);
    assert_eq!(children[1].started_by, hp_core::StartedBy::Daemon);
}
