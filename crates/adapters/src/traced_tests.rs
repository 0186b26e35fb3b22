// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::session::{FakeSessionAdapter, SessionCall};

#[tokio::test]
async fn traced_session_delegates_spawn_and_kill() {
    let fake = FakeSessionAdapter::new();
    fake.set_next_pid(777);
    let traced = TracedSession::new(fake.clone());

    let argv = vec!["happy".to_string(), "claude".to_string()];
    let proc = traced
        .spawn("happy", "w1", Path::new("/tmp"), &argv, &[])
        .await
        .unwrap();
    assert_eq!(proc.pid, 777);

    traced.kill(&proc.target).await.unwrap();

    let calls = fake.calls();
    assert_eq!(calls.len(), 2);
    assert!(matches!(&calls[1], SessionCall::Kill { target } if target == "happy:w1"));
}

#[tokio::test]
async fn traced_session_propagates_spawn_errors() {
    let fake = FakeSessionAdapter::new();
    fake.fail_spawn("no server running");
    let traced = TracedSession::new(fake);

    let err = traced
        .spawn("happy", "w1", Path::new("/tmp"), &["x".to_string()], &[])
        .await
        .unwrap_err();
    assert!(err.to_string().contains("no server running"));
}
