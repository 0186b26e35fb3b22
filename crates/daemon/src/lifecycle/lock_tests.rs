// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use hp_adapters::FakeProcessInspector;
use yare::parameterized;

fn quick() -> RetryPolicy {
    RetryPolicy::new(2, Backoff::Fixed(Duration::from_millis(1)))
}

#[parameterized(
    live_holder = { Some(10), None, false },
    dead_holder = { Some(11), None, true },
    fresh_unreadable = { None, Some(1), false },
    old_unreadable = { None, Some(60), true },
    unreadable_unknown_age = { None, None, false },
)]
fn staleness(pid: Option<u32>, age_secs: Option<u64>, stale: bool) {
    let inspector = FakeProcessInspector::new();
    inspector.insert(10, "happy-daemon");
    let info = LockInfo {
        pid,
        age: age_secs.map(Duration::from_secs),
    };
    assert_eq!(is_stale_daemon_lock(&inspector, &info), stale);
}

#[tokio::test]
async fn acquires_free_lock() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("daemon.state.json.lock");
    let inspector = FakeProcessInspector::new();

    let lock = acquire_daemon_lock(&path, 321, &inspector, quick()).await.unwrap();

    assert_eq!(std::fs::read_to_string(&path).unwrap().trim(), "321");
    lock.release().unwrap();
    assert!(!path.exists());
}

#[tokio::test]
async fn live_holder_means_already_running() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("daemon.state.json.lock");
    std::fs::write(&path, "4000\n").unwrap();
    let inspector = FakeProcessInspector::new();
    inspector.insert(4000, "happy-daemon");

    let err = acquire_daemon_lock(&path, 321, &inspector, quick())
        .await
        .unwrap_err();

    assert!(
        matches!(err, LifecycleError::AlreadyRunning { holder: Some(4000) }),
        "{err:?}"
    );
    assert_eq!(std::fs::read_to_string(&path).unwrap().trim(), "4000");
}

#[tokio::test]
async fn dead_holder_is_reclaimed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("daemon.state.json.lock");
    std::fs::write(&path, "4001\n").unwrap();
    let inspector = FakeProcessInspector::new();

    let _lock = acquire_daemon_lock(&path, 321, &inspector, quick()).await.unwrap();

    assert_eq!(std::fs::read_to_string(&path).unwrap().trim(), "321");
}

#[tokio::test]
async fn holder_exiting_between_attempts_is_picked_up() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("daemon.state.json.lock");
    std::fs::write(&path, "4002\n").unwrap();
    let inspector = FakeProcessInspector::new();
    inspector.insert(4002, "happy-daemon");

    let policy = RetryPolicy::new(20, Backoff::Fixed(Duration::from_millis(10)));
    let releaser = {
        let inspector = inspector.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            inspector.remove(4002);
        })
    };

    let lock = acquire_daemon_lock(&path, 321, &inspector, policy).await;
    releaser.await.unwrap();

    assert!(lock.is_ok());
}
