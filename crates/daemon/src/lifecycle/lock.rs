// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon-wide exclusive lock.

use std::path::Path;
use std::time::Duration;

use hp_adapters::ProcessInspector;
use hp_core::{with_retry, Attempt, Backoff, RetryError, RetryPolicy};
use hp_storage::{LockError, LockFile, LockInfo};

use super::LifecycleError;

/// Lock without a readable pid older than this is considered abandoned
const UNREADABLE_LOCK_GRACE: Duration = Duration::from_secs(10);

/// Five attempts spaced 200ms, 400ms, ... apart; long enough for a
/// replaced daemon to shut down.
pub fn lock_retry_policy() -> RetryPolicy {
    RetryPolicy::new(
        5,
        Backoff::Linear {
            step: Duration::from_millis(200),
        },
    )
}

/// The holder is gone, or never wrote a pid and the file is old.
pub fn is_stale_daemon_lock<P: ProcessInspector + ?Sized>(inspector: &P, info: &LockInfo) -> bool {
    match info.pid {
        Some(pid) => !inspector.is_alive(pid),
        None => info.age.is_some_and(|age| age > UNREADABLE_LOCK_GRACE),
    }
}

pub async fn acquire_daemon_lock<P: ProcessInspector + ?Sized>(
    path: &Path,
    owner_pid: u32,
    inspector: &P,
    policy: RetryPolicy,
) -> Result<LockFile, LifecycleError> {
    let result = with_retry(policy, |attempt| async move {
        match LockFile::try_acquire(path, owner_pid, |info| is_stale_daemon_lock(inspector, info)) {
            Ok(lock) => Ok(lock),
            Err(e @ LockError::Held { .. }) => {
                tracing::debug!(attempt, error = %e, "daemon lock busy");
                Err(Attempt::Retry(e))
            }
            Err(e) => Err(Attempt::Abort(e)),
        }
    })
    .await;

    match result {
        Ok(lock) => {
            tracing::info!(path = %path.display(), "acquired daemon lock");
            Ok(lock)
        }
        Err(RetryError::Exhausted {
            last: LockError::Held { holder, .. },
            ..
        }) => Err(LifecycleError::AlreadyRunning { holder }),
        Err(RetryError::Exhausted { last, .. }) | Err(RetryError::Aborted(last)) => {
            Err(LifecycleError::Lock(last))
        }
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
