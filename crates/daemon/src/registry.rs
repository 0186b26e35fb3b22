// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory registry of tracked session processes and pending spawn awaiters.
//!
//! Owned by one daemon instance. Awaiters are keyed by a correlation id
//! rather than by pid, so a recycled pid can never resolve a stale spawn.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use hp_core::{SessionId, StartedBy};
use hp_storage::SessionMarker;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::oneshot;
use tokio::time::Instant;

/// Where a tracked session is in its lifecycle. Removal from the registry
/// is the terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionPhase {
    /// Spawned by us, waiting for the process to report its session id
    AwaitingWebhook,
    Running,
    Stopping,
    /// Adopted from an on-disk marker at startup
    Reattached,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackedSession {
    pub pid: u32,
    pub started_by: StartedBy,
    pub session_id: Option<SessionId>,
    pub process_command_hash: Option<String>,
    /// tmux window target when spawned inside tmux; killed on stop
    pub tmux_target: Option<String>,
    /// Private `CODEX_HOME` holding the agent token, removed with the session
    pub codex_home: Option<PathBuf>,
    /// The daemon holds the un-reaped child handle, so the pid cannot have
    /// been recycled
    pub owned_child: bool,
    pub reattached: bool,
    pub phase: SessionPhase,
    pub metadata: Option<Value>,
    pub error: Option<String>,
    pub message: Option<String>,
}

impl TrackedSession {
    /// Fresh daemon-spawned process, not yet reported in.
    pub fn spawned(pid: u32, tmux_target: Option<String>, owned_child: bool) -> Self {
        Self {
            pid,
            started_by: StartedBy::Daemon,
            session_id: None,
            process_command_hash: None,
            tmux_target,
            codex_home: None,
            owned_child,
            reattached: false,
            phase: SessionPhase::AwaitingWebhook,
            metadata: None,
            error: None,
            message: None,
        }
    }

    /// A process that reported in without us having spawned it.
    pub fn external(pid: u32, session_id: SessionId) -> Self {
        Self {
            started_by: StartedBy::External,
            session_id: Some(session_id),
            phase: SessionPhase::Running,
            ..Self::spawned(pid, None, false)
        }
    }

    pub fn from_marker(marker: &SessionMarker) -> Self {
        Self {
            pid: marker.pid,
            started_by: marker.started_by.unwrap_or(StartedBy::External),
            session_id: Some(marker.session_id.clone()),
            process_command_hash: marker.process_command_hash.clone(),
            tmux_target: None,
            codex_home: None,
            owned_child: false,
            reattached: true,
            phase: SessionPhase::Reattached,
            metadata: marker.metadata.clone(),
            error: None,
            message: None,
        }
    }

    pub fn summary(&self) -> ChildSummary {
        ChildSummary {
            started_by: self.started_by,
            happy_session_id: self.session_id.clone(),
            pid: self.pid,
        }
    }
}

/// Entry of the control server's `/list` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildSummary {
    pub started_by: StartedBy,
    pub happy_session_id: Option<SessionId>,
    pub pid: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AwaiterId(u64);

impl fmt::Display for AwaiterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "awaiter-{}", self.0)
    }
}

struct Awaiter {
    pid: u32,
    deadline: Instant,
    reply: oneshot::Sender<TrackedSession>,
}

#[derive(Default)]
struct RegistryInner {
    sessions: BTreeMap<u32, TrackedSession>,
    awaiters: HashMap<AwaiterId, Awaiter>,
}

#[derive(Default)]
pub struct DaemonRegistry {
    inner: Mutex<RegistryInner>,
    next_awaiter: AtomicU64,
}

impl DaemonRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the session tracked at `session.pid`.
    pub fn insert(&self, session: TrackedSession) {
        self.inner.lock().sessions.insert(session.pid, session);
    }

    /// Track a freshly spawned process. An entry created by a self-report
    /// that raced ahead of the spawn keeps its session id and phase; only the
    /// spawn-side fields are merged in. Returns true in that case.
    pub fn track_spawned(&self, spawned: TrackedSession) -> bool {
        match self.inner.lock().sessions.entry(spawned.pid) {
            Entry::Occupied(mut entry) => {
                let session = entry.get_mut();
                session.started_by = StartedBy::Daemon;
                session.tmux_target = spawned.tmux_target;
                session.codex_home = spawned.codex_home;
                session.owned_child = spawned.owned_child;
                true
            }
            Entry::Vacant(entry) => {
                entry.insert(spawned);
                false
            }
        }
    }

    pub fn get(&self, pid: u32) -> Option<TrackedSession> {
        self.inner.lock().sessions.get(&pid).cloned()
    }

    pub fn contains(&self, pid: u32) -> bool {
        self.inner.lock().sessions.contains_key(&pid)
    }

    /// Mutate a tracked session in place; returns the updated copy.
    pub fn update(
        &self,
        pid: u32,
        f: impl FnOnce(&mut TrackedSession),
    ) -> Option<TrackedSession> {
        let mut inner = self.inner.lock();
        let session = inner.sessions.get_mut(&pid)?;
        f(session);
        Some(session.clone())
    }

    pub fn remove(&self, pid: u32) -> Option<TrackedSession> {
        self.inner.lock().sessions.remove(&pid)
    }

    /// Look up by session id, falling back to the `PID-<n>` form used for
    /// sessions that have not reported an id yet.
    pub fn find(&self, id: &str) -> Option<TrackedSession> {
        let inner = self.inner.lock();
        let by_session = inner
            .sessions
            .values()
            .find(|s| s.session_id.as_ref().is_some_and(|sid| sid == id));
        if let Some(session) = by_session {
            return Some(session.clone());
        }
        let pid: u32 = id.strip_prefix("PID-")?.parse().ok()?;
        inner.sessions.get(&pid).cloned()
    }

    pub fn list(&self) -> Vec<TrackedSession> {
        self.inner.lock().sessions.values().cloned().collect()
    }

    pub fn pids(&self) -> Vec<u32> {
        self.inner.lock().sessions.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Register interest in the self-report of `pid`.
    pub fn register_awaiter(
        &self,
        pid: u32,
        deadline: Instant,
    ) -> (AwaiterId, oneshot::Receiver<TrackedSession>) {
        let id = AwaiterId(self.next_awaiter.fetch_add(1, Ordering::Relaxed));
        let (reply, rx) = oneshot::channel();
        self.inner.lock().awaiters.insert(
            id,
            Awaiter {
                pid,
                deadline,
                reply,
            },
        );
        (id, rx)
    }

    /// Resolve every awaiter waiting on `pid`. Returns how many were woken.
    pub fn complete_awaiters_for_pid(&self, pid: u32, session: &TrackedSession) -> usize {
        let ready: Vec<Awaiter> = {
            let mut inner = self.inner.lock();
            let ids: Vec<AwaiterId> = inner
                .awaiters
                .iter()
                .filter(|(_, a)| a.pid == pid)
                .map(|(id, _)| *id)
                .collect();
            ids.iter()
                .filter_map(|id| inner.awaiters.remove(id))
                .collect()
        };
        let mut woken = 0;
        for awaiter in ready {
            if awaiter.reply.send(session.clone()).is_ok() {
                woken += 1;
            }
        }
        woken
    }

    pub fn cancel_awaiter(&self, id: AwaiterId) -> bool {
        self.inner.lock().awaiters.remove(&id).is_some()
    }

    /// Drop awaiters past their deadline; their receivers see a closed channel.
    pub fn expire_awaiters(&self, now: Instant) -> usize {
        let mut inner = self.inner.lock();
        let before = inner.awaiters.len();
        inner.awaiters.retain(|_, a| a.deadline > now);
        before - inner.awaiters.len()
    }

    pub fn awaiter_count(&self) -> usize {
        self.inner.lock().awaiters.len()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
