// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stopping tracked sessions.

use hp_adapters::{ProcessInspector, SessionAdapter, SignalError};

use crate::daemon::Daemon;
use crate::registry::SessionPhase;
use crate::safety::is_pid_safe_happy_session_process;
use crate::spawn::remove_codex_home;

impl<S, P> Daemon<S, P>
where
    S: SessionAdapter,
    P: ProcessInspector,
{
    /// Terminate a session by session id or `PID-<n>`.
    ///
    /// Returns false without signaling when the session is unknown or the
    /// live process no longer looks like the one we tracked. Sessions spawned
    /// in tmux also lose their window.
    pub async fn stop_session(&self, id: &str) -> bool {
        let Some(session) = self.registry.find(id) else {
            tracing::info!(id, "stop requested for unknown session");
            return false;
        };
        let pid = session.pid;

        if !session.owned_child
            && !is_pid_safe_happy_session_process(
                self.inspector.as_ref(),
                pid,
                session.process_command_hash.as_deref(),
            )
        {
            tracing::warn!(pid, id, "refusing to signal pid that failed the safety check");
            return false;
        }

        let previous = session.phase;
        self.registry.update(pid, |s| s.phase = SessionPhase::Stopping);
        match self.inspector.terminate(pid) {
            Ok(()) => tracing::info!(pid, id, "sent SIGTERM to session"),
            Err(SignalError::NoSuchProcess(_)) => tracing::info!(pid, id, "session already exited"),
            Err(e) => {
                tracing::warn!(pid, id, error = %e, "failed to stop session");
                self.registry.update(pid, |s| s.phase = previous);
                return false;
            }
        }
        if let Some(target) = session.tmux_target.as_deref() {
            if let Err(e) = self.sessions.kill(target).await {
                tracing::warn!(pid, window_target = target, error = %e, "failed to kill tmux window");
            }
        }
        if let Some(dir) = self.registry.remove(pid).and_then(|s| s.codex_home) {
            remove_codex_home(&dir);
        }
        self.markers.remove(pid);
        true
    }
}

#[cfg(test)]
#[path = "stop_tests.rs"]
mod tests;
