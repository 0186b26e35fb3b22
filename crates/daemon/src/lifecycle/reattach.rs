// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Adopt sessions left running by a previous daemon.

use hp_adapters::{ProcessInspector, SessionAdapter};

use crate::daemon::Daemon;
use crate::registry::TrackedSession;
use crate::safety::is_pid_safe_happy_session_process;

/// Counts from one reattachment pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReattachReport {
    pub adopted: usize,
    /// Passed every check but the pid was already tracked
    pub eligible_not_adopted: usize,
    /// Alive, but not a matching session process
    pub ineligible: usize,
    /// Marker removed because its pid is gone
    pub dead: usize,
}

impl<S, P> Daemon<S, P>
where
    S: SessionAdapter,
    P: ProcessInspector,
{
    /// Walk this installation's markers and adopt live, matching sessions.
    ///
    /// A pid is adopted iff its live command line classifies as a session
    /// and, when the marker stored a hash, hashes identically.
    pub fn reattach_sessions(&self) -> ReattachReport {
        let mut report = ReattachReport::default();
        for marker in self.markers.list() {
            let pid = marker.pid;
            if !self.inspector.is_alive(pid) {
                tracing::debug!(pid, "marker pid is gone");
                self.markers.remove(pid);
                report.dead += 1;
                continue;
            }
            let eligible = is_pid_safe_happy_session_process(
                self.inspector.as_ref(),
                pid,
                marker.process_command_hash.as_deref(),
            );
            if !eligible {
                report.ineligible += 1;
                continue;
            }
            if self.registry.contains(pid) {
                report.eligible_not_adopted += 1;
                continue;
            }
            tracing::info!(pid, session_id = %marker.session_id, "reattached session");
            self.registry.insert(TrackedSession::from_marker(&marker));
            report.adopted += 1;
        }
        tracing::info!(
            adopted = report.adopted,
            eligible_not_adopted = report.eligible_not_adopted,
            ineligible = report.ineligible,
            dead = report.dead,
            "session reattachment complete"
        );
        report
    }
}

#[cfg(test)]
#[path = "reattach_tests.rs"]
mod tests;
