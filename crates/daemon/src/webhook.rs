// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session self-reports ("I have started as session S").

use std::path::Path;

use hp_adapters::{ProcessInspector, SessionAdapter};
use hp_core::{SessionId, StartedBy};
use hp_storage::{hash_process_command, MarkerWrite};
use serde_json::Value;

use crate::daemon::Daemon;
use crate::registry::{SessionPhase, TrackedSession};

impl<S, P> Daemon<S, P>
where
    S: SessionAdapter,
    P: ProcessInspector,
{
    /// Record a session's self-report and refresh its marker.
    ///
    /// Reports from another installation (different `happyHomeDir`) or
    /// without a `hostPid` are ignored and yield `None`.
    pub fn on_session_webhook(
        &self,
        session_id: SessionId,
        metadata: Value,
    ) -> Option<TrackedSession> {
        let Some(pid) = metadata
            .get("hostPid")
            .and_then(Value::as_u64)
            .and_then(|p| u32::try_from(p).ok())
        else {
            tracing::warn!(session_id = %session_id, "session report without hostPid");
            return None;
        };
        let home = metadata.get("happyHomeDir").and_then(Value::as_str);
        if home.map(Path::new) != Some(self.config.happy_home_dir.as_path()) {
            tracing::warn!(
                pid,
                session_id = %session_id,
                reported_home = ?home,
                "ignoring session report from another installation"
            );
            return None;
        }

        let started_by = metadata
            .get("startedBy")
            .and_then(Value::as_str)
            .map(StartedBy::from_flag)
            .unwrap_or(StartedBy::External);
        let command_hash = self
            .inspector
            .command_line(pid)
            .map(|c| hash_process_command(&c));

        let session = match self.registry.update(pid, |s| {
            s.session_id = Some(session_id.clone());
            s.metadata = Some(metadata.clone());
            s.phase = SessionPhase::Running;
            s.error = None;
            if command_hash.is_some() {
                s.process_command_hash = command_hash.clone();
            }
        }) {
            Some(session) => {
                tracing::info!(pid, session_id = %session_id, "tracked session reported in");
                session
            }
            None => {
                tracing::info!(pid, session_id = %session_id, %started_by, "untracked session reported in");
                let mut session = TrackedSession::external(pid, session_id.clone());
                session.started_by = started_by;
                session.metadata = Some(metadata.clone());
                session.process_command_hash = command_hash.clone();
                self.registry.insert(session.clone());
                session
            }
        };

        self.registry.complete_awaiters_for_pid(pid, &session);

        let marker = MarkerWrite {
            pid,
            session_id,
            started_by: Some(session.started_by),
            metadata: Some(metadata),
            process_command_hash: session.process_command_hash.clone(),
        };
        if let Err(e) = self.markers.write(marker) {
            tracing::warn!(pid, error = %e, "failed to write session marker");
        }
        Some(session)
    }
}

#[cfg(test)]
#[path = "webhook_tests.rs"]
mod tests;
