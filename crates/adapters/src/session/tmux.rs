// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tmux session adapter

use super::{MultiplexerProcess, SessionAdapter, SessionError};
use crate::subprocess::{run_with_timeout, shell_join};
use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;

/// Tmux-based session adapter
#[derive(Clone, Default)]
pub struct TmuxAdapter;

impl TmuxAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SessionAdapter for TmuxAdapter {
    async fn is_available(&self) -> bool {
        let mut cmd = Command::new("tmux");
        cmd.arg("-V");
        run_with_timeout(cmd, crate::env::tmux_timeout(), "tmux -V")
            .await
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    async fn spawn(
        &self,
        session: &str,
        window: &str,
        cwd: &Path,
        argv: &[String],
        env: &[(String, String)],
    ) -> Result<MultiplexerProcess, SessionError> {
        // Precondition: cwd must exist
        if !cwd.exists() {
            return Err(SessionError::SpawnFailed(format!(
                "working directory does not exist: {}",
                cwd.display()
            )));
        }
        if argv.is_empty() {
            return Err(SessionError::SpawnFailed("empty command".to_string()));
        }

        ensure_session(session).await?;

        // -P -F prints the new pane's pid, so no second lookup is needed
        let mut tmux_cmd = Command::new("tmux");
        tmux_cmd
            .arg("new-window")
            .arg("-d")
            .arg("-P")
            .arg("-F")
            .arg("#{pane_pid}")
            .arg("-t")
            .arg(session)
            .arg("-n")
            .arg(window)
            .arg("-c")
            .arg(cwd);

        for (key, value) in env {
            tmux_cmd.arg("-e").arg(format!("{}={}", key, value));
        }

        tmux_cmd.arg(shell_join(argv));

        let output = run_with_timeout(tmux_cmd, crate::env::tmux_timeout(), "tmux new-window")
            .await
            .map_err(SessionError::SpawnFailed)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::error!(session, window, stderr = %stderr, "tmux spawn failed");
            return Err(SessionError::SpawnFailed(stderr.to_string()));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let pid = parse_pane_pid(&stdout).ok_or_else(|| {
            SessionError::SpawnFailed(format!("tmux did not report a pane pid: {:?}", stdout))
        })?;

        Ok(MultiplexerProcess {
            target: format!("{}:{}", session, window),
            pid,
        })
    }

    async fn kill(&self, target: &str) -> Result<(), SessionError> {
        let mut cmd = Command::new("tmux");
        cmd.args(["kill-window", "-t", target]);
        let output = run_with_timeout(cmd, crate::env::tmux_timeout(), "tmux kill-window")
            .await
            .map_err(SessionError::CommandFailed)?;
        if !output.status.success() {
            // A window that is already gone is the state we wanted
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::debug!(window_target = target, stderr = %stderr.trim(), "tmux window already gone");
        }
        Ok(())
    }
}

/// Create a detached session if it doesn't exist yet.
async fn ensure_session(session: &str) -> Result<(), SessionError> {
    let mut has = Command::new("tmux");
    has.args(["has-session", "-t", session]);
    let exists = run_with_timeout(has, crate::env::tmux_timeout(), "tmux has-session")
        .await
        .map(|o| o.status.success())
        .unwrap_or(false);
    if exists {
        return Ok(());
    }

    let mut create = Command::new("tmux");
    create.args(["new-session", "-d", "-s", session]);
    let output = run_with_timeout(create, crate::env::tmux_timeout(), "tmux new-session")
        .await
        .map_err(SessionError::SpawnFailed)?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(SessionError::SpawnFailed(format!(
            "could not create tmux session {}: {}",
            session, stderr
        )));
    }
    Ok(())
}

fn parse_pane_pid(stdout: &str) -> Option<u32> {
    stdout.lines().next()?.trim().parse().ok()
}

#[cfg(test)]
#[path = "tmux_tests.rs"]
mod tests;
