// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic heartbeat: prune dead sessions, detect upgrades and takeovers.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use hp_adapters::subprocess::{run_with_timeout, VERSION_PROBE_TIMEOUT};
use hp_adapters::{ProcessInspector, SessionAdapter};
use hp_sync::ShutdownSource;
use tokio::time::{Instant, MissedTickBehavior};

use crate::daemon::Daemon;
use crate::spawn::remove_codex_home;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeartbeatOutcome {
    /// Previous tick still running
    Skipped,
    Healthy { pruned: usize },
    /// The installed CLI no longer matches the version seen at startup
    VersionChanged { installed: String },
    /// The state file no longer names this daemon
    Superseded { owner_pid: Option<u32> },
}

/// Clears the re-entrancy flag when a tick finishes, however it exits.
struct TickGuard<'a>(&'a std::sync::atomic::AtomicBool);

impl Drop for TickGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// First `x.y.z`-looking token of `--version` output.
pub fn parse_version_output(output: &str) -> Option<String> {
    output
        .split_whitespace()
        .map(|t| t.trim_start_matches('v'))
        .find(|t| {
            let mut parts = t.split('.');
            let numeric = |p: Option<&str>| {
                p.is_some_and(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
            };
            numeric(parts.next()) && numeric(parts.next()) && parts.next().is_some()
        })
        .map(str::to_string)
}

/// Ask the installed session program for its version.
pub async fn probe_installed_version(program: &str) -> Option<String> {
    let mut cmd = tokio::process::Command::new(program);
    cmd.arg("--version");
    match run_with_timeout(cmd, VERSION_PROBE_TIMEOUT, "version probe").await {
        Ok(output) if output.status.success() => {
            parse_version_output(&String::from_utf8_lossy(&output.stdout))
        }
        Ok(output) => {
            tracing::debug!(status = %output.status, "version probe failed");
            None
        }
        Err(e) => {
            tracing::debug!(error = %e, "version probe failed");
            None
        }
    }
}

impl<S, P> Daemon<S, P>
where
    S: SessionAdapter,
    P: ProcessInspector,
{
    /// One heartbeat. `installed_version` of `None` skips the upgrade check.
    ///
    /// Blocking: reads the process table and the state file.
    pub fn heartbeat_tick(&self, installed_version: Option<&str>) -> HeartbeatOutcome {
        if self
            .heartbeat_running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("heartbeat already running, skipping tick");
            return HeartbeatOutcome::Skipped;
        }
        let _guard = TickGuard(&self.heartbeat_running);

        let mut pruned = 0;
        for pid in self.registry.pids() {
            if !self.inspector.is_alive(pid) {
                tracing::info!(pid, "pruning exited session");
                if let Some(dir) = self.registry.remove(pid).and_then(|s| s.codex_home) {
                    remove_codex_home(&dir);
                }
                self.markers.remove(pid);
                pruned += 1;
            }
        }
        let expired = self.registry.expire_awaiters(Instant::now());
        if expired > 0 {
            tracing::debug!(expired, "dropped expired spawn awaiters");
        }

        if let Some(installed) = installed_version {
            if installed != self.config.version {
                tracing::info!(
                    installed,
                    running = %self.config.version,
                    "installed version changed"
                );
                return HeartbeatOutcome::VersionChanged {
                    installed: installed.to_string(),
                };
            }
        }

        let owner = self.state_file.read().map(|r| r.pid);
        if owner != Some(self.pid) {
            tracing::warn!(owner_pid = ?owner, "daemon state file no longer ours");
            return HeartbeatOutcome::Superseded { owner_pid: owner };
        }
        match self.state_file.touch_heartbeat(self.pid) {
            Ok(true) => {}
            Ok(false) => return HeartbeatOutcome::Superseded { owner_pid: None },
            Err(e) => tracing::warn!(error = %e, "failed to write heartbeat"),
        }
        HeartbeatOutcome::Healthy { pruned }
    }

    /// Act on a tick outcome. Returns true when the daemon is shutting down.
    pub fn handle_heartbeat_outcome(&self, outcome: &HeartbeatOutcome) -> bool {
        match outcome {
            HeartbeatOutcome::Skipped | HeartbeatOutcome::Healthy { .. } => false,
            HeartbeatOutcome::VersionChanged { installed } => {
                tracing::info!(installed, "handing over to the updated daemon");
                spawn_replacement_daemon();
                self.request_shutdown(ShutdownSource::Cli);
                true
            }
            HeartbeatOutcome::Superseded { .. } => {
                self.request_shutdown(ShutdownSource::Exception);
                true
            }
        }
    }
}

/// Start a fresh copy of this binary; it waits on the lock until we exit.
fn spawn_replacement_daemon() {
    let exe = match std::env::current_exe() {
        Ok(exe) => exe,
        Err(e) => {
            tracing::error!(error = %e, "cannot locate daemon executable");
            return;
        }
    };
    let spawned = std::process::Command::new(&exe)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn();
    match spawned {
        Ok(child) => tracing::info!(pid = child.id(), "spawned replacement daemon"),
        Err(e) => tracing::error!(error = %e, "failed to spawn replacement daemon"),
    }
}

/// Tick until the daemon shuts down.
pub async fn run_heartbeat<S, P>(daemon: Arc<Daemon<S, P>>)
where
    S: SessionAdapter,
    P: ProcessInspector,
{
    let cancel = daemon.shutdown_signal().token();
    let mut ticker = tokio::time::interval(daemon.config().heartbeat_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // First tick fires immediately
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let installed = probe_installed_version(daemon.config().session_program()).await;
                let ticking = Arc::clone(&daemon);
                let outcome = match tokio::task::spawn_blocking(move || {
                    ticking.heartbeat_tick(installed.as_deref())
                })
                .await
                {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        tracing::error!(error = %e, "heartbeat tick failed");
                        continue;
                    }
                };
                if daemon.handle_heartbeat_outcome(&outcome) {
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "heartbeat_tests.rs"]
mod tests;
