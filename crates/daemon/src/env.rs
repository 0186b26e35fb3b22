// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;
use std::time::Duration;

use crate::lifecycle::LifecycleError;

/// Resolve the installation home: HAPPY_HOME_DIR > ~/.happy
pub fn happy_home_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("HAPPY_HOME_DIR") {
        if !dir.is_empty() {
            return Ok(expand_tilde(&dir));
        }
    }
    let home = dirs::home_dir().ok_or(LifecycleError::NoHomeDir)?;
    Ok(home.join(".happy"))
}

fn expand_tilde(dir: &str) -> PathBuf {
    match (dir.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(dir),
    }
}

fn duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// Heartbeat interval override
pub fn heartbeat_interval() -> Option<Duration> {
    duration_ms("HAPPY_DAEMON_HEARTBEAT_INTERVAL")
}

/// Fixed control server port; 0 or unset means ephemeral
pub fn http_port() -> Option<u16> {
    std::env::var("HAPPY_DAEMON_HTTP_PORT")
        .ok()
        .and_then(|s| s.parse().ok())
}

/// How long a spawn waits for the session's self-report
pub fn webhook_timeout() -> Option<Duration> {
    duration_ms("HAPPY_DAEMON_WEBHOOK_TIMEOUT_MS")
}

/// tmux session to spawn into, when set
pub fn tmux_session() -> Option<String> {
    std::env::var("HAPPY_DAEMON_TMUX_SESSION")
        .ok()
        .filter(|s| !s.is_empty())
}

/// Program (and leading args) used to start session processes
pub fn session_command() -> Option<Vec<String>> {
    let raw = std::env::var("HAPPY_SESSION_COMMAND").ok()?;
    let argv: Vec<String> = raw.split_whitespace().map(str::to_string).collect();
    (!argv.is_empty()).then_some(argv)
}

pub fn machine_keepalive_interval() -> Option<Duration> {
    duration_ms("HAPPY_MACHINE_KEEPALIVE_MS")
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
