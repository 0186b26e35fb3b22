// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Decide whether a live pid is one of our session processes before it may
//! be signaled or adopted.

use hp_adapters::ProcessInspector;
use hp_storage::hash_process_command;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProcessType {
    Daemon,
    DaemonSpawnedSession,
    UserSession,
    Doctor,
    DevDaemon,
    DevDaemonSpawned,
    DevSession,
    DevDoctor,
    Unknown,
}

impl ProcessType {
    /// Types that may be signaled or adopted as sessions
    pub fn is_session(&self) -> bool {
        matches!(
            self,
            ProcessType::DaemonSpawnedSession
                | ProcessType::UserSession
                | ProcessType::DevDaemonSpawned
                | ProcessType::DevSession
        )
    }
}

const AGENT_SUBCOMMANDS: &[&str] = &["claude", "codex", "gemini"];

#[derive(Clone, Copy, PartialEq, Eq)]
enum Build {
    Release,
    Dev,
}

fn basename(token: &str) -> &str {
    token.rsplit('/').next().unwrap_or(token)
}

/// Which build a single argv token launches, if any.
fn entry_build(token: &str) -> Option<Build> {
    let name = basename(token);
    if name == "happy-dev" || token.ends_with("src/index.ts") {
        return Some(Build::Dev);
    }
    if name == "happy"
        || name == "happy-daemon"
        || token.contains("happy-coder")
        || token.ends_with("dist/index.mjs")
    {
        return Some(Build::Release);
    }
    None
}

/// Bucket a full command line. `None` means the process is not ours at all.
pub fn classify_happy_process(command_line: &str) -> Option<ProcessType> {
    let tokens: Vec<&str> = command_line.split_whitespace().collect();
    let (entry, build) = tokens
        .iter()
        .enumerate()
        .find_map(|(i, t)| entry_build(t).map(|b| (i, b)))?;
    let dev = build == Build::Dev;
    let args = &tokens[entry + 1..];

    if basename(tokens[entry]) == "happy-daemon" {
        return Some(ProcessType::Daemon);
    }

    let pick = |release, development| if dev { development } else { release };

    if args.first() == Some(&"daemon") && matches!(args.get(1), Some(&"start") | Some(&"start-sync"))
    {
        return Some(pick(ProcessType::Daemon, ProcessType::DevDaemon));
    }
    if args.first() == Some(&"doctor") {
        return Some(pick(ProcessType::Doctor, ProcessType::DevDoctor));
    }
    let daemon_spawned = args
        .windows(2)
        .any(|w| w[0] == "--started-by" && w[1] == "daemon");
    if daemon_spawned {
        return Some(pick(
            ProcessType::DaemonSpawnedSession,
            ProcessType::DevDaemonSpawned,
        ));
    }
    let interactive = match args.first() {
        None => true,
        Some(first) => AGENT_SUBCOMMANDS.contains(first) || first.starts_with('-'),
    };
    if interactive {
        return Some(pick(ProcessType::UserSession, ProcessType::DevSession));
    }
    Some(ProcessType::Unknown)
}

/// Re-resolve `pid` and check it is still an allow-listed session process.
///
/// With `expected_hash`, the live command line must hash identically; a
/// recycled pid running something else is refused.
pub fn is_pid_safe_happy_session_process<P>(
    inspector: &P,
    pid: u32,
    expected_hash: Option<&str>,
) -> bool
where
    P: ProcessInspector + ?Sized,
{
    let Some(command) = inspector.command_line(pid) else {
        tracing::debug!(pid, "no live process");
        return false;
    };
    let kind = classify_happy_process(&command);
    if !kind.is_some_and(|k| k.is_session()) {
        tracing::warn!(pid, kind = ?kind, "process is not a happy session");
        return false;
    }
    if let Some(expected) = expected_hash {
        if hash_process_command(&command) != expected {
            tracing::warn!(pid, "process command changed since it was recorded");
            return false;
        }
    }
    true
}

#[cfg(test)]
#[path = "safety_tests.rs"]
mod tests;
