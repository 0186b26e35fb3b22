// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Spawning session processes on request from the app or a local CLI.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use hp_adapters::{ProcessInspector, SessionAdapter, SessionError};
use hp_core::{expand_env_map, has_unexpanded_placeholder, Agent, SessionId, StartedBy};
use hp_storage::MarkerStore;
use nix::errno::Errno;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Instant;

use crate::daemon::Daemon;
use crate::registry::{DaemonRegistry, TrackedSession};

/// Authentication variables that must never reach a session unexpanded.
pub const KNOWN_AUTH_VARS: &[&str] = &[
    "ANTHROPIC_AUTH_TOKEN",
    "ANTHROPIC_API_KEY",
    "CLAUDE_CODE_OAUTH_TOKEN",
    "OPENAI_API_KEY",
    "GEMINI_API_KEY",
    "GOOGLE_API_KEY",
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpawnRequest {
    pub directory: PathBuf,
    #[serde(default)]
    pub approved_new_directory_creation: bool,
    #[serde(default)]
    pub agent: Agent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Profile variables chosen in the app; empty falls back to the local
    /// active profile
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environment_variables: BTreeMap<String, String>,
    /// Existing session to resume
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
}

impl SpawnRequest {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum SpawnOutcome {
    Success { session_id: SessionId },
    RequestToApproveDirectoryCreation { directory: PathBuf },
    Error { error_message: String },
}

#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("Unable to create directory '{}': {reason}", .directory.display())]
    DirectoryCreation { directory: PathBuf, reason: String },
    #[error("Environment variable {name} still contains an unexpanded placeholder; set it in the daemon's environment or the profile")]
    UnexpandedAuthVariable { name: String },
    #[error("failed to prepare agent credentials: {0}")]
    Credentials(#[source] io::Error),
    #[error("tmux spawn failed: {0}")]
    Tmux(#[from] SessionError),
    #[error("failed to start session process: {0}")]
    Process(#[source] io::Error),
    #[error("session process exited before reporting a pid")]
    NoPid,
    #[error("Session process {pid} did not report in within {}ms; it is still tracked", .timeout.as_millis())]
    WebhookTimeout { pid: u32, timeout: Duration },
}

/// Turn an OS error from directory creation into an actionable message.
pub fn classify_directory_error(directory: &Path, err: &io::Error) -> SpawnError {
    let errno = err.raw_os_error().map(Errno::from_raw);
    let reason = match errno {
        Some(Errno::EACCES) | Some(Errno::EPERM) => {
            "permission denied; check write access to the parent directory".to_string()
        }
        Some(Errno::ENOSPC) => "no space left on device; free up disk space".to_string(),
        Some(Errno::EROFS) => "the file system is read-only".to_string(),
        Some(Errno::ENOTDIR) => "a component of the path is a file, not a directory".to_string(),
        _ => format!("system error: {err}"),
    };
    SpawnError::DirectoryCreation {
        directory: directory.to_path_buf(),
        reason,
    }
}

/// Variables that carry the agent's credentials.
fn auth_environment(agent: Agent, token: &str, codex_home: Option<&Path>) -> BTreeMap<String, String> {
    let mut env = BTreeMap::new();
    match agent {
        Agent::Claude => {
            env.insert("CLAUDE_CODE_OAUTH_TOKEN".to_string(), token.to_string());
        }
        Agent::Codex => {
            if let Some(home) = codex_home {
                env.insert("CODEX_HOME".to_string(), home.display().to_string());
            }
        }
        Agent::Gemini => {
            env.insert("GEMINI_API_KEY".to_string(), token.to_string());
        }
    }
    env
}

/// Layer auth < profile < auth, expanding profile placeholders with `lookup`.
pub fn resolve_environment(
    auth: &BTreeMap<String, String>,
    profile: &BTreeMap<String, String>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<BTreeMap<String, String>, SpawnError> {
    let mut env = expand_env_map(profile, &lookup);
    env.extend(auth.iter().map(|(k, v)| (k.clone(), v.clone())));

    if let Some(name) = KNOWN_AUTH_VARS
        .iter()
        .find(|name| env.get(**name).is_some_and(|v| has_unexpanded_placeholder(v)))
    {
        return Err(SpawnError::UnexpandedAuthVariable {
            name: name.to_string(),
        });
    }
    Ok(env)
}

/// Fresh private `CODEX_HOME` path; nothing is created on disk yet.
fn codex_home_path(happy_home_dir: &Path) -> PathBuf {
    happy_home_dir
        .join("tmp")
        .join(format!("codex-home-{}", uuid::Uuid::new_v4()))
}

/// Write the token into `dir` as `auth.json`.
fn write_codex_home(dir: &Path, token: &str) -> io::Result<()> {
    std::fs::create_dir_all(dir)?;
    std::fs::write(dir.join("auth.json"), token)
}

/// Delete a private `CODEX_HOME` together with the token inside it.
pub(crate) fn remove_codex_home(dir: &Path) {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => tracing::debug!(dir = %dir.display(), "removed codex home"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(dir = %dir.display(), error = %e, "failed to remove codex home"),
    }
}

impl<S, P> Daemon<S, P>
where
    S: SessionAdapter,
    P: ProcessInspector,
{
    /// Spawn a session and wait for it to report its session id.
    pub async fn spawn_session(&self, request: &SpawnRequest) -> SpawnOutcome {
        match self.try_spawn_session(request).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(directory = %request.directory.display(), error = %e, "spawn failed");
                SpawnOutcome::Error {
                    error_message: e.to_string(),
                }
            }
        }
    }

    async fn try_spawn_session(&self, request: &SpawnRequest) -> Result<SpawnOutcome, SpawnError> {
        let directory = &request.directory;
        let exists = tokio::fs::metadata(directory).await.is_ok();
        if !exists {
            if !request.approved_new_directory_creation {
                return Ok(SpawnOutcome::RequestToApproveDirectoryCreation {
                    directory: directory.clone(),
                });
            }
            tokio::fs::create_dir_all(directory)
                .await
                .map_err(|e| classify_directory_error(directory, &e))?;
            tracing::info!(directory = %directory.display(), "created session directory");
        }

        let codex_home = match (request.agent, request.token.as_deref()) {
            (Agent::Codex, Some(_)) => Some(codex_home_path(&self.config.happy_home_dir)),
            _ => None,
        };
        let auth = match request.token.as_deref() {
            Some(token) => auth_environment(request.agent, token, codex_home.as_deref()),
            None => BTreeMap::new(),
        };
        let profile = if request.environment_variables.is_empty() {
            self.settings
                .read()
                .active_profile()
                .map(|p| p.environment_variables.clone())
                .unwrap_or_default()
        } else {
            request.environment_variables.clone()
        };
        let env = resolve_environment(&auth, &profile, |name| std::env::var(name).ok())?;

        if let (Some(dir), Some(token)) = (codex_home.as_deref(), request.token.as_deref()) {
            if let Err(e) = write_codex_home(dir, token) {
                remove_codex_home(dir);
                return Err(SpawnError::Credentials(e));
            }
        }

        let argv = self.session_argv(request);
        let mut tmux_session = self.config.tmux_session.as_deref();
        if tmux_session.is_some() && !self.sessions.is_available().await {
            tracing::info!("tmux unavailable, spawning session directly");
            tmux_session = None;
        }
        let spawned = match tmux_session {
            Some(tmux) => {
                self.spawn_in_tmux(tmux, request, &argv, &env, codex_home.as_deref())
                    .await
            }
            None => self.spawn_direct(directory, &argv, &env, codex_home.as_deref()),
        };
        let pid = match spawned {
            Ok(pid) => pid,
            Err(e) => {
                if let Some(dir) = codex_home.as_deref() {
                    remove_codex_home(dir);
                }
                return Err(e);
            }
        };

        // A self-report that raced the spawn has already set the session id
        let deadline = Instant::now() + self.config.webhook_timeout;
        let (awaiter, reply) = self.registry.register_awaiter(pid, deadline);
        if let Some(session_id) = self.registry.get(pid).and_then(|s| s.session_id) {
            self.registry.cancel_awaiter(awaiter);
            return Ok(SpawnOutcome::Success { session_id });
        }

        match tokio::time::timeout(self.config.webhook_timeout, reply).await {
            Ok(Ok(session)) => match session.session_id {
                Some(session_id) => {
                    tracing::info!(pid, session_id = %session_id, "session reported in");
                    Ok(SpawnOutcome::Success { session_id })
                }
                None => Err(SpawnError::WebhookTimeout {
                    pid,
                    timeout: self.config.webhook_timeout,
                }),
            },
            Ok(Err(_)) | Err(_) => {
                self.registry.cancel_awaiter(awaiter);
                self.registry.update(pid, |s| {
                    s.error = Some("session did not report in".to_string());
                });
                Err(SpawnError::WebhookTimeout {
                    pid,
                    timeout: self.config.webhook_timeout,
                })
            }
        }
    }

    fn session_argv(&self, request: &SpawnRequest) -> Vec<String> {
        let mut argv = self.config.session_command.clone();
        argv.extend(
            [
                request.agent.subcommand(),
                "--happy-starting-mode",
                "remote",
                "--started-by",
                StartedBy::Daemon.as_flag(),
            ]
            .map(str::to_string),
        );
        if let Some(session_id) = &request.session_id {
            argv.push("--resume".to_string());
            argv.push(session_id.to_string());
        }
        argv
    }

    async fn spawn_in_tmux(
        &self,
        tmux: &str,
        request: &SpawnRequest,
        argv: &[String],
        env: &BTreeMap<String, String>,
        codex_home: Option<&Path>,
    ) -> Result<u32, SpawnError> {
        let window = format!(
            "{}-{}",
            request.agent,
            chrono::Utc::now().timestamp_millis()
        );
        let env: Vec<(String, String)> = env.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        let process = self
            .sessions
            .spawn(tmux, &window, &request.directory, argv, &env)
            .await?;
        tracing::info!(pid = process.pid, window_target = %process.target, "spawned session in tmux");
        let mut session = TrackedSession::spawned(process.pid, Some(process.target), false);
        session.codex_home = codex_home.map(Path::to_path_buf);
        self.track_spawned(session);
        Ok(process.pid)
    }

    fn track_spawned(&self, session: TrackedSession) {
        let pid = session.pid;
        if self.registry.track_spawned(session) {
            tracing::info!(pid, "session reported in before its spawn returned");
        }
    }

    fn spawn_direct(
        &self,
        directory: &Path,
        argv: &[String],
        env: &BTreeMap<String, String>,
        codex_home: Option<&Path>,
    ) -> Result<u32, SpawnError> {
        let (program, args) = argv.split_first().ok_or(SpawnError::NoPid)?;
        let mut child = tokio::process::Command::new(program)
            .args(args)
            .current_dir(directory)
            .envs(env)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(SpawnError::Process)?;
        let pid = child.id().ok_or(SpawnError::NoPid)?;
        tracing::info!(pid, program = %program, "spawned session process");
        let mut session = TrackedSession::spawned(pid, None, true);
        session.codex_home = codex_home.map(Path::to_path_buf);
        self.track_spawned(session);

        let registry = Arc::clone(&self.registry);
        let markers = self.markers.clone();
        tokio::spawn(async move {
            let status = child.wait().await;
            reap(&registry, &markers, pid);
            match status {
                Ok(status) => tracing::info!(pid, %status, "session process exited"),
                Err(e) => tracing::warn!(pid, error = %e, "failed to wait for session process"),
            }
        });
        Ok(pid)
    }
}

/// Forget an exited direct child. A session already stopped or pruned has
/// released its codex home.
fn reap(registry: &DaemonRegistry, markers: &MarkerStore, pid: u32) {
    if let Some(dir) = registry.remove(pid).and_then(|s| s.codex_home) {
        remove_codex_home(&dir);
    }
    markers.remove(pid);
}

#[cfg(test)]
#[path = "spawn_tests.rs"]
mod tests;
