// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::env;
use crate::lifecycle::LifecycleError;

pub const DAEMON_VERSION: &str = env!("CARGO_PKG_VERSION");

const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(60);
const DEFAULT_WEBHOOK_TIMEOUT: Duration = Duration::from_secs(15);
const DEFAULT_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(20);
const DEFAULT_SESSION_PROGRAM: &str = "happy";

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Installation home (e.g. ~/.happy)
    pub happy_home_dir: PathBuf,
    pub log_path: PathBuf,
    pub state_path: PathBuf,
    pub lock_path: PathBuf,
    pub heartbeat_interval: Duration,
    /// 0 binds an ephemeral port
    pub http_port: u16,
    pub webhook_timeout: Duration,
    pub keepalive_interval: Duration,
    /// Spawn sessions into this tmux session when tmux is available
    pub tmux_session: Option<String>,
    /// Program plus leading args for session processes
    pub session_command: Vec<String>,
    /// Installed CLI version at startup; defaults to the daemon build version
    pub version: String,
}

impl DaemonConfig {
    /// Defaults rooted at `happy_home_dir`, ignoring the environment.
    pub fn for_home(happy_home_dir: &Path) -> Self {
        Self {
            log_path: happy_home_dir.join("logs").join("daemon.log"),
            state_path: happy_home_dir.join("daemon.state.json"),
            lock_path: happy_home_dir.join("daemon.state.json.lock"),
            happy_home_dir: happy_home_dir.to_path_buf(),
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            http_port: 0,
            webhook_timeout: DEFAULT_WEBHOOK_TIMEOUT,
            keepalive_interval: DEFAULT_KEEPALIVE_INTERVAL,
            tmux_session: None,
            session_command: vec![DEFAULT_SESSION_PROGRAM.to_string()],
            version: DAEMON_VERSION.to_string(),
        }
    }

    /// Load configuration from the process environment.
    pub fn load() -> Result<Self, LifecycleError> {
        let mut config = Self::for_home(&env::happy_home_dir()?);
        if let Some(interval) = env::heartbeat_interval() {
            config.heartbeat_interval = interval;
        }
        if let Some(port) = env::http_port() {
            config.http_port = port;
        }
        if let Some(timeout) = env::webhook_timeout() {
            config.webhook_timeout = timeout;
        }
        if let Some(interval) = env::machine_keepalive_interval() {
            config.keepalive_interval = interval;
        }
        config.tmux_session = env::tmux_session();
        if let Some(argv) = env::session_command() {
            config.session_command = argv;
        }
        Ok(config)
    }

    pub fn session_program(&self) -> &str {
        self.session_command
            .first()
            .map(String::as_str)
            .unwrap_or(DEFAULT_SESSION_PROGRAM)
    }
}
