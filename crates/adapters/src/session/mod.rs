// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Terminal multiplexer adapters

mod tmux;

pub use tmux::TmuxAdapter;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeSessionAdapter, SessionCall};

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// Errors from multiplexer operations
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session not found: {0}")]
    NotFound(String),
    #[error("spawn failed: {0}")]
    SpawnFailed(String),
    #[error("command failed: {0}")]
    CommandFailed(String),
}

/// A process started inside the multiplexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiplexerProcess {
    /// Multiplexer target, e.g. `happy:claude-1700000000`
    pub target: String,
    /// Real OS pid of the pane's process
    pub pid: u32,
}

/// Adapter for spawning session processes inside a terminal multiplexer.
#[async_trait]
pub trait SessionAdapter: Clone + Send + Sync + 'static {
    /// Whether the multiplexer binary is usable on this machine
    async fn is_available(&self) -> bool;

    /// Start `argv` in a new window of `session` (created if missing)
    async fn spawn(
        &self,
        session: &str,
        window: &str,
        cwd: &Path,
        argv: &[String],
        env: &[(String, String)],
    ) -> Result<MultiplexerProcess, SessionError>;

    /// Kill a window target. A target that no longer exists is not an error.
    async fn kill(&self, target: &str) -> Result<(), SessionError>;
}
