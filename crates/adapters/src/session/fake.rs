// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake multiplexer adapter for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{MultiplexerProcess, SessionAdapter, SessionError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Recorded multiplexer call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCall {
    Spawn {
        session: String,
        window: String,
        cwd: PathBuf,
        argv: Vec<String>,
        env: Vec<(String, String)>,
    },
    Kill {
        target: String,
    },
}

struct FakeState {
    available: bool,
    calls: Vec<SessionCall>,
    next_pid: u32,
    fail_spawn: Option<String>,
}

/// Fake multiplexer that hands out sequential pids
#[derive(Clone)]
pub struct FakeSessionAdapter {
    inner: Arc<Mutex<FakeState>>,
}

impl Default for FakeSessionAdapter {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeState {
                available: true,
                calls: Vec::new(),
                next_pid: 50_000,
                fail_spawn: None,
            })),
        }
    }
}

impl FakeSessionAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<SessionCall> {
        self.inner.lock().calls.clone()
    }

    pub fn set_available(&self, available: bool) {
        self.inner.lock().available = available;
    }

    /// Make the next spawns fail with the given message
    pub fn fail_spawn(&self, message: &str) {
        self.inner.lock().fail_spawn = Some(message.to_string());
    }

    /// Pid the next spawn will report
    pub fn set_next_pid(&self, pid: u32) {
        self.inner.lock().next_pid = pid;
    }
}

#[async_trait]
impl SessionAdapter for FakeSessionAdapter {
    async fn is_available(&self) -> bool {
        self.inner.lock().available
    }

    async fn spawn(
        &self,
        session: &str,
        window: &str,
        cwd: &Path,
        argv: &[String],
        env: &[(String, String)],
    ) -> Result<MultiplexerProcess, SessionError> {
        let mut inner = self.inner.lock();
        inner.calls.push(SessionCall::Spawn {
            session: session.to_string(),
            window: window.to_string(),
            cwd: cwd.to_path_buf(),
            argv: argv.to_vec(),
            env: env.to_vec(),
        });
        if let Some(message) = inner.fail_spawn.clone() {
            return Err(SessionError::SpawnFailed(message));
        }
        let pid = inner.next_pid;
        inner.next_pid += 1;
        Ok(MultiplexerProcess {
            target: format!("{}:{}", session, window),
            pid,
        })
    }

    async fn kill(&self, target: &str) -> Result<(), SessionError> {
        let mut inner = self.inner.lock();
        inner.calls.push(SessionCall::Kill {
            target: target.to_string(),
        });
        Ok(())
    }
}
