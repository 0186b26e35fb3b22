// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrappers for consistent observability

use crate::session::{MultiplexerProcess, SessionAdapter, SessionError};
use async_trait::async_trait;
use std::path::Path;
use tracing::Instrument;

/// Wrapper that adds tracing to any SessionAdapter
#[derive(Clone)]
pub struct TracedSession<S> {
    inner: S,
}

impl<S> TracedSession<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<S: SessionAdapter> SessionAdapter for TracedSession<S> {
    async fn is_available(&self) -> bool {
        let available = self.inner.is_available().await;
        tracing::debug!(available, "multiplexer availability checked");
        available
    }

    async fn spawn(
        &self,
        session: &str,
        window: &str,
        cwd: &Path,
        argv: &[String],
        env: &[(String, String)],
    ) -> Result<MultiplexerProcess, SessionError> {
        async {
            tracing::info!(argc = argv.len(), env_count = env.len(), "starting");
            let start = std::time::Instant::now();
            let result = self.inner.spawn(session, window, cwd, argv, env).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(p) => tracing::info!(window_target = %p.target, pid = p.pid, elapsed_ms, "window created"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "spawn failed"),
            }
            result
        }
        .instrument(tracing::info_span!("multiplexer.spawn", session, window, cwd = %cwd.display()))
        .await
    }

    async fn kill(&self, target: &str) -> Result<(), SessionError> {
        let result = self.inner.kill(target).await;
        tracing::info_span!("multiplexer.kill", window_target = target).in_scope(|| match &result {
            Ok(()) => tracing::info!("killed"),
            Err(e) => tracing::warn!(error = %e, "kill failed (may be expected)"),
        });
        result
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
