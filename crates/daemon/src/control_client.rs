// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client side of the loopback control server, used by local CLIs and by
//! session processes reporting in.

use std::time::Duration;

use hp_adapters::ProcessInspector;
use hp_core::SessionId;
use hp_storage::{DaemonStateFile, DaemonStateRecord};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::control_server::{ListResponse, SessionStartedBody, StopSessionBody};
use crate::registry::ChildSummary;
use crate::spawn::SpawnRequest;

/// Default request timeout; covers a spawn waiting out the session report
pub const CONTROL_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ControlError {
    #[error("control request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected control response: {0}")]
    UnexpectedResponse(String),
}

#[derive(Debug, Clone)]
pub struct ControlClient {
    base: String,
    http: reqwest::Client,
}

impl ControlClient {
    pub fn new(port: u16) -> Result<Self, ControlError> {
        Self::with_timeout(port, CONTROL_TIMEOUT)
    }

    pub fn with_timeout(port: u16, timeout: Duration) -> Result<Self, ControlError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base: format!("http://127.0.0.1:{port}"),
            http,
        })
    }

    /// Client for the daemon named in the state file, if it is alive.
    pub fn for_running_daemon<P: ProcessInspector + ?Sized>(
        state_file: &DaemonStateFile,
        inspector: &P,
    ) -> Option<Self> {
        let record = running_daemon(state_file, inspector)?;
        match Self::new(record.http_port) {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!(error = %e, "failed to build control client");
                None
            }
        }
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(StatusCode, Value), ControlError> {
        let response = self
            .http
            .post(format!("{}{path}", self.base))
            .json(body)
            .send()
            .await?;
        let status = response.status();
        let value = response.json::<Value>().await?;
        Ok((status, value))
    }

    async fn post_ok<B, T>(&self, path: &str, body: &B) -> Result<T, ControlError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let (status, value) = self.post(path, body).await?;
        if !status.is_success() {
            return Err(ControlError::UnexpectedResponse(format!(
                "{path} returned {status}: {value}"
            )));
        }
        serde_json::from_value(value)
            .map_err(|e| ControlError::UnexpectedResponse(format!("{path}: {e}")))
    }

    /// Report a session that has started (sent by the session process).
    pub async fn notify_session_started(
        &self,
        session_id: SessionId,
        metadata: Value,
    ) -> Result<(), ControlError> {
        let body = SessionStartedBody {
            session_id,
            metadata,
        };
        let _: Value = self.post_ok("/session-started", &body).await?;
        Ok(())
    }

    pub async fn list_sessions(&self) -> Result<Vec<ChildSummary>, ControlError> {
        let response: ListResponse = self.post_ok("/list", &json!({})).await?;
        Ok(response.children)
    }

    /// Stop a session by session id or `PID-<n>`.
    pub async fn stop_session(&self, session_id: &str) -> Result<bool, ControlError> {
        let body = StopSessionBody {
            session_id: session_id.to_string(),
        };
        let value: Value = self.post_ok("/stop-session", &body).await?;
        Ok(value.get("success").and_then(Value::as_bool).unwrap_or(false))
    }

    /// Status code and body are both meaningful here: 409 asks for approval.
    pub async fn spawn_session(
        &self,
        request: &SpawnRequest,
    ) -> Result<(StatusCode, Value), ControlError> {
        self.post("/spawn-session", request).await
    }

    pub async fn stop_daemon(&self) -> Result<(), ControlError> {
        let _: Value = self.post_ok("/stop", &json!({})).await?;
        Ok(())
    }
}

/// The state record of a daemon whose pid is still alive.
pub fn running_daemon<P: ProcessInspector + ?Sized>(
    state_file: &DaemonStateFile,
    inspector: &P,
) -> Option<DaemonStateRecord> {
    let record = state_file.read()?;
    if inspector.is_alive(record.pid) {
        Some(record)
    } else {
        tracing::debug!(pid = record.pid, "state file names a dead daemon");
        None
    }
}

pub fn is_daemon_running<P: ProcessInspector + ?Sized>(
    state_file: &DaemonStateFile,
    inspector: &P,
) -> bool {
    running_daemon(state_file, inspector).is_some()
}

#[cfg(test)]
#[path = "control_tests.rs"]
mod tests;
