// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `daemon.state.json`: how clients find the running daemon.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::atomic::write_json_atomic;

#[derive(Debug, Error)]
pub enum StateFileError {
    #[error("daemon state IO error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaemonStateRecord {
    pub pid: u32,
    pub http_port: u16,
    /// Human-readable start time
    pub start_time: String,
    pub started_with_cli_version: String,
    /// Epoch ms of the last successful heartbeat
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_heartbeat: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daemon_log_path: Option<PathBuf>,
}

impl DaemonStateRecord {
    pub fn new(pid: u32, http_port: u16, cli_version: impl Into<String>) -> Self {
        Self {
            pid,
            http_port,
            start_time: chrono::Local::now().to_rfc3339(),
            started_with_cli_version: cli_version.into(),
            last_heartbeat: None,
            daemon_log_path: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DaemonStateFile {
    path: PathBuf,
}

impl DaemonStateFile {
    pub fn new(happy_home_dir: &Path) -> Self {
        Self {
            path: happy_home_dir.join("daemon.state.json"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing and corrupt files both read as no daemon.
    pub fn read(&self) -> Option<DaemonStateRecord> {
        let raw = fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&raw) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "corrupt daemon state file");
                None
            }
        }
    }

    pub fn write(&self, record: &DaemonStateRecord) -> Result<(), StateFileError> {
        write_json_atomic(&self.path, record)?;
        Ok(())
    }

    /// Stamp `last_heartbeat` if the file still belongs to `pid`.
    ///
    /// Returns false when another daemon owns the file or it is gone.
    pub fn touch_heartbeat(&self, pid: u32) -> Result<bool, StateFileError> {
        let Some(mut record) = self.read() else {
            return Ok(false);
        };
        if record.pid != pid {
            return Ok(false);
        }
        record.last_heartbeat = Some(chrono::Utc::now().timestamp_millis());
        self.write(&record)?;
        Ok(true)
    }

    /// Delete the file only if it was written by `pid`.
    pub fn clear_if_owned(&self, pid: u32) -> Result<bool, StateFileError> {
        match self.read() {
            Some(record) if record.pid == pid => {}
            _ => return Ok(false),
        }
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[path = "daemon_state_tests.rs"]
mod tests;
