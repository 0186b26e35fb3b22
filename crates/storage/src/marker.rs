// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable "this pid is our session S" records.
//!
//! One JSON file per pid under `<happy_home>/tmp/daemon-sessions/`. They let a
//! restarted daemon find sessions it (or a previous daemon) was tracking.
//! A marker is only meaningful to the installation whose home dir wrote it.

use chrono::Utc;
use hp_core::{SessionId, StartedBy};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::atomic::write_json_atomic;

#[derive(Debug, Error)]
pub enum MarkerError {
    #[error("marker IO error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMarker {
    pub pid: u32,
    pub session_id: SessionId,
    pub happy_home_dir: PathBuf,
    /// Unix millis of the first write for this pid
    pub created_at: i64,
    /// Unix millis of the latest refresh
    pub updated_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_by: Option<StartedBy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_command_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Fields supplied by the caller; timestamps and home dir are filled in.
#[derive(Debug, Clone)]
pub struct MarkerWrite {
    pub pid: u32,
    pub session_id: SessionId,
    pub started_by: Option<StartedBy>,
    pub metadata: Option<serde_json::Value>,
    pub process_command_hash: Option<String>,
}

/// Stable hex SHA-256 of a full process command line.
pub fn hash_process_command(command: &str) -> String {
    format!("{:x}", Sha256::digest(command.as_bytes()))
}

#[derive(Debug, Clone)]
pub struct MarkerStore {
    dir: PathBuf,
    happy_home_dir: PathBuf,
}

impl MarkerStore {
    pub fn new(happy_home_dir: &Path) -> Self {
        Self {
            dir: happy_home_dir.join("tmp").join("daemon-sessions"),
            happy_home_dir: happy_home_dir.to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, pid: u32) -> PathBuf {
        self.dir.join(format!("pid-{}.json", pid))
    }

    /// Persist a marker atomically, keeping the original `created_at` if one
    /// already exists for this pid.
    pub fn write(&self, write: MarkerWrite) -> Result<SessionMarker, MarkerError> {
        let now = Utc::now().timestamp_millis();
        let created_at = self
            .read(write.pid)
            .map(|existing| existing.created_at)
            .unwrap_or(now);

        let marker = SessionMarker {
            pid: write.pid,
            session_id: write.session_id,
            happy_home_dir: self.happy_home_dir.clone(),
            created_at,
            updated_at: now.max(created_at),
            started_by: write.started_by,
            process_command_hash: write.process_command_hash,
            metadata: write.metadata,
        };
        write_json_atomic(&self.path_for(marker.pid), &marker)?;
        Ok(marker)
    }

    /// Read one marker; missing or unreadable files yield `None`.
    pub fn read(&self, pid: u32) -> Option<SessionMarker> {
        let raw = fs::read_to_string(self.path_for(pid)).ok()?;
        serde_json::from_str(&raw).ok()
    }

    /// All markers written by this installation. Corrupt files are skipped.
    pub fn list(&self) -> Vec<SessionMarker> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                tracing::warn!(dir = %self.dir.display(), error = %e, "cannot read marker directory");
                return Vec::new();
            }
        };

        let mut markers = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            let is_marker = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("pid-") && n.ends_with(".json"));
            if !is_marker {
                continue;
            }

            let parsed = fs::read_to_string(&path)
                .map_err(|e| e.to_string())
                .and_then(|raw| {
                    serde_json::from_str::<SessionMarker>(&raw).map_err(|e| e.to_string())
                });
            match parsed {
                Ok(marker) if marker.happy_home_dir == self.happy_home_dir => markers.push(marker),
                Ok(marker) => tracing::debug!(
                    pid = marker.pid,
                    home = %marker.happy_home_dir.display(),
                    "skipping marker from another installation"
                ),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping invalid session marker")
                }
            }
        }
        markers.sort_by_key(|m| m.pid);
        markers
    }

    /// Best-effort delete; absence is not an error.
    pub fn remove(&self, pid: u32) {
        match fs::remove_file(self.path_for(pid)) {
            Ok(()) => tracing::debug!(pid, "removed session marker"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(pid, error = %e, "failed to remove session marker"),
        }
    }
}

#[cfg(test)]
#[path = "marker_tests.rs"]
mod tests;
