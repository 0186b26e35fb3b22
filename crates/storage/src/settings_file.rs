// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `settings.json` with locked read-modify-write.
//!
//! Writers take `settings.json.lock` (create-exclusive, stale after 10s),
//! write `settings.json.tmp`, and rename. Readers never lock.

use hp_core::{retry_blocking, Attempt, Backoff, RetryError, RetryPolicy, Settings};
use serde_json::Value;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::atomic::{sibling, write_json_atomic};
use crate::lock::{LockError, LockFile};

/// A lock older than this is assumed abandoned by a crashed writer.
const LOCK_STALE_AFTER: Duration = Duration::from_secs(10);
const LOCK_ATTEMPTS: u32 = 50;
const LOCK_RETRY_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings lock unavailable: {0}")]
    Lock(#[from] RetryError<LockError>),
    #[error("settings IO error: {0}")]
    Io(#[from] io::Error),
    #[error("settings delta produced invalid settings: {0}")]
    InvalidDelta(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(happy_home_dir: &Path) -> Self {
        Self {
            path: happy_home_dir.join("settings.json"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current settings. Missing or corrupt files yield defaults.
    pub fn read(&self) -> Settings {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Settings::default(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "cannot read settings, using defaults");
                return Settings::default();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "corrupt settings, using defaults");
                Settings::default()
            }
        }
    }

    /// Locked read-modify-write.
    pub fn update(&self, f: impl FnOnce(Settings) -> Settings) -> Result<Settings, SettingsError> {
        let lock = self.acquire_lock()?;
        let updated = f(self.read());
        write_json_atomic(&self.path, &updated)?;
        lock.release()?;
        Ok(updated)
    }

    /// Locked field-overwrite merge of a partial JSON delta.
    pub fn apply_delta(&self, delta: &Value) -> Result<Settings, SettingsError> {
        let lock = self.acquire_lock()?;
        let updated = self.read().with_delta(delta)?;
        write_json_atomic(&self.path, &updated)?;
        lock.release()?;
        Ok(updated)
    }

    fn acquire_lock(&self) -> Result<LockFile, SettingsError> {
        let lock_path = sibling(&self.path, ".lock");
        let policy = RetryPolicy::new(LOCK_ATTEMPTS, Backoff::Fixed(LOCK_RETRY_DELAY));
        let lock = retry_blocking(policy, |_| {
            LockFile::try_acquire(&lock_path, std::process::id(), |info| {
                info.age.is_some_and(|age| age > LOCK_STALE_AFTER)
            })
            .map_err(|e| match e {
                LockError::Held { .. } => Attempt::Retry(e),
                LockError::Io(_) => Attempt::Abort(e),
            })
        })?;
        Ok(lock)
    }
}

#[cfg(test)]
#[path = "settings_file_tests.rs"]
mod tests;
