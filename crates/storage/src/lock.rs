// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Create-exclusive lock files.
//!
//! A lock is a file created with `O_EXCL` holding the owner's pid. It is
//! multi-process safe without any in-process mutex. Callers decide when an
//! existing lock is stale (dead holder, too old) via a predicate.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LockError {
    #[error("lock {} is held by {}", .path.display(), describe_holder(.holder))]
    Held { path: PathBuf, holder: Option<u32> },
    #[error("lock IO error: {0}")]
    Io(#[from] io::Error),
}

fn describe_holder(holder: &Option<u32>) -> String {
    match holder {
        Some(pid) => format!("pid {pid}"),
        None => "an unknown holder".to_string(),
    }
}

/// What is known about an existing lock file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockInfo {
    /// Pid written by the holder, if parseable
    pub pid: Option<u32>,
    /// Time since the lock file was last modified
    pub age: Option<Duration>,
}

impl LockInfo {
    fn read(path: &Path) -> Option<Self> {
        let meta = fs::metadata(path).ok()?;
        let pid = fs::read_to_string(path)
            .ok()
            .and_then(|s| s.trim().parse().ok());
        let age = meta
            .modified()
            .ok()
            .and_then(|m| SystemTime::now().duration_since(m).ok());
        Some(Self { pid, age })
    }
}

/// Held lock; the file is removed on drop.
#[derive(Debug)]
pub struct LockFile {
    path: PathBuf,
    released: bool,
}

impl LockFile {
    /// Try once to create the lock. An existing lock judged stale by
    /// `is_stale` is removed and creation is retried a single time.
    pub fn try_acquire(
        path: &Path,
        owner_pid: u32,
        is_stale: impl Fn(&LockInfo) -> bool,
    ) -> Result<Self, LockError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        match create_exclusive(path, owner_pid) {
            Ok(lock) => return Ok(lock),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
            Err(e) => return Err(e.into()),
        }

        let Some(info) = LockInfo::read(path) else {
            // Holder released between our create and read
            return create_exclusive(path, owner_pid).map_err(|e| held_or_io(path, None, e));
        };

        if !is_stale(&info) {
            return Err(LockError::Held {
                path: path.to_path_buf(),
                holder: info.pid,
            });
        }

        tracing::warn!(path = %path.display(), holder = ?info.pid, age = ?info.age, "reclaiming stale lock");
        match fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        create_exclusive(path, owner_pid).map_err(|e| held_or_io(path, info.pid, e))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release explicitly, surfacing removal errors.
    pub fn release(mut self) -> io::Result<()> {
        self.released = true;
        remove_if_exists(&self.path)
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        if !self.released {
            let _ = remove_if_exists(&self.path);
        }
    }
}

fn create_exclusive(path: &Path, owner_pid: u32) -> io::Result<LockFile> {
    create_exclusive_with(path, |file| {
        writeln!(file, "{}", owner_pid)?;
        file.sync_all()
    })
}

/// The guard exists before `write_owner` runs, so a failed write removes
/// the half-written lock.
fn create_exclusive_with(
    path: &Path,
    write_owner: impl FnOnce(&mut File) -> io::Result<()>,
) -> io::Result<LockFile> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)?;
    let lock = LockFile {
        path: path.to_path_buf(),
        released: false,
    };
    write_owner(&mut file)?;
    Ok(lock)
}

fn held_or_io(path: &Path, holder: Option<u32>, e: io::Error) -> LockError {
    if e.kind() == io::ErrorKind::AlreadyExists {
        LockError::Held {
            path: path.to_path_buf(),
            holder,
        }
    } else {
        LockError::Io(e)
    }
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
