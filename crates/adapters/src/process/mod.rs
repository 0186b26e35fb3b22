// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Live OS process inspection and signaling

mod system;

pub use system::SystemProcessInspector;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeProcessInspector, SignalCall};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SignalError {
    #[error("no such process: {0}")]
    NoSuchProcess(u32),
    #[error("not permitted to signal pid {0}")]
    PermissionDenied(u32),
    #[error("signal to pid {pid} failed: {message}")]
    Failed { pid: u32, message: String },
}

/// Read-only view of the process table plus termination.
///
/// Absence is a normal answer: lookups return `false`/`None`, never errors.
pub trait ProcessInspector: Send + Sync + 'static {
    fn is_alive(&self, pid: u32) -> bool;

    /// Full command line of `pid`, arguments joined by single spaces
    fn command_line(&self, pid: u32) -> Option<String>;

    /// Send SIGTERM
    fn terminate(&self, pid: u32) -> Result<(), SignalError>;
}
