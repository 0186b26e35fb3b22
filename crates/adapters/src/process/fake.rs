// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake process table for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{ProcessInspector, SignalError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalCall {
    Terminate { pid: u32 },
}

#[derive(Default)]
struct FakeState {
    processes: HashMap<u32, String>,
    signals: Vec<SignalCall>,
    /// Remove the process from the table when it is signaled
    exit_on_terminate: bool,
}

/// In-memory process table
#[derive(Clone, Default)]
pub struct FakeProcessInspector {
    inner: Arc<Mutex<FakeState>>,
}

impl FakeProcessInspector {
    pub fn new() -> Self {
        let fake = Self::default();
        fake.inner.lock().exit_on_terminate = true;
        fake
    }

    /// Add or replace a live process
    pub fn insert(&self, pid: u32, command_line: &str) {
        self.inner
            .lock()
            .processes
            .insert(pid, command_line.to_string());
    }

    pub fn remove(&self, pid: u32) {
        self.inner.lock().processes.remove(&pid);
    }

    pub fn set_exit_on_terminate(&self, exit: bool) {
        self.inner.lock().exit_on_terminate = exit;
    }

    pub fn signals(&self) -> Vec<SignalCall> {
        self.inner.lock().signals.clone()
    }
}

impl ProcessInspector for FakeProcessInspector {
    fn is_alive(&self, pid: u32) -> bool {
        self.inner.lock().processes.contains_key(&pid)
    }

    fn command_line(&self, pid: u32) -> Option<String> {
        self.inner.lock().processes.get(&pid).cloned()
    }

    fn terminate(&self, pid: u32) -> Result<(), SignalError> {
        let mut inner = self.inner.lock();
        if !inner.processes.contains_key(&pid) {
            return Err(SignalError::NoSuchProcess(pid));
        }
        inner.signals.push(SignalCall::Terminate { pid });
        if inner.exit_on_terminate {
            inner.processes.remove(&pid);
        }
        Ok(())
    }
}
