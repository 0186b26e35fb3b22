// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scriptable in-memory relay for tests
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{RelayChannel, RelayError};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum RelayCall {
    Emit { event: String, payload: Value },
    EmitWithAck { event: String, payload: Value },
}

type AckHandler = Box<dyn FnMut(&str, &Value) -> Result<Value, RelayError> + Send>;

struct FakeState {
    connected: bool,
    calls: Vec<RelayCall>,
    ack: Option<AckHandler>,
}

/// Records every emit; acks are produced by a test-provided closure.
#[derive(Clone)]
pub struct FakeRelay {
    inner: Arc<Mutex<FakeState>>,
}

impl Default for FakeRelay {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeState {
                connected: true,
                calls: Vec::new(),
                ack: None,
            })),
        }
    }
}

impl FakeRelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_connected(&self, connected: bool) {
        self.inner.lock().connected = connected;
    }

    /// Install the closure that answers `emit_with_ack`
    pub fn on_ack(
        &self,
        handler: impl FnMut(&str, &Value) -> Result<Value, RelayError> + Send + 'static,
    ) {
        self.inner.lock().ack = Some(Box::new(handler));
    }

    pub fn calls(&self) -> Vec<RelayCall> {
        self.inner.lock().calls.clone()
    }

    /// Payloads of fire-and-forget emits for one event name
    pub fn emitted(&self, event: &str) -> Vec<Value> {
        self.inner
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                RelayCall::Emit { event: e, payload } if e == event => Some(payload.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear_calls(&self) {
        self.inner.lock().calls.clear();
    }
}

#[async_trait]
impl RelayChannel for FakeRelay {
    fn is_connected(&self) -> bool {
        self.inner.lock().connected
    }

    async fn emit(&self, event: &str, payload: Value) -> Result<(), RelayError> {
        let mut inner = self.inner.lock();
        if !inner.connected {
            return Err(RelayError::NotConnected);
        }
        inner.calls.push(RelayCall::Emit {
            event: event.to_string(),
            payload,
        });
        Ok(())
    }

    async fn emit_with_ack(&self, event: &str, payload: Value) -> Result<Value, RelayError> {
        let mut inner = self.inner.lock();
        if !inner.connected {
            return Err(RelayError::NotConnected);
        }
        inner.calls.push(RelayCall::EmitWithAck {
            event: event.to_string(),
            payload: payload.clone(),
        });
        match inner.ack.as_mut() {
            Some(handler) => handler(event, &payload),
            None => Err(RelayError::Timeout(event.to_string())),
        }
    }
}
