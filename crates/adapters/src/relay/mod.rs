// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Relay channel seam.
//!
//! The relay is a bidirectional event channel (socket.io over WebSocket in
//! production). Only emit, emit-with-ack and connection state are needed here.

#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeRelay, RelayCall};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum RelayError {
    #[error("relay not connected")]
    NotConnected,
    #[error("relay ack timed out for {0}")]
    Timeout(String),
    #[error("relay transport error: {0}")]
    Transport(String),
}

#[async_trait]
pub trait RelayChannel: Send + Sync + 'static {
    fn is_connected(&self) -> bool;

    /// Fire-and-forget event
    async fn emit(&self, event: &str, payload: Value) -> Result<(), RelayError>;

    /// Event expecting exactly one acknowledgement payload
    async fn emit_with_ack(&self, event: &str, payload: Value) -> Result<Value, RelayError>;
}
