// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session-scoped relay client used inside each session process.

use hp_adapters::RelayChannel;
use hp_core::{AgentMessage, SessionId, Versioned};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::codec::seal;
use crate::rpc::{RpcHandlerManager, RpcRequest, RpcScope};
use crate::update::{SyncError, UpdateTarget, VersionedSync};

pub struct SessionClient {
    session_id: SessionId,
    sync: VersionedSync,
    metadata: Mutex<Versioned<Value>>,
    agent_state: Mutex<Versioned<Value>>,
    rpc: RpcHandlerManager,
}

impl SessionClient {
    pub fn new(
        session_id: SessionId,
        sync: VersionedSync,
        metadata: Versioned<Value>,
        agent_state: Versioned<Value>,
    ) -> Self {
        let rpc = RpcHandlerManager::new(
            RpcScope::Session(session_id.clone()),
            Arc::clone(sync.encryptor()),
        );
        Self {
            session_id,
            sync,
            metadata: Mutex::new(metadata),
            agent_state: Mutex::new(agent_state),
            rpc,
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn rpc(&self) -> &RpcHandlerManager {
        &self.rpc
    }

    pub async fn metadata(&self) -> Versioned<Value> {
        self.metadata.lock().await.clone()
    }

    pub async fn agent_state(&self) -> Versioned<Value> {
        self.agent_state.lock().await.clone()
    }

    pub async fn update_metadata(
        &self,
        mutate: impl Fn(Value) -> Value + Send + Sync,
    ) -> Result<Value, SyncError> {
        let mut current = self.metadata.lock().await;
        let target = UpdateTarget::session_metadata(self.session_id.as_str());
        *current = self.sync.update(&target, current.clone(), mutate).await?;
        Ok(current.value.clone())
    }

    pub async fn update_agent_state(
        &self,
        mutate: impl Fn(Value) -> Value + Send + Sync,
    ) -> Result<Value, SyncError> {
        let mut current = self.agent_state.lock().await;
        let target = UpdateTarget::session_state(self.session_id.as_str());
        *current = self.sync.update(&target, current.clone(), mutate).await?;
        Ok(current.value.clone())
    }

    pub async fn on_connect(&self) {
        self.rpc.on_socket_connect(Arc::clone(self.sync.relay())).await;
    }

    pub fn on_disconnect(&self) {
        self.rpc.on_socket_disconnect();
    }

    pub async fn handle_rpc_request(&self, request: &RpcRequest) -> String {
        self.rpc.handle_request(request).await
    }

    /// Forward one normalized agent message, sealed, to the app.
    pub async fn send_agent_message(&self, message: &AgentMessage) -> Result<(), SyncError> {
        let content = json!({ "role": "agent", "content": message });
        let sealed = seal(self.sync.encryptor().as_ref(), &content);
        self.sync
            .relay()
            .emit("message", json!({ "sid": self.session_id, "message": sealed }))
            .await?;
        Ok(())
    }

    pub async fn send_alive(&self, thinking: bool, mode: &str) {
        let payload = json!({
            "sid": self.session_id,
            "time": chrono::Utc::now().timestamp_millis(),
            "thinking": thinking,
            "mode": mode,
        });
        if let Err(e) = self.sync.relay().emit("session-alive", payload).await {
            tracing::debug!(session_id = %self.session_id, error = %e, "session-alive not sent");
        }
    }

    /// Tell the relay this session is gone for good.
    pub async fn send_session_death(&self) {
        let payload = json!({
            "sid": self.session_id,
            "time": chrono::Utc::now().timestamp_millis(),
        });
        if let Err(e) = self.sync.relay().emit("session-end", payload).await {
            tracing::warn!(session_id = %self.session_id, error = %e, "session-end not sent");
        }
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
