// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Machine-scoped relay client used by the daemon.

use hp_adapters::RelayChannel;
use hp_core::{MachineId, Versioned};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::rpc::{RpcHandlerManager, RpcRequest, RpcScope};
use crate::state::{DaemonRuntimeState, MachineMetadata};
use crate::update::{SyncError, UpdateTarget, VersionedSync};

pub struct MachineClient {
    machine_id: MachineId,
    sync: VersionedSync,
    // Held across the relay round trip so local writers queue up
    metadata: Mutex<Versioned<MachineMetadata>>,
    daemon_state: Mutex<Versioned<DaemonRuntimeState>>,
    rpc: RpcHandlerManager,
}

impl MachineClient {
    pub fn new(
        machine_id: MachineId,
        sync: VersionedSync,
        metadata: Versioned<MachineMetadata>,
        daemon_state: Versioned<DaemonRuntimeState>,
    ) -> Self {
        let rpc = RpcHandlerManager::new(
            RpcScope::Machine(machine_id.clone()),
            Arc::clone(sync.encryptor()),
        );
        Self {
            machine_id,
            sync,
            metadata: Mutex::new(metadata),
            daemon_state: Mutex::new(daemon_state),
            rpc,
        }
    }

    pub fn machine_id(&self) -> &MachineId {
        &self.machine_id
    }

    pub fn rpc(&self) -> &RpcHandlerManager {
        &self.rpc
    }

    pub async fn metadata(&self) -> Versioned<MachineMetadata> {
        self.metadata.lock().await.clone()
    }

    pub async fn daemon_state(&self) -> Versioned<DaemonRuntimeState> {
        self.daemon_state.lock().await.clone()
    }

    pub async fn update_metadata(
        &self,
        mutate: impl Fn(MachineMetadata) -> MachineMetadata + Send + Sync,
    ) -> Result<MachineMetadata, SyncError> {
        let mut current = self.metadata.lock().await;
        let target = UpdateTarget::machine_metadata(self.machine_id.as_str());
        *current = self.sync.update(&target, current.clone(), mutate).await?;
        Ok(current.value.clone())
    }

    pub async fn update_daemon_state(
        &self,
        mutate: impl Fn(DaemonRuntimeState) -> DaemonRuntimeState + Send + Sync,
    ) -> Result<DaemonRuntimeState, SyncError> {
        let mut current = self.daemon_state.lock().await;
        let target = UpdateTarget::machine_state(self.machine_id.as_str());
        *current = self.sync.update(&target, current.clone(), mutate).await?;
        Ok(current.value.clone())
    }

    /// Socket (re)connected: re-announce machine RPC methods.
    pub async fn on_connect(&self) {
        self.rpc.on_socket_connect(Arc::clone(self.sync.relay())).await;
    }

    pub fn on_disconnect(&self) {
        self.rpc.on_socket_disconnect();
    }

    pub async fn handle_rpc_request(&self, request: &RpcRequest) -> String {
        self.rpc.handle_request(request).await
    }

    pub async fn send_alive(&self) {
        let relay = self.sync.relay();
        if !relay.is_connected() {
            return;
        }
        let payload = json!({
            "machineId": self.machine_id,
            "time": chrono::Utc::now().timestamp_millis(),
        });
        if let Err(e) = relay.emit("machine-alive", payload).await {
            tracing::debug!(error = %e, "machine-alive not sent");
        }
    }

    /// Emit `machine-alive` every `interval` until cancelled.
    pub fn spawn_keep_alive(
        self: &Arc<Self>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let client = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => client.send_alive().await,
                }
            }
        })
    }
}

#[cfg(test)]
#[path = "machine_tests.rs"]
mod tests;
