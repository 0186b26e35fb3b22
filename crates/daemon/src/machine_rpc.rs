// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Machine-scoped RPC methods the app calls through the relay.

use std::sync::Arc;

use hp_adapters::{ProcessInspector, SessionAdapter};
use hp_sync::{MachineClient, RpcError, ShutdownSource};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::control_server::STOP_DELAY;
use crate::daemon::Daemon;
use crate::spawn::SpawnRequest;

pub const SPAWN_SESSION: &str = "spawn-happy-session";
pub const STOP_SESSION: &str = "stop-session";
pub const STOP_DAEMON: &str = "stop-daemon";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StopSessionParams {
    session_id: String,
}

fn parse<T: serde::de::DeserializeOwned>(params: Value) -> Result<T, RpcError> {
    serde_json::from_value(params).map_err(|e| RpcError::handler(format!("invalid params: {e}")))
}

/// Register the daemon's handlers on the machine's RPC registry.
pub async fn register_machine_handlers<S, P>(machine: &MachineClient, daemon: Arc<Daemon<S, P>>)
where
    S: SessionAdapter,
    P: ProcessInspector,
{
    let rpc = machine.rpc();

    let spawner = Arc::clone(&daemon);
    rpc.register_handler(SPAWN_SESSION, move |params: Value| {
        let daemon = Arc::clone(&spawner);
        async move {
            let request: SpawnRequest = parse(params)?;
            tracing::info!(directory = %request.directory.display(), agent = %request.agent, "spawn requested by app");
            let outcome = daemon.spawn_session(&request).await;
            serde_json::to_value(outcome).map_err(RpcError::handler)
        }
    })
    .await;

    let stopper = Arc::clone(&daemon);
    rpc.register_handler(STOP_SESSION, move |params: Value| {
        let daemon = Arc::clone(&stopper);
        async move {
            let StopSessionParams { session_id } = parse(params)?;
            if daemon.stop_session(&session_id).await {
                Ok(json!({ "message": "Session stopped" }))
            } else {
                Err(RpcError::handler("Session not found or failed to stop"))
            }
        }
    })
    .await;

    rpc.register_handler(STOP_DAEMON, move |_params: Value| {
        let daemon = Arc::clone(&daemon);
        async move {
            tokio::spawn(async move {
                tokio::time::sleep(STOP_DELAY).await;
                daemon.request_shutdown(ShutdownSource::MobileApp);
            });
            Ok(json!({ "message": "Daemon stop request acknowledged, starting shutdown sequence..." }))
        }
    })
    .await;
}

#[cfg(test)]
#[path = "machine_rpc_tests.rs"]
mod tests;
