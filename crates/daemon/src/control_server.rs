// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Loopback HTTP control server.
//!
//! Session processes report in here, and local CLIs list, spawn and stop
//! sessions or stop the daemon.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use hp_adapters::{ProcessInspector, SessionAdapter};
use hp_core::SessionId;
use hp_sync::ShutdownSource;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use crate::daemon::Daemon;
use crate::registry::ChildSummary;
use crate::spawn::{SpawnOutcome, SpawnRequest};

/// Delay between answering `/stop` and starting shutdown
pub const STOP_DELAY: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStartedBody {
    pub session_id: SessionId,
    #[serde(default)]
    pub metadata: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopSessionBody {
    pub session_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse {
    pub children: Vec<ChildSummary>,
}

type Shared<S, P> = State<Arc<Daemon<S, P>>>;

pub fn router<S, P>(daemon: Arc<Daemon<S, P>>) -> Router
where
    S: SessionAdapter,
    P: ProcessInspector,
{
    Router::new()
        .route("/session-started", post(session_started::<S, P>))
        .route("/list", post(list::<S, P>))
        .route("/stop-session", post(stop_session::<S, P>))
        .route("/spawn-session", post(spawn_session::<S, P>))
        .route("/stop", post(stop::<S, P>))
        .with_state(daemon)
}

/// Serve until the daemon's shutdown signal fires.
pub async fn serve<S, P>(listener: TcpListener, daemon: Arc<Daemon<S, P>>) -> std::io::Result<()>
where
    S: SessionAdapter,
    P: ProcessInspector,
{
    let cancel = daemon.shutdown_signal().token();
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "control server listening");
    }
    axum::serve(listener, router(daemon))
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
}

async fn session_started<S, P>(
    State(daemon): Shared<S, P>,
    Json(body): Json<SessionStartedBody>,
) -> Json<Value>
where
    S: SessionAdapter,
    P: ProcessInspector,
{
    daemon.on_session_webhook(body.session_id, body.metadata);
    Json(json!({ "status": "ok" }))
}

async fn list<S, P>(State(daemon): Shared<S, P>) -> Json<ListResponse>
where
    S: SessionAdapter,
    P: ProcessInspector,
{
    Json(ListResponse {
        children: daemon.list_children(),
    })
}

async fn stop_session<S, P>(
    State(daemon): Shared<S, P>,
    Json(body): Json<StopSessionBody>,
) -> Json<Value>
where
    S: SessionAdapter,
    P: ProcessInspector,
{
    let success = daemon.stop_session(&body.session_id).await;
    Json(json!({ "success": success }))
}

async fn spawn_session<S, P>(
    State(daemon): Shared<S, P>,
    Json(request): Json<SpawnRequest>,
) -> (StatusCode, Json<Value>)
where
    S: SessionAdapter,
    P: ProcessInspector,
{
    match daemon.spawn_session(&request).await {
        SpawnOutcome::Success { session_id } => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "sessionId": session_id,
                "approvedNewDirectoryCreation": true,
            })),
        ),
        SpawnOutcome::RequestToApproveDirectoryCreation { directory } => (
            StatusCode::CONFLICT,
            Json(json!({
                "success": false,
                "requiresUserApproval": true,
                "actionRequired": "CREATE_DIRECTORY",
                "directory": directory,
            })),
        ),
        SpawnOutcome::Error { error_message } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "success": false, "error": error_message })),
        ),
    }
}

async fn stop<S, P>(State(daemon): Shared<S, P>) -> Json<Value>
where
    S: SessionAdapter,
    P: ProcessInspector,
{
    tokio::spawn(async move {
        tokio::time::sleep(STOP_DELAY).await;
        daemon.request_shutdown(ShutdownSource::Cli);
    });
    Json(json!({ "status": "stopping" }))
}
