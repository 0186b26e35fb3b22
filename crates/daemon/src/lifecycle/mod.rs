// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, shutdown, recovery.

mod heartbeat;
mod lock;
mod reattach;

pub use heartbeat::{parse_version_output, probe_installed_version, run_heartbeat, HeartbeatOutcome};
pub use lock::{acquire_daemon_lock, is_stale_daemon_lock, lock_retry_policy};
pub use reattach::ReattachReport;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use hp_adapters::{ProcessInspector, SessionAdapter};
use hp_storage::{DaemonStateRecord, LockError, LockFile, StateFileError};
use hp_sync::{DaemonRuntimeState, MachineClient, ShutdownSource};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::DaemonConfig;
use crate::daemon::Daemon;
use crate::machine_rpc::register_machine_handlers;

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not determine home directory")]
    NoHomeDir,

    #[error("Daemon already running (pid {})", describe_holder(.holder))]
    AlreadyRunning { holder: Option<u32> },

    #[error("Failed to acquire daemon lock: {0}")]
    Lock(#[source] LockError),

    #[error("Failed to bind control server on {0}: {1}")]
    BindFailed(SocketAddr, std::io::Error),

    #[error("Invalid log path: {0}")]
    InvalidLogPath(PathBuf),

    #[error("State file error: {0}")]
    StateFile(#[from] StateFileError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn describe_holder(holder: &Option<u32>) -> String {
    holder.map_or_else(|| "unknown".to_string(), |pid| pid.to_string())
}

/// A started daemon, its bound control listener and the held lock.
pub struct StartupResult<S, P> {
    pub daemon: Arc<Daemon<S, P>>,
    pub listener: TcpListener,
    pub lock: LockFile,
    pub reattached: ReattachReport,
}

/// Start the daemon
pub async fn startup<S, P>(
    config: DaemonConfig,
    sessions: S,
    inspector: Arc<P>,
) -> Result<StartupResult<S, P>, LifecycleError>
where
    S: SessionAdapter,
    P: ProcessInspector,
{
    match startup_inner(config.clone(), sessions, inspector).await {
        Ok(result) => Ok(result),
        Err(e) => {
            // The lock and state file belong to the running daemon
            if !matches!(e, LifecycleError::AlreadyRunning { .. }) {
                cleanup_on_failure(&config);
            }
            Err(e)
        }
    }
}

/// Inner startup logic - cleanup_on_failure called if this fails
async fn startup_inner<S, P>(
    config: DaemonConfig,
    sessions: S,
    inspector: Arc<P>,
) -> Result<StartupResult<S, P>, LifecycleError>
where
    S: SessionAdapter,
    P: ProcessInspector,
{
    // 1. Home directory
    std::fs::create_dir_all(&config.happy_home_dir)?;

    // 2. Lock FIRST - prevents two daemons racing for the state file
    let pid = std::process::id();
    let lock =
        acquire_daemon_lock(&config.lock_path, pid, inspector.as_ref(), lock_retry_policy())
            .await?;

    // 3. Adopt sessions left by a previous daemon
    let daemon = Daemon::new(config, sessions, inspector);
    let reattached = daemon.reattach_sessions();

    // 4. Bind control server (loopback only)
    let addr = SocketAddr::from(([127, 0, 0, 1], daemon.config.http_port));
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| LifecycleError::BindFailed(addr, e))?;
    let port = listener.local_addr()?.port();

    // 5. Publish ourselves locally (LAST - only after everything else worked)
    let mut record = DaemonStateRecord::new(pid, port, daemon.config.version.clone());
    record.daemon_log_path = Some(daemon.config.log_path.clone());
    daemon.state_file.write(&record)?;

    info!(
        pid,
        port,
        version = %daemon.config.version,
        tracked = daemon.registry.len(),
        "daemon started"
    );
    Ok(StartupResult {
        daemon: Arc::new(daemon),
        listener,
        lock,
        reattached,
    })
}

fn cleanup_on_failure(config: &DaemonConfig) {
    let state_file = hp_storage::DaemonStateFile::new(&config.happy_home_dir);
    if let Err(e) = state_file.clear_if_owned(std::process::id()) {
        warn!("Failed to remove state file after failed startup: {}", e);
    }
}

/// Announce the running daemon on the relay.
pub async fn publish_running<S, P>(daemon: &Daemon<S, P>, machine: &MachineClient, port: u16)
where
    S: SessionAdapter,
    P: ProcessInspector,
{
    let pid = daemon.pid();
    let started_at = chrono::Utc::now().timestamp_millis();
    if let Err(e) = machine
        .update_daemon_state(move |_| DaemonRuntimeState::running(pid, port, started_at))
        .await
    {
        warn!(error = %e, "failed to publish daemon state");
    }
}

/// Attach the daemon to the relay: register machine RPCs, announce them,
/// publish the running state and start the keep-alive.
pub async fn connect_machine<S, P>(
    daemon: &Arc<Daemon<S, P>>,
    machine: &Arc<MachineClient>,
    port: u16,
) -> JoinHandle<()>
where
    S: SessionAdapter,
    P: ProcessInspector,
{
    register_machine_handlers(machine, Arc::clone(daemon)).await;
    machine.on_connect().await;
    publish_running(daemon, machine, port).await;
    machine.spawn_keep_alive(
        daemon.config.keepalive_interval,
        daemon.shutdown_signal().token(),
    )
}

/// Shutdown the daemon gracefully.
///
/// Sessions are left running; the next daemon reattaches them from markers.
pub async fn shutdown<S, P>(daemon: &Daemon<S, P>, machine: Option<&MachineClient>, lock: LockFile)
where
    S: SessionAdapter,
    P: ProcessInspector,
{
    let source = daemon
        .shutdown_signal()
        .source()
        .unwrap_or(ShutdownSource::Exception);
    info!(?source, "Shutting down daemon...");

    // 1. Tell the app
    if let Some(machine) = machine {
        let requested_at = chrono::Utc::now().timestamp_millis();
        if let Err(e) = machine
            .update_daemon_state(move |state| state.shutting_down(source, requested_at))
            .await
        {
            warn!(error = %e, "failed to publish shutdown state");
        }
    }

    // 2. Remove state file if it is still ours
    match daemon.state_file.clear_if_owned(daemon.pid()) {
        Ok(true) => {}
        Ok(false) => info!("state file owned by another daemon, leaving it"),
        Err(e) => warn!("Failed to remove state file: {}", e),
    }

    // 3. Release the lock
    if let Err(e) = lock.release() {
        warn!("Failed to remove lock file: {}", e);
    }

    info!("Daemon shutdown complete");
}

#[cfg(test)]
#[path = "startup_tests.rs"]
mod tests;
