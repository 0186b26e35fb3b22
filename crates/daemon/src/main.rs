// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Happy daemon (happy-daemon)
//!
//! Background process that spawns, tracks and stops agent sessions on this
//! machine.
//!
//! Architecture:
//! - Control server task: loopback HTTP for session reports and local CLIs
//! - Heartbeat task: prunes exited sessions, detects upgrades and takeovers
//! - Main task: waits for a shutdown request or an OS signal

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use hp_adapters::{SystemProcessInspector, TmuxAdapter, TracedSession};
use hp_daemon::lifecycle::{self, probe_installed_version, run_heartbeat, LifecycleError, StartupResult};
use hp_daemon::{control_server, DaemonConfig};
use hp_storage::DaemonStateFile;
use hp_sync::ShutdownSource;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, warn};

/// Exit anyway if graceful shutdown stalls this long
const FORCE_EXIT_AFTER: Duration = Duration::from_secs(5);

/// Rotate `daemon.log` once it grows past this size
const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Rotated logs kept as `daemon.log.1` .. `daemon.log.N`
const MAX_ROTATIONS: u32 = 3;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Handle info flags before any config/lock acquisition
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("happy-daemon {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("happy-daemon {}", env!("CARGO_PKG_VERSION"));
                println!("Happy daemon - spawns and tracks agent sessions for the Happy app");
                println!();
                println!("USAGE:");
                println!("    happy-daemon");
                println!();
                println!("The daemon is typically started by the `happy` CLI and should not");
                println!("be invoked directly. It listens on a loopback HTTP port recorded");
                println!("in daemon.state.json under the Happy home directory.");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -v, --version    Print version information");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: happy-daemon [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let mut config = DaemonConfig::load()?;

    // Upgrades are detected against the CLI that was installed when we started
    if let Some(installed) = probe_installed_version(config.session_program()).await {
        config.version = installed;
    }

    rotate_log_if_needed(&config.log_path);

    // Write startup marker to log (before tracing setup, so CLI can find it)
    write_startup_marker(&config)?;

    let log_guard = setup_logging(&config)?;

    info!(version = %config.version, "Starting daemon");

    let sessions = TracedSession::new(TmuxAdapter::new());
    let inspector = Arc::new(SystemProcessInspector::new());
    let StartupResult {
        daemon,
        listener,
        lock,
        reattached,
    } = match lifecycle::startup(config.clone(), sessions, inspector).await {
        Ok(r) => r,
        Err(LifecycleError::AlreadyRunning { holder }) => {
            eprintln!("happy-daemon is already running");
            if let Some(pid) = holder {
                eprintln!("  pid: {pid}");
            }
            if let Some(record) = DaemonStateFile::new(&config.happy_home_dir).read() {
                eprintln!("  port: {}", record.http_port);
                if record.started_with_cli_version == config.version {
                    eprintln!("  version: {}", record.started_with_cli_version);
                } else {
                    eprintln!(
                        "  version: {} (outdated, current: {})",
                        record.started_with_cli_version, config.version
                    );
                }
            }
            std::process::exit(1);
        }
        Err(e) => {
            // Write error synchronously (tracing is non-blocking and may not flush in time)
            write_startup_error(&config, &e);
            error!("Failed to start daemon: {}", e);
            drop(log_guard);
            return Err(e.into());
        }
    };

    info!(
        adopted = reattached.adopted,
        eligible_not_adopted = reattached.eligible_not_adopted,
        ineligible = reattached.ineligible,
        dead = reattached.dead,
        "session markers reconciled"
    );

    let server = tokio::spawn(control_server::serve(listener, Arc::clone(&daemon)));
    tokio::spawn(run_heartbeat(Arc::clone(&daemon)));

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    // Signal ready for parent process (CLI waiting for startup)
    println!("READY");

    let cancel = daemon.shutdown_signal().token();
    tokio::select! {
        _ = cancel.cancelled() => {
            info!("Shutdown requested");
        }
        _ = sigterm.recv() => {
            info!("Received SIGTERM, shutting down...");
            daemon.request_shutdown(ShutdownSource::OsSignal);
        }
        _ = sigint.recv() => {
            info!("Received SIGINT, shutting down...");
            daemon.request_shutdown(ShutdownSource::OsSignal);
        }
    }

    spawn_exit_fallback();
    lifecycle::shutdown(&daemon, None, lock).await;

    match server.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "control server stopped with error"),
        Err(e) => warn!(error = %e, "control server task failed"),
    }
    info!("Daemon stopped");
    Ok(())
}

/// Exit the process if graceful shutdown hangs.
fn spawn_exit_fallback() {
    std::thread::spawn(|| {
        std::thread::sleep(FORCE_EXIT_AFTER);
        eprintln!("happy-daemon: shutdown timed out, exiting");
        std::process::exit(1);
    });
}

/// Startup marker prefix written to log before anything else.
/// CLI uses this to find where the current startup attempt begins.
/// Full format: "--- happy-daemon: starting (pid: 12345) ---"
pub const STARTUP_MARKER_PREFIX: &str = "--- happy-daemon: starting (pid: ";

/// Write startup marker to log file (appends to existing log)
fn write_startup_marker(config: &DaemonConfig) -> Result<(), LifecycleError> {
    use std::io::Write;

    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)?;
    writeln!(file, "{}{}) ---", STARTUP_MARKER_PREFIX, std::process::id())?;

    Ok(())
}

/// Write startup error synchronously to log file.
/// This ensures the error is visible to the CLI even if the process exits quickly.
fn write_startup_error(config: &DaemonConfig, error: &LifecycleError) {
    use std::io::Write;

    let Ok(mut file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)
    else {
        return;
    };
    let _ = writeln!(file, "ERROR Failed to start daemon: {}", error);
}

/// Shift `log.1 .. log.N-1` up by one and move the live log to `log.1`.
fn rotate_log_if_needed(log_path: &Path) {
    let Ok(meta) = std::fs::metadata(log_path) else {
        return;
    };
    if meta.len() <= MAX_LOG_SIZE {
        return;
    }
    let rotated = |n: u32| {
        let mut name = log_path.as_os_str().to_owned();
        name.push(format!(".{n}"));
        std::path::PathBuf::from(name)
    };
    for n in (1..MAX_ROTATIONS).rev() {
        let from = rotated(n);
        if from.exists() {
            let _ = std::fs::rename(&from, rotated(n + 1));
        }
    }
    let _ = std::fs::rename(log_path, rotated(1));
}

fn setup_logging(
    config: &DaemonConfig,
) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let invalid = || LifecycleError::InvalidLogPath(config.log_path.clone());
    let dir = config.log_path.parent().ok_or_else(invalid)?;
    let file_name = config.log_path.file_name().ok_or_else(invalid)?;
    std::fs::create_dir_all(dir)?;

    let file_appender = tracing_appender::rolling::never(dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
