// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Happy daemon library
//!
//! The daemon keeps a registry of agent sessions on this machine, spawns
//! new ones on request from the app or a local CLI, and survives restarts
//! by reattaching to sessions recorded in on-disk markers.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod config;
pub mod control_client;
pub mod control_server;
pub mod daemon;
pub mod env;
pub mod lifecycle;
pub mod machine_rpc;
pub mod registry;
pub mod safety;
pub mod spawn;
mod stop;
mod webhook;

pub use config::{DaemonConfig, DAEMON_VERSION};
pub use control_client::{is_daemon_running, ControlClient, ControlError};
pub use daemon::{Daemon, ShutdownSignal};
pub use lifecycle::{HeartbeatOutcome, LifecycleError, ReattachReport, StartupResult};
pub use machine_rpc::register_machine_handlers;
pub use registry::{ChildSummary, DaemonRegistry, SessionPhase, TrackedSession};
pub use safety::{classify_happy_process, is_pid_safe_happy_session_process, ProcessType};
pub use spawn::{SpawnError, SpawnOutcome, SpawnRequest};
