// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Machine-scoped values the daemon publishes to the relay.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Static description of this machine, shown in the app's machine list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineMetadata {
    pub host: String,
    pub platform: String,
    pub happy_cli_version: String,
    pub home_dir: PathBuf,
    pub happy_home_dir: PathBuf,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DaemonStatus {
    #[default]
    Offline,
    Running,
    ShuttingDown,
}

/// What asked the daemon to stop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShutdownSource {
    MobileApp,
    Cli,
    OsSignal,
    Exception,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaemonRuntimeState {
    pub status: DaemonStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shutdown_requested_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shutdown_source: Option<ShutdownSource>,
}

impl DaemonRuntimeState {
    pub fn running(pid: u32, http_port: u16, started_at: i64) -> Self {
        Self {
            status: DaemonStatus::Running,
            pid: Some(pid),
            http_port: Some(http_port),
            started_at: Some(started_at),
            ..Default::default()
        }
    }

    /// Same state, marked as shutting down. Identity fields are kept.
    pub fn shutting_down(self, source: ShutdownSource, requested_at: i64) -> Self {
        Self {
            status: DaemonStatus::ShuttingDown,
            shutdown_requested_at: Some(requested_at),
            shutdown_source: Some(source),
            ..self
        }
    }
}
