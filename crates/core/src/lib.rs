// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! hp-core: shared types for the happy daemon and session processes

pub mod agent;
pub mod env_expand;
pub mod id;
pub mod message;
pub mod mode;
pub mod retry;
pub mod settings;
pub mod started_by;
pub mod versioned;

pub use agent::Agent;
pub use env_expand::{expand_env_map, expand_env_value, has_unexpanded_placeholder};
pub use id::{MachineId, SessionId};
pub use message::{AgentMessage, UsageReport};
pub use mode::{EnhancedMode, ModeFingerprint, PermissionMode};
pub use retry::{retry_blocking, with_retry, Attempt, Backoff, RetryError, RetryPolicy};
pub use settings::{apply_settings, AiBackendProfile, Settings, SETTINGS_SCHEMA_VERSION};
pub use started_by::StartedBy;
pub use versioned::Versioned;
