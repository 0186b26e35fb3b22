// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! hp-storage: on-disk state shared between daemon restarts and processes

mod atomic;
pub mod daemon_state;
pub mod lock;
pub mod marker;
pub mod settings_file;

pub use atomic::write_json_atomic;
pub use daemon_state::{DaemonStateFile, DaemonStateRecord, StateFileError};
pub use lock::{LockError, LockFile, LockInfo};
pub use marker::{hash_process_command, MarkerError, MarkerStore, MarkerWrite, SessionMarker};
pub use settings_file::{SettingsError, SettingsStore};
