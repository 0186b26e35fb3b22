// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! hp-sync: encrypted, versioned state exchange with the relay

pub mod codec;
pub mod machine;
pub mod rpc;
pub mod session;
pub mod state;
pub mod update;

pub use codec::{open, seal, CodecError};
pub use machine::MachineClient;
pub use rpc::{RpcError, RpcHandler, RpcHandlerManager, RpcRequest, RpcScope};
pub use session::SessionClient;
pub use state::{DaemonRuntimeState, DaemonStatus, MachineMetadata, ShutdownSource};
pub use update::{SyncError, UpdateResponse, UpdateTarget, VersionedSync};
